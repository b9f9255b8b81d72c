//! Raw dump files
//!
//! Each recovery pass over a cartridge produces one dump file: a run of
//! `BLOCK_SIZE` frames read from some starting logical block, minus the
//! blocks the pass could not read. A `TapeDumpFile` owns the open stream for
//! the whole session; dropping it closes the handle.

use crate::block::BLOCK_SIZE;
use crate::config::DumpFileConfig;
use crate::error::{Result, TapeError};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Random-access byte stream backing a dump file.
pub trait BlockStream: Read + Seek {}

impl<T: Read + Seek> BlockStream for T {}

// Sequential scans read frame after frame, keep a few in the buffer
const READ_BUFFER_FRAMES: usize = 16;

pub struct TapeDumpFile {
    name: String,
    path: Option<PathBuf>,
    declared_start: Option<u32>,
    bad_blocks: Vec<u32>,
    length: u64,
    modified: Option<DateTime<Utc>>,
    stream: Box<dyn BlockStream>,
    /// Stream offset after the last read, `None` when unknown
    cursor: Option<u64>,
}

impl TapeDumpFile {
    /// Opens the dump file described by `config`, relative to `folder`.
    pub fn open(folder: &Path, config: &DumpFileConfig) -> Result<Self> {
        let path = folder.join(&config.file);
        if !path.is_file() {
            return Err(TapeError::configuration(format!(
                "Dump file '{}' not found at {}",
                config.file,
                path.display()
            )));
        }

        let file = File::open(&path)?;
        let metadata = file.metadata()?;
        let modified = metadata.modified().ok().map(DateTime::<Utc>::from);
        debug!(
            "Opened dump file {} ({} bytes)",
            path.display(),
            metadata.len()
        );

        Ok(Self {
            name: config.file.clone(),
            path: Some(path),
            declared_start: config.start,
            bad_blocks: config.bad_blocks()?,
            length: metadata.len(),
            modified,
            stream: Box::new(BufReader::with_capacity(
                BLOCK_SIZE * READ_BUFFER_FRAMES,
                file,
            )),
            cursor: None,
        })
    }

    /// Wraps an already open stream; it has no modification time in its identity.
    pub fn from_stream<S: BlockStream + 'static>(
        name: impl Into<String>,
        mut stream: S,
        declared_start: Option<u32>,
        mut bad_blocks: Vec<u32>,
    ) -> Result<Self> {
        let length = stream.seek(SeekFrom::End(0))?;
        stream.seek(SeekFrom::Start(0))?;
        bad_blocks.sort_unstable();
        bad_blocks.dedup();

        Ok(Self {
            name: name.into(),
            path: None,
            declared_start,
            bad_blocks,
            length,
            modified: None,
            stream: Box::new(stream),
            cursor: Some(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn declared_start_logical_block(&self) -> Option<u32> {
        self.declared_start
    }

    pub fn bad_blocks(&self) -> &[u32] {
        &self.bad_blocks
    }

    pub fn is_bad_block(&self, logical_block: u32) -> bool {
        self.bad_blocks.binary_search(&logical_block).is_ok()
    }

    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Number of complete frames in the file.
    pub fn block_count(&self) -> u64 {
        self.length / BLOCK_SIZE as u64
    }

    /// Identity string recorded in the block cache manifest.
    ///
    /// Covers everything a cached placement depends on: the file contents
    /// (by mtime and length), the declared start and the bad block list.
    pub fn identity(&self) -> String {
        let modified = self
            .modified
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Nanos, true))
            .unwrap_or_else(|| "-".to_string());
        let start = self
            .declared_start
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        let bad: Vec<String> = self.bad_blocks.iter().map(u32::to_string).collect();
        format!(
            "{}|{}|{}|{}|{}",
            self.name,
            modified,
            self.length,
            start,
            bad.join(" ")
        )
    }

    /// Reads up to `buf.len()` bytes at `offset`; fewer only at end of file.
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        // Seeking drops the read buffer, so sequential reads skip it
        if self.cursor != Some(offset) {
            self.cursor = None;
            self.stream.seek(SeekFrom::Start(offset))?;
        }

        let mut filled = 0;
        while filled < buf.len() {
            match self.stream.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.cursor = None;
                    return Err(e.into());
                }
            }
        }
        self.cursor = Some(offset + filled as u64);
        Ok(filled)
    }

    /// Reads exactly `buf.len()` bytes at `offset`.
    pub fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let read = self.read_at(offset, buf)?;
        if read < buf.len() {
            return Err(TapeError::Io(std::io::Error::new(
                ErrorKind::UnexpectedEof,
                format!(
                    "{}: wanted {} bytes at offset {}, file ends after {}",
                    self.name,
                    buf.len(),
                    offset,
                    read
                ),
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for TapeDumpFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TapeDumpFile")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("declared_start", &self.declared_start)
            .field("bad_blocks", &self.bad_blocks.len())
            .field("length", &self.length)
            .finish()
    }
}
