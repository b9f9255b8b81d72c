//! Interwoven stream
//!
//! Presents an ordered block list as one contiguous byte stream made of the
//! blocks' payloads, reading each block from whichever dump file holds it.
//! Only the payload is exposed; aux trailers never appear in the stream.

use crate::block::{TapeBlock, DATA_SIZE};
use crate::cartridge::CartridgeType;
use crate::dump_file::TapeDumpFile;
use crate::error::{Result, TapeError};
use std::io::{self, Read, Seek, SeekFrom};

pub struct InterwovenStream<'a> {
    cartridge: CartridgeType,
    files: &'a mut [TapeDumpFile],
    blocks: Vec<TapeBlock>,
    buffer: Vec<u8>,
    /// Index into `blocks` of the payload held in `buffer`
    buffered: Option<usize>,
    position: u64,
}

impl<'a> InterwovenStream<'a> {
    /// `blocks` must refer to `files` by index, as produced by the block mapper.
    pub fn new(
        cartridge: CartridgeType,
        files: &'a mut [TapeDumpFile],
        blocks: Vec<TapeBlock>,
    ) -> Self {
        Self {
            cartridge,
            files,
            blocks,
            buffer: vec![0u8; DATA_SIZE],
            buffered: None,
            position: 0,
        }
    }

    /// Total stream length in bytes.
    pub fn len(&self) -> u64 {
        self.blocks.len() as u64 * DATA_SIZE as u64
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn blocks(&self) -> &[TapeBlock] {
        &self.blocks
    }

    /// Block holding the stream byte at `offset`.
    pub fn block_at(&self, offset: u64) -> Option<&TapeBlock> {
        self.blocks.get((offset / DATA_SIZE as u64) as usize)
    }

    /// Where the byte at `offset` came from: dump file, offset in that file
    /// and tape position.
    pub fn describe_position(&self, offset: u64) -> String {
        let Some(block) = self.block_at(offset) else {
            return format!("offset {} is past the end of the stream ({} bytes)", offset, self.len());
        };
        let within = offset % DATA_SIZE as u64;
        let source = self
            .files
            .get(block.file)
            .map(|f| f.name())
            .unwrap_or("?");
        let location = match block.position(self.cartridge) {
            Ok(position) => format!(
                "{}, physical block {}, logical block {}",
                position,
                position.to_physical_block_string(),
                position.to_logical_block_string()
            ),
            Err(_) => format!("physical block {}", block.physical_block),
        };
        format!(
            "offset {} is {} byte {} ({})",
            offset,
            source,
            block.file_offset + within,
            location
        )
    }

    fn load_block(&mut self, index: usize) -> Result<()> {
        if self.buffered == Some(index) {
            return Ok(());
        }
        self.buffered = None;

        let block = &self.blocks[index];
        let file = self.files.get_mut(block.file).ok_or_else(|| {
            TapeError::configuration(format!(
                "Block {} refers to dump file #{} which is not open",
                block.physical_block, block.file
            ))
        })?;
        file.read_exact_at(block.file_offset, &mut self.buffer)?;

        self.buffered = Some(index);
        Ok(())
    }
}

impl Read for InterwovenStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let length = self.len();
        let mut written = 0;

        while written < buf.len() && self.position < length {
            let index = (self.position / DATA_SIZE as u64) as usize;
            let within = (self.position % DATA_SIZE as u64) as usize;
            if let Err(e) = self.load_block(index) {
                // Hand back what was copied; the failing block errors on the next call
                if written > 0 {
                    break;
                }
                return Err(e.into());
            }

            let count = (buf.len() - written).min(DATA_SIZE - within);
            buf[written..written + count].copy_from_slice(&self.buffer[within..within + count]);
            written += count;
            self.position += count as u64;
        }

        Ok(written)
    }
}

impl Seek for InterwovenStream<'_> {
    fn seek(&mut self, target: SeekFrom) -> io::Result<u64> {
        let length = self.len();
        let position = match target {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
            SeekFrom::End(delta) => length.checked_add_signed(delta),
        };

        let position = match position {
            Some(p) if p <= length => p,
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("seek to {:?} is outside the stream (0..={})", target, length),
                ))
            }
        };

        if position < length {
            self.load_block((position / DATA_SIZE as u64) as usize)?;
        }
        self.position = position;
        Ok(position)
    }
}
