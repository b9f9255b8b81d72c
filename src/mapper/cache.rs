//! Persistent block map cache
//!
//! Plain text, written next to the tape definition:
//!
//! ```text
//! # tape-weave block cache v1
//! @cartridge <type>
//! @file <name>|<modified>|<length>|<declared start>|<bad blocks>
//! @blocks
//! <file name>,<file offset>,<physical block>,<signature hex>
//! ```
//!
//! Physical block numbers depend on the cartridge geometry, so the manifest
//! records the cartridge type along with every dump file. It must match the
//! current definition exactly; anything else discards the cache as a whole.

use super::BlockMap;
use crate::block::{Signature, TapeBlock, BLOCK_SIZE};
use crate::cartridge::CartridgeType;
use crate::dump_file::TapeDumpFile;
use crate::error::{Result, TapeError};
use crate::utils::create_new_file;
use std::collections::HashMap;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, warn};

pub const CACHE_HEADER: &str = "# tape-weave block cache v1";
const CARTRIDGE_PREFIX: &str = "@cartridge ";
const FILE_PREFIX: &str = "@file ";
const BLOCKS_MARKER: &str = "@blocks";

/// Writes `map` to a new cache file; an existing file is never replaced.
pub fn save(
    path: &Path,
    files: &[TapeDumpFile],
    cartridge: CartridgeType,
    map: &BlockMap,
) -> Result<()> {
    let mut writer = BufWriter::new(create_new_file(path)?);
    write_cache(&mut writer, files, cartridge, map)?;
    writer.flush()?;
    debug!("Wrote {} blocks to cache {}", map.len(), path.display());
    Ok(())
}

fn write_cache<W: Write>(
    writer: &mut W,
    files: &[TapeDumpFile],
    cartridge: CartridgeType,
    map: &BlockMap,
) -> Result<()> {
    writeln!(writer, "{}", CACHE_HEADER)?;
    writeln!(writer, "{}{}", CARTRIDGE_PREFIX, cartridge.config_name())?;
    for file in files {
        writeln!(writer, "{}{}", FILE_PREFIX, file.identity())?;
    }
    writeln!(writer, "{}", BLOCKS_MARKER)?;

    for block in map.values() {
        let file = files.get(block.file).ok_or_else(|| {
            TapeError::cache(format!("Block refers to unknown file #{}", block.file))
        })?;
        writeln!(
            writer,
            "{},{},{},{}",
            file.name(),
            block.file_offset,
            block.physical_block,
            block.signature.to_hex()
        )?;
    }
    Ok(())
}

/// Reads the cache at `path`.
///
/// Returns `Ok(None)` when there is no cache or it does not match `files`.
pub fn load(
    path: &Path,
    files: &[TapeDumpFile],
    cartridge: CartridgeType,
) -> Result<Option<BlockMap>> {
    if !path.exists() {
        debug!("No block cache at {}", path.display());
        return Ok(None);
    }

    let text = std::fs::read_to_string(path)?;
    match parse_cache(&text, files, cartridge) {
        Ok(map) => Ok(Some(map)),
        Err(reason) => {
            warn!("Discarding block cache {}: {}", path.display(), reason);
            Ok(None)
        }
    }
}

fn parse_cache(
    text: &str,
    files: &[TapeDumpFile],
    cartridge: CartridgeType,
) -> std::result::Result<BlockMap, String> {
    let mut lines = text.lines();

    if lines.next() != Some(CACHE_HEADER) {
        return Err("unrecognised header".to_string());
    }

    match lines.next().and_then(|line| line.strip_prefix(CARTRIDGE_PREFIX)) {
        Some(cached) if cached == cartridge.config_name() => {}
        Some(cached) => {
            return Err(format!(
                "cache was built for cartridge type {}, definition is {}",
                cached, cartridge
            ))
        }
        None => return Err("cartridge type missing from manifest".to_string()),
    }

    let mut manifest = Vec::new();
    loop {
        match lines.next() {
            Some(BLOCKS_MARKER) => break,
            Some(line) => match line.strip_prefix(FILE_PREFIX) {
                Some(identity) => manifest.push(identity),
                None => return Err(format!("unexpected manifest line '{}'", line)),
            },
            None => return Err("manifest is not terminated".to_string()),
        }
    }

    let current: Vec<String> = files.iter().map(TapeDumpFile::identity).collect();
    if manifest.len() != current.len() {
        return Err(format!(
            "manifest lists {} files, definition has {}",
            manifest.len(),
            current.len()
        ));
    }
    for (cached, actual) in manifest.iter().zip(&current) {
        if *cached != actual.as_str() {
            return Err(format!("dump file changed: cached '{}', now '{}'", cached, actual));
        }
    }

    let indices: HashMap<&str, usize> = files
        .iter()
        .enumerate()
        .map(|(index, file)| (file.name(), index))
        .collect();
    let block_count = cartridge
        .physical_block_count()
        .map_err(|e| e.to_string())?;

    let mut map = BlockMap::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let block = parse_block_line(line, &indices)?;

        if block.physical_block >= block_count {
            return Err(format!("physical block {} out of range", block.physical_block));
        }
        if block.file_offset % BLOCK_SIZE as u64 != 0 {
            return Err(format!("offset {} is not on a frame boundary", block.file_offset));
        }
        match block.file_offset.checked_add(BLOCK_SIZE as u64) {
            Some(end) if end <= files[block.file].len() => {}
            _ => return Err(format!("offset {} beyond end of file", block.file_offset)),
        }
        if map.insert(block.physical_block, block).is_some() {
            return Err(format!("duplicate entry in line '{}'", line));
        }
    }

    Ok(map)
}

fn parse_block_line(
    line: &str,
    indices: &HashMap<&str, usize>,
) -> std::result::Result<TapeBlock, String> {
    // File names may contain commas, the numeric fields never do
    let mut fields = line.rsplitn(4, ',');
    let (Some(signature), Some(physical), Some(offset), Some(name)) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(format!("malformed line '{}'", line));
    };

    let file = *indices
        .get(name)
        .ok_or_else(|| format!("unknown file '{}'", name))?;
    let file_offset = offset
        .parse::<u64>()
        .map_err(|_| format!("bad offset in line '{}'", line))?;
    let physical_block = physical
        .parse::<u32>()
        .map_err(|_| format!("bad physical block in line '{}'", line))?;
    let signature =
        Signature::from_hex(signature).ok_or_else(|| format!("bad signature in line '{}'", line))?;

    Ok(TapeBlock::new(file, file_offset, physical_block, signature))
}
