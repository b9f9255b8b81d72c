//! Block mapping
//!
//! Scans dump files frame by frame and works out where on the tape each
//! frame came from, producing a map keyed by physical block number. The map
//! is persisted to a cache so unchanged dumps are never rescanned.

pub mod cache;

use crate::block::{AuxTrailer, TapeBlock, BLOCK_SIZE, DATA_SIZE, WRITE_STOP_SIGNATURE};
use crate::cartridge::CartridgeType;
use crate::dump_file::TapeDumpFile;
use crate::error::Result;
use crate::position::PhysicalPosition;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::AddAssign;
use std::path::Path;
use tracing::{debug, info, warn};

/// Physical block number → recovered block.
pub type BlockMap = BTreeMap<u32, TapeBlock>;

/// Counters collected while scanning dump files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Complete frames read
    pub frames: u64,
    /// Frames placed into the map
    pub mapped: u64,
    /// Never-recorded frames left behind by an incomplete dump pass
    pub placeholders: u64,
    /// Frames without a hardware position, placed from the running logical counter
    pub recovered: u64,
    /// Frames whose position could not be determined
    pub unplaceable: u64,
    /// Drive filler frames
    pub write_stop: u64,
    /// Frames that replaced one already mapped from an earlier file
    pub collisions: u64,
    /// Frames whose hardware position disagreed with the running counter
    pub disagreements: u64,
    /// Bytes of trailing partial frames ignored
    pub truncated_bytes: u64,
}

impl AddAssign for ScanStats {
    fn add_assign(&mut self, other: Self) {
        self.frames += other.frames;
        self.mapped += other.mapped;
        self.placeholders += other.placeholders;
        self.recovered += other.recovered;
        self.unplaceable += other.unplaceable;
        self.write_stop += other.write_stop;
        self.collisions += other.collisions;
        self.disagreements += other.disagreements;
        self.truncated_bytes += other.truncated_bytes;
    }
}

pub struct BlockMapper {
    cartridge: CartridgeType,
    show_progress: bool,
}

impl BlockMapper {
    pub fn new(cartridge: CartridgeType) -> Result<Self> {
        // Surfaces unsupported cartridge types before any file is touched
        PhysicalPosition::new(cartridge)?;
        Ok(Self {
            cartridge,
            show_progress: false,
        })
    }

    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    pub fn cartridge(&self) -> CartridgeType {
        self.cartridge
    }

    /// Loads the map from `cache_path` when it matches the dump files,
    /// otherwise scans every file and writes a fresh cache.
    ///
    /// An out-of-date cache is never overwritten; it has to be deleted by hand.
    pub fn load_or_map(
        &self,
        files: &mut [TapeDumpFile],
        cache_path: &Path,
    ) -> Result<(BlockMap, Option<ScanStats>)> {
        if let Some(map) = cache::load(cache_path, files, self.cartridge)? {
            info!(
                "Loaded {} mapped blocks from cache {}",
                map.len(),
                cache_path.display()
            );
            return Ok((map, None));
        }

        let (map, stats) = self.map_files(files)?;

        if cache_path.exists() {
            warn!(
                "Stale block cache left untouched at {}; delete it to cache this scan",
                cache_path.display()
            );
        } else {
            cache::save(cache_path, files, self.cartridge, &map)?;
            info!("Saved block cache to {}", cache_path.display());
        }

        Ok((map, Some(stats)))
    }

    /// Scans all files in order. Later files win physical block collisions.
    pub fn map_files(&self, files: &mut [TapeDumpFile]) -> Result<(BlockMap, ScanStats)> {
        let mut map = BlockMap::new();
        let mut total = ScanStats::default();

        for (index, file) in files.iter_mut().enumerate() {
            let stats = self.map_file(index, file, &mut map)?;
            info!(
                "Scanned {}: {} frames, {} mapped, {} recovered, {} unplaceable, {} placeholders",
                file.name(),
                stats.frames,
                stats.mapped,
                stats.recovered,
                stats.unplaceable,
                stats.placeholders
            );
            total += stats;
        }

        info!("Block map holds {} distinct blocks", map.len());
        Ok((map, total))
    }

    /// Scans one dump file into `map`; `index` is the file's position in its definition.
    pub fn map_file(
        &self,
        index: usize,
        file: &mut TapeDumpFile,
        map: &mut BlockMap,
    ) -> Result<ScanStats> {
        let mut stats = ScanStats::default();
        let mut frame = vec![0u8; BLOCK_SIZE];
        let known_start = file.declared_start_logical_block();
        let mut logical = known_start.unwrap_or(0);
        let mut offset = 0u64;

        let progress = self.progress_bar(file);

        loop {
            while file.is_bad_block(logical) && logical < u32::MAX {
                debug!("{}: logical block {} declared bad, skipping", file.name(), logical);
                logical += 1;
            }

            let read = file.read_at(offset, &mut frame)?;
            if read == 0 {
                break;
            }
            if read < BLOCK_SIZE {
                warn!(
                    "{}: ignoring {} trailing bytes at offset {} (partial frame)",
                    file.name(),
                    read,
                    offset
                );
                stats.truncated_bytes += read as u64;
                break;
            }
            stats.frames += 1;

            let trailer = AuxTrailer::parse(&frame);
            let placed = self.place_frame(
                file.name(),
                offset,
                &frame,
                &trailer,
                known_start,
                logical,
                &mut stats,
            );
            if let Some(physical) = placed {
                let block = TapeBlock::new(index, offset, physical, trailer.signature);
                if let Some(previous) = map.insert(physical, block) {
                    // Last scanned wins. This has never been checked against
                    // dumps that recovered genuinely different data for the
                    // same frame.
                    warn!(
                        "Physical block {} at {}:{} replaces copy from file #{} offset {} (unverified collision policy)",
                        physical,
                        file.name(),
                        offset,
                        previous.file,
                        previous.file_offset
                    );
                    stats.collisions += 1;
                }
                stats.mapped += 1;
            }

            offset += BLOCK_SIZE as u64;
            logical = logical.saturating_add(1);
            progress.inc(1);
        }

        progress.finish_and_clear();
        Ok(stats)
    }

    /// Decides the physical block of one frame, or `None` to leave it out of the map.
    #[allow(clippy::too_many_arguments)]
    fn place_frame(
        &self,
        name: &str,
        offset: u64,
        frame: &[u8],
        trailer: &AuxTrailer,
        known_start: Option<u32>,
        logical: u32,
        stats: &mut ScanStats,
    ) -> Option<u32> {
        if trailer.signature == WRITE_STOP_SIGNATURE {
            debug!("{}:{}: write-stop filler frame, excluded", name, offset);
            stats.write_stop += 1;
            return None;
        }

        // The drive documentation calls this field undefined on read. In
        // practice it holds the frame's true physical position and must be
        // trusted whenever it is not a sentinel: falling back to the logical
        // counter here misplaces every frame after the first unreadable one.
        if let Some(raw) = trailer.hardware_position {
            let position = match PhysicalPosition::from_hardware_address(self.cartridge, raw) {
                Ok(position) => position,
                Err(e) => {
                    warn!("{}:{}: unplaceable frame, bad hardware position: {}", name, offset, e);
                    stats.unplaceable += 1;
                    return None;
                }
            };

            if known_start.is_some() {
                if let Ok(expected) = PhysicalPosition::from_logical_block(self.cartridge, logical) {
                    if expected != position {
                        warn!(
                            "{}:{}: hardware position {} disagrees with expected logical block {} ({}), using hardware position",
                            name, offset, position, logical, expected
                        );
                        stats.disagreements += 1;
                    }
                }
            }
            return Some(position.to_physical_block());
        }

        if trailer.signature.is_sentinel() && frame[..DATA_SIZE].iter().all(|b| *b == 0) {
            debug!("{}:{}: unrecorded placeholder frame, skipping", name, offset);
            stats.placeholders += 1;
            return None;
        }

        if known_start.is_none() {
            warn!(
                "{}:{}: unplaceable frame, no hardware position and no declared start block",
                name, offset
            );
            stats.unplaceable += 1;
            return None;
        }

        match PhysicalPosition::from_logical_block(self.cartridge, logical) {
            Ok(position) => {
                warn!(
                    "{}:{}: no hardware position, placed at logical block {} ({}) from running counter",
                    name, offset, logical, position
                );
                stats.recovered += 1;
                Some(position.to_physical_block())
            }
            Err(e) => {
                warn!("{}:{}: unplaceable frame: {}", name, offset, e);
                stats.unplaceable += 1;
                None
            }
        }
    }

    fn progress_bar(&self, file: &TapeDumpFile) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(file.block_count());
        let style = ProgressStyle::with_template(
            "{msg} [{bar:40}] {pos}/{len} frames ({eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
        bar.set_style(style);
        bar.set_message(file.name().to_string());
        bar
    }
}
