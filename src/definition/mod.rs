//! Tape definitions
//!
//! A `TapeDefinition` ties together everything known about one cartridge:
//! its type, the dump files recovered from it and the blocks to leave out of
//! the reconstructed stream.

mod ordering;

pub use ordering::GapReport;

use crate::block::TapeBlock;
use crate::cartridge::CartridgeType;
use crate::config::TapeConfig;
use crate::dump_file::TapeDumpFile;
use crate::error::{Result, TapeError};
use crate::mapper::{BlockMap, BlockMapper, ScanStats};
use crate::position::PhysicalPosition;
use crate::stream::InterwovenStream;
use std::collections::HashSet;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Cache file written next to the tape definition.
pub const CACHE_FILE_NAME: &str = "blocks.cache";

pub struct TapeDefinition {
    name: Option<String>,
    cartridge: CartridgeType,
    folder: PathBuf,
    dump_files: Vec<TapeDumpFile>,
    force_skip: HashSet<u32>,
}

impl TapeDefinition {
    /// Loads a definition from a `tape.json` path or the folder containing it,
    /// opening every dump file it lists.
    pub fn load(path: &Path) -> Result<Self> {
        let (config, folder) = TapeConfig::load(path)?;
        Self::from_config(&config, &folder)
    }

    pub fn from_config(config: &TapeConfig, folder: &Path) -> Result<Self> {
        // Fails loudly for unconfirmed cartridge generations
        PhysicalPosition::new(config.cartridge)?;

        let dump_files = config
            .files
            .iter()
            .map(|file| TapeDumpFile::open(folder, file))
            .collect::<Result<Vec<_>>>()?;

        let definition = Self::from_parts(
            config.cartridge,
            folder,
            dump_files,
            &config.skip_ranges()?,
        )?
        .with_name(config.name.clone());

        info!(
            "Loaded tape definition {} ({}, {} dump files, {} force-skipped blocks)",
            definition.display_name(),
            definition.cartridge.description(),
            definition.dump_files.len(),
            definition.force_skip.len()
        );
        Ok(definition)
    }

    /// Builds a definition from already opened dump files. `skip` holds logical block ranges.
    pub fn from_parts(
        cartridge: CartridgeType,
        folder: &Path,
        dump_files: Vec<TapeDumpFile>,
        skip: &[RangeInclusive<u32>],
    ) -> Result<Self> {
        let max_logical = cartridge.max_logical_block()?;
        for file in &dump_files {
            let start = file.declared_start_logical_block().filter(|s| *s > max_logical);
            let bad = file.bad_blocks().last().filter(|b| **b > max_logical);
            if let Some(block) = start.or(bad.copied()) {
                return Err(TapeError::configuration(format!(
                    "Dump file '{}' refers to logical block {}, beyond the last block {} of {}",
                    file.name(),
                    block,
                    max_logical,
                    cartridge
                )));
            }
        }

        let mut force_skip = HashSet::new();
        for range in skip {
            for logical in range.clone() {
                // The block map is keyed by physical block, so skips are too
                let position = PhysicalPosition::from_logical_block(cartridge, logical)?;
                force_skip.insert(position.to_physical_block());
            }
        }
        debug!("Force-skip set holds {} physical blocks", force_skip.len());

        Ok(Self {
            name: None,
            cartridge,
            folder: folder.to_path_buf(),
            dump_files,
            force_skip,
        })
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.folder.display().to_string(),
        }
    }

    pub fn cartridge(&self) -> CartridgeType {
        self.cartridge
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn dump_files(&self) -> &[TapeDumpFile] {
        &self.dump_files
    }

    pub fn is_force_skipped(&self, physical_block: u32) -> bool {
        self.force_skip.contains(&physical_block)
    }

    pub fn force_skip_count(&self) -> usize {
        self.force_skip.len()
    }

    pub fn cache_path(&self) -> PathBuf {
        self.folder.join(CACHE_FILE_NAME)
    }

    /// Block map from the cache, or from a full scan when the cache is missing or stale.
    pub fn load_block_map(&mut self, show_progress: bool) -> Result<(BlockMap, Option<ScanStats>)> {
        let mapper = BlockMapper::new(self.cartridge)?.with_progress(show_progress);
        let cache_path = self.cache_path();
        mapper.load_or_map(&mut self.dump_files, &cache_path)
    }

    /// Scans every dump file, ignoring any cache.
    pub fn scan_block_map(&mut self) -> Result<(BlockMap, ScanStats)> {
        BlockMapper::new(self.cartridge)?.map_files(&mut self.dump_files)
    }

    /// Virtual stream over `blocks`, which must come from this definition's map.
    pub fn open_stream(&mut self, blocks: Vec<TapeBlock>) -> InterwovenStream<'_> {
        InterwovenStream::new(self.cartridge, &mut self.dump_files, blocks)
    }
}

impl std::fmt::Debug for TapeDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TapeDefinition")
            .field("name", &self.name)
            .field("cartridge", &self.cartridge)
            .field("folder", &self.folder)
            .field("dump_files", &self.dump_files)
            .field("force_skip", &self.force_skip.len())
            .finish()
    }
}
