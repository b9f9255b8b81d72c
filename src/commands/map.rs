//! Map Command Handler
//!
//! Handles the `map` subcommand: builds the block map of a tape definition,
//! or loads it from the block cache, and reports what was found.

use crate::definition::TapeDefinition;
use crate::display;
use crate::error::Result;
use crate::utils::{format_bytes, path_to_string};
use std::path::PathBuf;
use tracing::info;

pub fn execute(definition: PathBuf, rescan: bool) -> Result<()> {
    info!("Mapping tape definition {}", path_to_string(&definition));
    let mut definition = TapeDefinition::load(&definition)?;

    let (map, stats) = if rescan {
        let (map, stats) = definition.scan_block_map()?;
        (map, Some(stats))
    } else {
        definition.load_block_map(true)?
    };

    println!(
        "Tape: {} ({})",
        definition.display_name(),
        definition.cartridge().description()
    );
    for (index, file) in definition.dump_files().iter().enumerate() {
        let mapped = map.values().filter(|b| b.file == index).count();
        println!(
            "  {:<32} {:>12} {:>8} blocks mapped",
            file.name(),
            format_bytes(file.len()),
            mapped
        );
    }
    println!("  Distinct blocks: {}", map.len());
    println!("  Force-skipped blocks: {}", definition.force_skip_count());

    match stats {
        Some(stats) => display::display_scan_stats(&stats),
        None => println!(
            "Block map loaded from cache {}",
            path_to_string(&definition.cache_path())
        ),
    }

    Ok(())
}
