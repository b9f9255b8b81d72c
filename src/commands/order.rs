//! Order Command Handler
//!
//! Handles the `order` subcommand: orders the mapped blocks, reports gaps
//! and optionally exports the ordered list as JSON.

use super::{load_ordered, order_label};
use crate::block::{Signature, TapeBlock};
use crate::cartridge::CartridgeType;
use crate::definition::{GapReport, TapeDefinition};
use crate::display;
use crate::error::Result;
use crate::utils::{create_new_file, ensure_absent, path_to_string};
use serde::Serialize;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// One entry of the exported block list.
#[derive(Debug, Serialize)]
pub struct ExportedBlock<'a> {
    pub file: &'a str,
    pub file_offset: u64,
    pub position: String,
    pub physical_block: u32,
    pub logical_block: Option<u32>,
    pub signature: Signature,
    pub missing_after: u32,
    pub missing_after_is_safe: bool,
}

#[derive(Debug, Serialize)]
struct Export<'a> {
    tape: String,
    cartridge: CartridgeType,
    order: &'static str,
    summary: GapReport,
    blocks: Vec<ExportedBlock<'a>>,
}

pub fn execute(definition: PathBuf, physical: bool, export: Option<PathBuf>) -> Result<()> {
    if let Some(path) = &export {
        ensure_absent(path)?;
    }

    let (definition, blocks) = load_ordered(&definition, physical)?;
    let report = GapReport::from_blocks(&blocks);
    display::display_gap_report(&report, order_label(physical));

    if let Some(path) = export {
        write_export(&path, &definition, &blocks, physical, report)?;
        info!("Exported {} blocks to {}", blocks.len(), path_to_string(&path));
    }

    Ok(())
}

pub fn exported_blocks<'a>(
    definition: &'a TapeDefinition,
    blocks: &[TapeBlock],
) -> Vec<ExportedBlock<'a>> {
    let cartridge = definition.cartridge();
    blocks
        .iter()
        .map(|block| ExportedBlock {
            file: definition
                .dump_files()
                .get(block.file)
                .map(|f| f.name())
                .unwrap_or("?"),
            file_offset: block.file_offset,
            position: block
                .position(cartridge)
                .map(|p| p.to_string())
                .unwrap_or_default(),
            physical_block: block.physical_block,
            logical_block: block.logical_block(cartridge),
            signature: block.signature,
            missing_after: block.missing_run_length,
            missing_after_is_safe: block.missing_run_is_safe,
        })
        .collect()
}

fn write_export(
    path: &Path,
    definition: &TapeDefinition,
    blocks: &[TapeBlock],
    physical: bool,
    summary: GapReport,
) -> Result<()> {
    let export = Export {
        tape: definition.display_name(),
        cartridge: definition.cartridge(),
        order: order_label(physical),
        summary,
        blocks: exported_blocks(definition, blocks),
    };

    let mut writer = BufWriter::new(create_new_file(path)?);
    serde_json::to_writer_pretty(&mut writer, &export)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
