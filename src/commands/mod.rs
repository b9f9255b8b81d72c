//! Command Handlers Module
//!
//! This module contains handlers for all CLI subcommands.

pub mod condense;
pub mod info;
pub mod locate;
pub mod map;
pub mod order;

use crate::block::TapeBlock;
use crate::definition::TapeDefinition;
use crate::error::Result;
use std::path::Path;
use tracing::info;

/// Loads a definition and its block map, then orders the map.
pub(crate) fn load_ordered(
    path: &Path,
    physical: bool,
) -> Result<(TapeDefinition, Vec<TapeBlock>)> {
    let mut definition = TapeDefinition::load(path)?;
    let (map, _) = definition.load_block_map(true)?;

    let blocks = if physical {
        definition.create_physically_ordered_block_list(&map)?
    } else {
        definition.create_logically_ordered_block_list(&map)?
    };
    info!(
        "{}: {} of {} mapped blocks in the ordered list",
        definition.display_name(),
        blocks.len(),
        map.len()
    );
    Ok((definition, blocks))
}

pub(crate) fn order_label(physical: bool) -> &'static str {
    if physical {
        "physical"
    } else {
        "logical"
    }
}
