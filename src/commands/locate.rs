//! Locate Command Handler
//!
//! Handles the `locate` subcommand for converting between position forms.

use crate::cartridge::CartridgeType;
use crate::cli::PositionKind;
use crate::display;
use crate::error::{Result, TapeError};
use crate::position::PhysicalPosition;
use tracing::debug;

pub fn execute(cartridge: CartridgeType, value: String, from: PositionKind) -> Result<()> {
    let position = resolve(cartridge, &value, from)?;
    debug!("{} {:?} resolves to {}", value, from, position);
    display::display_position(&position);
    Ok(())
}

pub fn resolve(cartridge: CartridgeType, value: &str, from: PositionKind) -> Result<PhysicalPosition> {
    let number = parse_number(value)?;
    match from {
        PositionKind::Physical => PhysicalPosition::from_physical_block(cartridge, number),
        PositionKind::Logical => PhysicalPosition::from_logical_block(cartridge, number),
        PositionKind::Hardware => PhysicalPosition::from_hardware_address(cartridge, number),
    }
}

/// Decimal, or hexadecimal with a `0x` prefix.
fn parse_number(value: &str) -> Result<u32> {
    let value = value.trim();
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse::<u32>(),
    };
    parsed.map_err(|e| TapeError::parse(format!("Invalid position value '{}': {}", value, e)))
}
