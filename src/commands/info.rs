//! Info Command Handler
//!
//! Handles the `info` subcommand for printing cartridge geometry.

use crate::cartridge::CartridgeType;
use crate::display;
use crate::error::Result;
use tracing::{info, warn};

pub fn execute(cartridge: CartridgeType) -> Result<()> {
    info!("Showing geometry for {}", cartridge.description());

    if !cartridge.is_implemented() {
        warn!(
            "{} layout is not confirmed; definitions using it will be rejected",
            cartridge.description()
        );
    }

    display::display_geometry(cartridge);
    Ok(())
}
