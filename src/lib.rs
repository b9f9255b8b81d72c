//! tape-weave library
//!
//! Reconstructs the data written to ADR (OnStream) cartridges from raw
//! frame dumps: places every dumped frame at its position on the tape,
//! orders the frames the way the drive wrote them and exposes the result
//! as a single seekable stream.

pub mod block;
pub mod cartridge;
pub mod cli;
pub mod commands;
pub mod config;
pub mod definition;
pub mod display;
pub mod dump_file;
pub mod error;
pub mod logger;
pub mod mapper;
pub mod position;
pub mod stream;
pub mod utils;

#[cfg(test)]
mod tests;

// Re-export key types for easier use
pub use block::{Signature, TapeBlock, BLOCK_SIZE, DATA_SIZE};
pub use cartridge::{CartridgeType, Geometry};
pub use config::{DumpFileConfig, TapeConfig};
pub use definition::{GapReport, TapeDefinition};
pub use dump_file::{BlockStream, TapeDumpFile};
pub use error::{Result, TapeError};
pub use mapper::{BlockMap, BlockMapper, ScanStats};
pub use position::PhysicalPosition;
pub use stream::InterwovenStream;
