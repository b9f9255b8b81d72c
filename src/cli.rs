use crate::cartridge::CartridgeType;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tapeweave")]
#[command(about = "Reconstructs ordered data streams from raw ADR/OnStream tape dumps")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// How the value given to `locate` should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PositionKind {
    Physical,
    Logical,
    /// Raw aux trailer position field, decimal or 0x-prefixed hex
    Hardware,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the geometry of a cartridge type
    Info {
        /// Cartridge type (raw, adr30, adr50, adr60, adr120)
        #[arg(value_name = "TYPE")]
        cartridge: CartridgeType,
    },

    /// Convert a block position between physical, logical and hardware form
    Locate {
        #[arg(value_name = "TYPE")]
        cartridge: CartridgeType,

        /// Block number or hardware address
        #[arg(value_name = "VALUE")]
        value: String,

        /// Interpretation of VALUE
        #[arg(long, value_enum, default_value = "logical")]
        from: PositionKind,
    },

    /// Build or load the block map of a tape definition
    Map {
        /// tape.json or the folder containing it
        #[arg(value_name = "DEFINITION")]
        definition: PathBuf,

        /// Ignore the block cache and rescan every dump file
        #[arg(long)]
        rescan: bool,
    },

    /// Order the mapped blocks and report gaps
    Order {
        #[arg(value_name = "DEFINITION")]
        definition: PathBuf,

        /// Follow tape order instead of logical order
        #[arg(long)]
        physical: bool,

        /// Write the ordered block list as JSON to a new file
        #[arg(long, value_name = "FILE")]
        export: Option<PathBuf>,
    },

    /// Write the reconstructed stream to a new file
    Condense {
        #[arg(value_name = "DEFINITION")]
        definition: PathBuf,

        /// Output file, must not exist yet
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Follow tape order instead of logical order
        #[arg(long)]
        physical: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
