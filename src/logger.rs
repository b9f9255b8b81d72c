use crate::error::{Result, TapeError};
use std::io;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global subscriber. Without `verbose`, `RUST_LOG` may pick the level.
pub fn init(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| TapeError::configuration(format!("Logger already initialised: {}", e)))
}
