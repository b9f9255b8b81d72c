//! Condense Command Handler
//!
//! Handles the `condense` subcommand: writes the reconstructed stream of a
//! tape definition to a single new file.

use super::{load_ordered, order_label};
use crate::block::DATA_SIZE;
use crate::error::Result;
use crate::stream::InterwovenStream;
use crate::utils::{create_new_file, ensure_absent, format_bytes, format_duration, path_to_string};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

pub fn execute(definition: PathBuf, output: PathBuf, physical: bool) -> Result<()> {
    // Checked up front so a long scan is not wasted
    ensure_absent(&output)?;

    let (mut definition, blocks) = load_ordered(&definition, physical)?;
    let gaps = blocks.iter().filter(|b| b.has_unsafe_gap()).count();
    if gaps > 0 {
        warn!("Stream has {} unsafe gaps; output will be missing data there", gaps);
    }

    let mut stream = definition.open_stream(blocks);
    info!(
        "Condensing {} blocks ({} order) into {}",
        stream.blocks().len(),
        order_label(physical),
        path_to_string(&output)
    );

    let started = Instant::now();
    let written = copy_stream(&mut stream, &output, true)?;
    info!(
        "Wrote {} to {} in {}",
        format_bytes(written),
        path_to_string(&output),
        format_duration(started.elapsed().as_secs_f64())
    );
    Ok(())
}

/// Copies the whole stream into a new file at `output`, returning the byte count.
pub fn copy_stream(stream: &mut InterwovenStream<'_>, output: &Path, show_progress: bool) -> Result<u64> {
    let mut writer = BufWriter::new(create_new_file(output)?);
    let progress = if show_progress {
        let bar = ProgressBar::new(stream.len());
        let style = ProgressStyle::with_template(
            "{spinner} [{elapsed_precise}] [{bar:40}] {bytes}/{total_bytes} ({bytes_per_sec})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
        bar.set_style(style);
        bar
    } else {
        ProgressBar::hidden()
    };

    let mut buffer = vec![0u8; DATA_SIZE];
    let mut written = 0u64;
    loop {
        let read = stream.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        writer.write_all(&buffer[..read])?;
        written += read as u64;
        progress.set_position(written);
    }
    writer.flush()?;
    progress.finish_and_clear();
    Ok(written)
}
