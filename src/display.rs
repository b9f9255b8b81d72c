use crate::block::DATA_SIZE;
use crate::cartridge::CartridgeType;
use crate::definition::GapReport;
use crate::mapper::ScanStats;
use crate::position::PhysicalPosition;
use crate::utils::format_bytes;

/// Label/value rows describing a cartridge type's geometry.
pub fn geometry_rows(cartridge: CartridgeType) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        ("Type", cartridge.config_name().to_string()),
        ("Description", cartridge.description().to_string()),
    ];

    let geometry = match cartridge.geometry() {
        Ok(geometry) => geometry,
        Err(e) => {
            rows.push(("Geometry", e.to_string()));
            return rows;
        }
    };

    rows.push(("Physical tracks", geometry.physical_track_count.to_string()));
    rows.push(("Logical tracks", geometry.logical_track_count.to_string()));
    rows.push(("Frames per track", geometry.frames_per_track.to_string()));
    rows.push((
        "Parking zone",
        match geometry.parking_zone {
            Some((start, end)) => format!("X {}..{} ({} frames)", start, end, end - start),
            None => "none".to_string(),
        },
    ));
    rows.push(("Physical blocks", geometry.physical_block_count().to_string()));
    rows.push(("Logical blocks", geometry.logical_block_count().to_string()));
    rows.push((
        "Capacity",
        format_bytes(geometry.logical_block_count() as u64 * DATA_SIZE as u64),
    ));
    rows
}

pub fn display_geometry(cartridge: CartridgeType) {
    println!("Cartridge Geometry:");
    print_rows(&geometry_rows(cartridge));
}

pub fn position_rows(position: &PhysicalPosition) -> Vec<(&'static str, String)> {
    vec![
        ("Grid", position.to_string()),
        ("Physical block", position.to_physical_block_string()),
        ("Logical block", position.to_logical_block_string()),
        ("Hardware address", format!("0x{:08X}", position.to_hardware_address())),
        (
            "Direction",
            if position.track() % 2 == 0 {
                "forward".to_string()
            } else {
                "reverse".to_string()
            },
        ),
    ]
}

pub fn display_position(position: &PhysicalPosition) {
    println!("Position ({}):", position.cartridge());
    print_rows(&position_rows(position));
}

pub fn display_scan_stats(stats: &ScanStats) {
    println!("Scan Statistics:");
    print_rows(&[
        ("Frames read", stats.frames.to_string()),
        ("Mapped", stats.mapped.to_string()),
        ("Recovered from counter", stats.recovered.to_string()),
        ("Unplaceable", stats.unplaceable.to_string()),
        ("Placeholders", stats.placeholders.to_string()),
        ("Write-stop fillers", stats.write_stop.to_string()),
        ("Collisions", stats.collisions.to_string()),
        ("Position disagreements", stats.disagreements.to_string()),
        ("Truncated bytes", stats.truncated_bytes.to_string()),
    ]);
}

pub fn gap_report_rows(report: &GapReport) -> Vec<(&'static str, String)> {
    vec![
        ("Blocks", report.blocks.to_string()),
        ("Stream size", format_bytes(report.blocks as u64 * DATA_SIZE as u64)),
        ("Safe gaps", report.safe_gaps.to_string()),
        ("Unsafe gaps", report.unsafe_gaps.to_string()),
        ("Missing blocks", report.missing_blocks.to_string()),
        ("Unsafe missing blocks", report.unsafe_missing_blocks.to_string()),
    ]
}

pub fn display_gap_report(report: &GapReport, order: &str) {
    println!("Block Order ({}):", order);
    print_rows(&gap_report_rows(report));
    if !report.is_clean() {
        display_warning("the reconstructed stream has unexplained holes");
    }
}

pub fn display_warning(warning: &str) {
    eprintln!("Warning: {}", warning);
}

fn print_rows(rows: &[(&str, String)]) {
    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    for (label, value) in rows {
        println!("  {:<width$}  {}", label, value, width = width);
    }
}
