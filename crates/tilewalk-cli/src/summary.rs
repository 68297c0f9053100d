//! Human-readable summaries of plans and downloads.

use std::fmt::Write;

use tilewalk::{DownloadReport, TraversalOutcome};

/// Format a byte count with a binary unit.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.1} {unit}")
}

pub fn plan_summary(outcome: &TraversalOutcome) -> String {
    let stats = &outcome.stats;
    let mut out = String::new();

    for tile in &outcome.tiles {
        let _ = writeln!(out, "{:>3}  {}", tile.depth, tile.content_uri);
    }
    let _ = writeln!(
        out,
        "{} tiles planned ({} nodes visited, {} pruned, {} sub-tilesets fetched)",
        outcome.tiles.len(),
        stats.node_visits,
        stats.prunes,
        stats.json_fetches
    );
    if stats.hit_any_budget() {
        let _ = writeln!(out, "stopped early: budget exhausted");
    }
    for failure in &stats.failures {
        let _ = writeln!(out, "failed: {}: {}", failure.uri, failure.message);
    }
    if let Some(reason) = &stats.empty_plan_reason {
        let _ = writeln!(out, "{reason}");
    }
    out
}

pub fn download_summary(report: &DownloadReport) -> String {
    let cached = report.results.iter().filter(|r| r.from_cache).count();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} tiles ready ({} from cache), {}",
        report.results.len(),
        cached,
        format_bytes(report.total_bytes)
    );
    if report.cap_reached {
        let _ = writeln!(
            out,
            "byte cap reached, {} tiles skipped",
            report.skipped_for_cap
        );
    }
    if report.cancelled {
        let _ = writeln!(out, "cancelled");
    }
    for failure in &report.failures {
        let _ = writeln!(out, "failed: {}: {}", failure.uri, failure.message);
    }
    out
}
