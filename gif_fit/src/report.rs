//! Run reporting
//!
//! Per-file outcome lines and the end-of-run summary box, styled the same
//! way across interactive and logged runs.

use crate::conversion_api::ConversionSummary;
use console::style;
use shared_utils::{human_bytes, BatchResult};
use std::time::Duration;

/// One line per processed file.
pub fn print_file_line(summary: &ConversionSummary) {
    let status = if summary.skipped {
        style("⏭️  skipped").dim().to_string()
    } else if summary.passthrough && summary.hit {
        style("✅ pass-through").green().to_string()
    } else if summary.hit {
        style("✅ hit").green().to_string()
    } else if summary.passthrough {
        style("⚠️ unchanged").yellow().to_string()
    } else {
        style("⚠️ near target").yellow().to_string()
    };

    let dims = match (summary.width, summary.height) {
        (Some(w), Some(h)) => format!("{}x{}", w, h),
        _ => "?".to_string(),
    };
    let duration = summary
        .duration_secs
        .map(|d| format!("{:.2}s", d))
        .unwrap_or_else(|| "unknown".to_string());

    println!(
        "{} {} · {} · {} · {} -> {} · index {}",
        status,
        summary.input_path,
        dims,
        duration,
        human_bytes(summary.input_size),
        human_bytes(summary.output_size),
        summary.profile_index,
    );
}

/// Closing summary for a batch run.
pub fn print_batch_summary(result: &BatchResult, elapsed: Duration) {
    let reduction = if result.input_bytes > 0 {
        (1.0 - result.output_bytes as f64 / result.input_bytes as f64) * 100.0
    } else {
        0.0
    };

    println!();
    println!("╔══════════════════════════════════════════════════╗");
    println!("║              📊 gif-fit Summary                  ║");
    println!("╠══════════════════════════════════════════════════╣");
    println!("║  📁 Files processed:  {:>10}                 ║", result.total);
    println!("║  ✅ Tolerance hits:   {:>10}                 ║", result.hits);
    println!("║  🎯 Near target:      {:>10}                 ║", result.near);
    println!("║  📎 Pass-through:     {:>10}                 ║", result.passthrough);
    println!("║  ⏭️  Skipped:          {:>10}                 ║", result.skipped);
    println!("║  ❌ Failed:           {:>10}                 ║", result.failed);
    println!("╠══════════════════════════════════════════════════╣");
    println!(
        "║  💾 Input size:       {:>10}                 ║",
        human_bytes(result.input_bytes)
    );
    println!(
        "║  💾 Output size:      {:>10}                 ║",
        human_bytes(result.output_bytes)
    );
    println!("║  📉 Size reduction:   {:>9.1}%                 ║", reduction);
    println!(
        "║  ⏱️  Total time:       {:>9.1}s                 ║",
        elapsed.as_secs_f64()
    );
    println!("╚══════════════════════════════════════════════════╝");

    if !result.errors.is_empty() {
        println!();
        println!("{}", style("❌ Errors encountered:").red().bold());
        for (path, error) in &result.errors {
            println!("   {} — {}", path.display(), error);
        }
    }
}
