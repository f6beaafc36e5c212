//! Human-readable rendering of aggregate statistics.

use aegis_core::AggregateStats;
use std::fmt::{Error as FmtError, Write as _};

/// Formats statistics as a multi-line report
///
/// # Errors
/// Returns an error if formatting fails
pub fn format_report(stats: &AggregateStats) -> Result<String, FmtError> {
    let mut output = String::new();

    writeln!(output, "Total Requests: {}", stats.total_requests)?;
    writeln!(output, "Cache Hit Rate: {:.1}%", stats.cache_hit_rate)?;
    writeln!(output, "Average Latency: {}ms", stats.avg_latency_ms)?;
    writeln!(output, "Total Cost: ${:.4}", stats.total_cost)?;
    writeln!(output, "Cost Savings: ${:.4}", stats.cost_savings)?;
    writeln!(
        output,
        "Hallucinations Caught: {} ({} analyses failed)",
        stats.hallucinations_caught, stats.analysis_failures
    )?;

    writeln!(output, "\nModel Distribution:")?;
    for (model, count) in &stats.model_distribution {
        let percentage = if stats.total_requests == 0 {
            0.0
        } else {
            *count as f64 / stats.total_requests as f64 * 100.0
        };
        writeln!(output, "  {model}: {count} requests ({percentage:.1}%)")?;
    }

    Ok(output)
}
