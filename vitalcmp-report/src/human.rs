//! Human-Readable Output
//!
//! Terminal-friendly rendering: a per-file table, the aggregate summary,
//! and a mismatch detail section for files that diverged.

use crate::report::{FileStatus, Report};

const RULE_WIDTH: usize = 80;

/// Format a report for terminal display.
pub fn format_human_output(report: &Report) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("vitalcmp Results\n");
    output.push_str(&"=".repeat(RULE_WIDTH));
    output.push_str("\n\n");

    // Per-file table.
    output.push_str(&format!(
        "{:<30} {:>9} {:>9} {:>9} {:>9} {:>7}\n",
        "File", "Size(MB)", "Ref(s)", "Cand(s)", "Speedup", "Match"
    ));
    output.push_str(&"-".repeat(RULE_WIDTH));
    output.push('\n');

    for result in &report.results {
        let size_mb = result.file_size_bytes as f64 / 1024.0 / 1024.0;
        let ref_secs = result
            .reference
            .as_ref()
            .map(|m| format!("{:.4}", m.mean_secs))
            .unwrap_or_else(|| "-".to_string());
        let cand_secs = result
            .candidate
            .as_ref()
            .map(|m| format!("{:.4}", m.mean_secs))
            .unwrap_or_else(|| "-".to_string());
        let speedup = result
            .speedup
            .map(|s| format!("{s:.2}x"))
            .unwrap_or_else(|| "-".to_string());
        let verdict = match result.status {
            FileStatus::Matched => "✓",
            FileStatus::Mismatched => "✗",
            FileStatus::Failed => "error",
        };

        output.push_str(&format!(
            "{:<30} {:>9.2} {:>9} {:>9} {:>9} {:>7}\n",
            result.file_name, size_mb, ref_secs, cand_secs, speedup, verdict
        ));
    }

    // Summary.
    let summary = &report.summary;
    output.push('\n');
    output.push_str("Summary\n");
    output.push_str(&"-".repeat(RULE_WIDTH));
    output.push('\n');
    output.push_str(&format!("  Files attempted:   {}\n", summary.total_files));
    output.push_str(&format!(
        "  Accuracy matches:  {}/{} ({:.1}%)\n",
        summary.accuracy_matches, summary.total_files, summary.match_percent
    ));
    if summary.decode_failures > 0 {
        output.push_str(&format!(
            "  Decode failures:   {}\n",
            summary.decode_failures
        ));
    }
    output.push_str(&format!(
        "  Mean speedup:      {:.2}x\n",
        summary.mean_speedup
    ));
    output.push_str(&format!(
        "  Overall speedup:   {:.2}x (Σref {:.4}s / Σcand {:.4}s)\n",
        summary.overall_speedup, summary.total_reference_secs, summary.total_candidate_secs
    ));

    // Mismatch and failure detail.
    let problems: Vec<_> = report
        .results
        .iter()
        .filter(|r| r.status != FileStatus::Matched)
        .collect();
    if !problems.is_empty() {
        output.push('\n');
        output.push_str("Detail\n");
        output.push_str(&"-".repeat(RULE_WIDTH));
        output.push('\n');

        for result in problems {
            output.push_str(&format!("\n{}:\n", result.file_name));
            if let Some(failure) = &result.failure {
                output.push_str(&format!(
                    "  {} {:?} failure: {}\n",
                    failure.side, failure.kind, failure.message
                ));
                continue;
            }

            output.push_str(&format!(
                "  Mismatched tracks: {}\n",
                result.mismatched_tracks.len()
            ));
            for (key, diff) in result.differences.iter().take(5) {
                let rendered = serde_json::to_string(diff).unwrap_or_else(|_| "?".to_string());
                output.push_str(&format!("    - {key}: {rendered}\n"));
            }
            if result.differences.len() > 5 {
                output.push_str(&format!(
                    "    … and {} more\n",
                    result.differences.len() - 5
                ));
            }
        }
    }

    output
}
