//! Text rendering of extraction and analysis results

use crate::collab::AnalysisReport;
use crate::scout::MetricsRecord;
use std::fmt::Write;

/// Maximum length, in characters, of the reasoning and comparison excerpts.
pub const EXCERPT_CHARS: usize = 300;

/// Human-readable readiness report for a freshly drafted post.
pub fn render_readiness_report(metrics: &MetricsRecord, analysis: &AnalysisReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "PHYSICAL READINESS REPORT: {}", metrics.design_name);
    out.push('\n');
    let _ = writeln!(out, "Readiness score:        {}", analysis.readiness_score);
    let _ = writeln!(out, "Commercial correlation: {}", analysis.correlation);
    out.push('\n');
    out.push_str("Benchmark summary:\n");
    out.push_str(&indent(&render_metrics(metrics)));
    out.push('\n');

    if !analysis.reasoning.trim().is_empty() {
        out.push_str("Reasoning:\n");
        let _ = writeln!(out, "  {}", excerpt(analysis.reasoning.trim(), EXCERPT_CHARS));
        out.push('\n');
    }

    out.push_str("Vs. industry standard:\n");
    let _ = writeln!(out, "  {}", excerpt(analysis.comparison.trim(), EXCERPT_CHARS));
    out.push('\n');
    let _ = writeln!(out, "Verdict: {}", analysis.recommendation);
    out.push('\n');
    out.push_str("Draft post:\n");
    let _ = writeln!(out, "  {}", analysis.post_text);
    out.push('\n');
    out.push_str("Run 'tapeout confirm' to publish.");
    out
}

/// Plain metric summary, one field per line.
pub fn render_metrics(metrics: &MetricsRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Area:           {} mm2", metrics.area_mm2);
    let _ = writeln!(out, "Power:          {} mW", metrics.power_mw);
    let _ = writeln!(out, "Timing:         {} ns slack", metrics.slack_ns);
    let _ = writeln!(out, "DRC violations: {}", metrics.drc_violations);
    out
}

/// First `max_chars` characters of `text`, with `...` when cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

fn indent(block: &str) -> String {
    block.lines().map(|line| format!("  {}\n", line)).collect()
}
