//! Output formatting utilities for CLI commands

use chrono::{DateTime, Local, Utc};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use serde::Serialize;

/// Format a timestamp relative to now.
///
/// Examples:
/// - "2 seconds ago"
/// - "3 hours ago"
/// - "2024-12-15 14:30" (if older than a week)
pub fn format_time(time: DateTime<Utc>) -> String {
    format_time_at(time, Utc::now())
}

fn format_time_at(time: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - time).num_seconds();
    if secs < 0 {
        return "just now".to_string();
    }
    let plural = |n: i64| if n == 1 { "" } else { "s" };

    if secs < 60 {
        format!("{} second{} ago", secs, plural(secs))
    } else if secs < 3600 {
        let mins = secs / 60;
        format!("{} minute{} ago", mins, plural(mins))
    } else if secs < 86400 {
        let hours = secs / 3600;
        format!("{} hour{} ago", hours, plural(hours))
    } else if secs < 604800 {
        let days = secs / 86400;
        format!("{} day{} ago", days, plural(days))
    } else {
        time.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
    }
}

/// Print a table with headers and rows
pub fn print_table(headers: &[&str], rows: Vec<Vec<(String, Option<Color>)>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| Cell::new(h).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);

    for row in rows {
        let cells: Vec<Cell> = row
            .into_iter()
            .map(|(text, color)| match color {
                Some(c) => Cell::new(text).fg(c),
                None => Cell::new(text),
            })
            .collect();
        table.add_row(cells);
    }

    println!("{}", table);
}

/// Color for a post status column
pub fn color_for_status(status: &str) -> Option<Color> {
    match status {
        "pending" => Some(Color::Yellow),
        "published" => Some(Color::Green),
        "cancelled" => Some(Color::DarkGrey),
        _ => None,
    }
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Status-only JSON object, e.g. `{"status": "no_completed_run"}`.
pub fn print_json_status(status: &str) -> anyhow::Result<()> {
    print_json(&serde_json::json!({ "status": status }))
}
