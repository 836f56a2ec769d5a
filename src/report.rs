//! Human-readable and machine-readable output for scan results.

use serde_json::{Map, Value};

use crate::durations::{format_duration, sort_entries, DurationEntry};
use crate::probe::{ProbeResult, ProbeStatus};

const ID_WIDTH: usize = 50;

/// Render entries as a table sorted by (group, id).
pub fn render_table(entries: &[DurationEntry]) -> String {
    let mut sorted = entries.to_vec();
    sort_entries(&mut sorted);

    let mut out = String::new();
    out.push_str(&format!(
        "{:<width$} {:<10} {:>6} {:>9}\n",
        "Song",
        "Group",
        "Time",
        "Ms",
        width = ID_WIDTH
    ));
    out.push_str(&"-".repeat(ID_WIDTH + 28));
    out.push('\n');

    for e in &sorted {
        out.push_str(&format!(
            "{:<width$} {:<10} {:>6} {:>9}\n",
            truncate(&e.id, ID_WIDTH),
            e.group.as_deref().unwrap_or("-"),
            e.duration_formatted,
            e.duration_ms,
            width = ID_WIDTH
        ));
    }
    out
}

/// Render the id → milliseconds mapping as a pretty JSON object, keys in
/// (group, id) order. A repeated id keeps its first value.
pub fn render_json_mapping(entries: &[DurationEntry]) -> Result<String, serde_json::Error> {
    let mut sorted = entries.to_vec();
    sort_entries(&mut sorted);

    let mut mapping = Map::new();
    for e in sorted {
        mapping.entry(e.id).or_insert(Value::from(e.duration_ms));
    }
    serde_json::to_string_pretty(&Value::Object(mapping))
}

/// One line per probed file: status, formatted duration, millis, path.
pub fn render_probe_line(result: &ProbeResult) -> String {
    let status = match &result.status {
        ProbeStatus::Ok => "ok".to_string(),
        ProbeStatus::Unavailable => "unavailable".to_string(),
        ProbeStatus::Error(cause) => format!("error: {cause}"),
    };
    format!(
        "{:>6} {:>9}  {}  [{}]",
        format_duration(result.duration_ms),
        result.duration_ms,
        result.path.display(),
        status
    )
}

// Truncate on char boundaries; ids are often non-ASCII.
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let head: String = s.chars().take(width - 3).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}
