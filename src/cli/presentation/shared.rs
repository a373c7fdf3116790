//! Formatting helpers shared by the command families.

use crate::session::ArtifactStatus;
use owo_colors::OwoColorize;

/// Colored status word.
pub fn status_label(status: ArtifactStatus) -> String {
    match status {
        ArtifactStatus::Streaming => status.as_str().yellow().to_string(),
        ArtifactStatus::Complete => status.as_str().green().to_string(),
        ArtifactStatus::Error => status.as_str().red().to_string(),
    }
}

pub(super) fn format_section_heading(title: &str) -> String {
    title.bold().underline().to_string()
}

/// Render epoch milliseconds as a local-agnostic UTC timestamp.
pub(super) fn format_timestamp(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Shorten to `max` characters, appending an ellipsis when cut.
pub(super) fn truncate(text: &str, max: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= max {
        return single_line;
    }
    let mut cut: String = single_line.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
