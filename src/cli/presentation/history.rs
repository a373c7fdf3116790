//! History formatters: session list and per-session artifact table.

use super::shared::{format_section_heading, format_timestamp, status_label, truncate};
use crate::session::Session;
use crate::state::HistorySnapshot;
use comfy_table::Table;

/// All sessions, oldest first, with the current one marked.
pub fn format_history_table(snapshot: &HistorySnapshot) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Sessions")));
    if snapshot.sessions.is_empty() {
        out.push_str("No sessions yet. Run `flashui generate <prompt>` to start one.\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["", "Session", "Created", "Prompt", "Done", "Failed", "Running"]);
    for (index, session) in snapshot.sessions.iter().enumerate() {
        let marker = if snapshot.current == Some(index) { "*" } else { "" };
        let counts = session.status_counts();
        table.add_row(vec![
            marker.to_string(),
            session.id().to_string(),
            format_timestamp(session.created_at()),
            truncate(session.prompt(), 40),
            counts.complete.to_string(),
            counts.error.to_string(),
            counts.streaming.to_string(),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out
}

/// One session's artifacts in display order.
pub fn format_session_table(session: &Session) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n\n",
        format_section_heading(&format!("Session {}", session.id()))
    ));
    out.push_str(&format!("Prompt: {}\n", session.prompt()));
    out.push_str(&format!("Created: {}\n\n", format_timestamp(session.created_at())));

    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["#", "Artifact", "Style", "Status", "Size"]);
    for (position, artifact) in session.artifacts().iter().enumerate() {
        table.add_row(vec![
            (position + 1).to_string(),
            artifact.id().to_string(),
            artifact.style_name().to_string(),
            status_label(artifact.status()),
            format!("{} B", artifact.html().len()),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out
}
