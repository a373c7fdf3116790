//! Library formatter.

use super::shared::{format_section_heading, format_timestamp, truncate};
use crate::library::SavedArtifact;
use comfy_table::Table;

/// Saved artifacts, newest first.
pub fn format_library_table(items: &[SavedArtifact]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Library")));
    if items.is_empty() {
        out.push_str("Library is empty. Save an artifact with `flashui library save <artifact-id>`.\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Id", "Style", "Prompt", "Saved", "Size"]);
    for item in items {
        table.add_row(vec![
            item.id.clone(),
            item.style_name.clone(),
            truncate(&item.prompt, 40),
            format_timestamp(item.date),
            format!("{} B", item.html.len()),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out
}
