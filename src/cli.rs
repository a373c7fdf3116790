//! CLI domain: parse, route, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, ConfigCommands, HistoryCommands, LibraryCommands};
pub use presentation::{
    format_history_table, format_library_table, format_report_summary, format_session_table,
    format_status_transition, status_label,
};
pub use route::{RunContext, StatusTracker};
