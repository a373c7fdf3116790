//! CLI presentation: text formatters per command family.

mod generate;
mod history;
mod library;
mod shared;

pub use generate::{format_report_summary, format_status_transition};
pub use history::{format_history_table, format_session_table};
pub use library::format_library_table;
pub use shared::status_label;
