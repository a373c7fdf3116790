//! Generation engine: style planning, per-artifact streaming jobs, retry
//! and stream merging.

pub mod adapter;
pub mod merger;
pub mod orchestrator;
pub mod prompts;
pub mod retry;
pub mod styles;

pub use adapter::{FragmentStream, GenerationAdapter, ProviderAdapter};
pub use merger::{finalize_html, ArtifactStreamMerger, StreamSummary, EDITABLE_TRAILER};
pub use orchestrator::{
    next_variation_count, GenerationSettings, JobOutcome, SessionOrchestrator, SessionReport,
    Submission,
};
pub use retry::{with_retry, RetryPolicy};
pub use styles::{parse_style_labels, PlanSource, StylePlan, StylePlanner};
