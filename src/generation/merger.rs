//! Artifact Stream Merger
//!
//! Folds one artifact's fragment stream into the session store, one store
//! update per fragment, and applies the finalize transform when the stream
//! ends.

use crate::error::ApiError;
use crate::generation::adapter::FragmentStream;
use crate::state::{SessionStore, UpdateOutcome};
use crate::types::{ArtifactId, SessionId};
use futures::StreamExt;
use std::sync::Arc;
use tracing::debug;

/// Appended to every finalized artifact so the rendered document can be
/// edited in place.
pub const EDITABLE_TRAILER: &str = "\n<script>document.body.contentEditable = 'true'; \
document.body.style.cursor = 'text'; document.body.style.minHeight = '100vh';</script>";

/// Trim, unwrap a surrounding Markdown code fence, and append the editable
/// trailer.
pub fn finalize_html(raw: &str) -> String {
    let mut html = raw.trim();
    if let Some(rest) = html.strip_prefix("```") {
        // Opening fence may carry a language tag such as `html`.
        html = rest
            .trim_start_matches(|c: char| c.is_ascii_alphanumeric())
            .trim_start();
    }
    if let Some(rest) = html.strip_suffix("```") {
        html = rest.trim_end();
    }
    format!("{html}{EDITABLE_TRAILER}")
}

/// Totals for one drained stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub fragments: usize,
    pub bytes: usize,
}

#[derive(Clone)]
pub struct ArtifactStreamMerger {
    store: Arc<SessionStore>,
}

impl ArtifactStreamMerger {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    /// Append one fragment. Missing sessions or artifacts make this a no-op.
    pub fn merge_fragment(
        &self,
        session: &SessionId,
        artifact: &ArtifactId,
        fragment: &str,
    ) -> UpdateOutcome {
        self.store.merge_fragment(session, artifact, fragment)
    }

    /// Finalize the accumulated html and mark the artifact complete.
    pub fn finalize(&self, session: &SessionId, artifact: &ArtifactId) -> UpdateOutcome {
        self.store.complete_artifact(session, artifact, finalize_html)
    }

    /// Mark the artifact failed; partial html is kept for inspection.
    pub fn fail(&self, session: &SessionId, artifact: &ArtifactId) -> UpdateOutcome {
        self.store.fail_artifact(session, artifact)
    }

    /// Consume `stream` in order, merging each fragment. Returns the first
    /// stream error; fragments merged before it stay in place.
    pub async fn drain(
        &self,
        session: &SessionId,
        artifact: &ArtifactId,
        mut stream: FragmentStream,
    ) -> Result<StreamSummary, ApiError> {
        let mut summary = StreamSummary::default();
        while let Some(item) = stream.next().await {
            let fragment = item?;
            if fragment.is_empty() {
                continue;
            }
            summary.fragments += 1;
            summary.bytes += fragment.len();
            let outcome = self.merge_fragment(session, artifact, &fragment);
            if !outcome.is_applied() {
                debug!(artifact = %artifact, outcome = %outcome, "Fragment dropped");
            }
        }
        Ok(summary)
    }
}
