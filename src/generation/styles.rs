//! Style Planner
//!
//! Turns one prompt into `count` style labels so parallel generations differ
//! from each other. Planning can never fail: a failed request or an
//! unparsable answer degrades to the configured fallback labels.

use crate::config::StylesConfig;
use crate::generation::adapter::GenerationAdapter;
use crate::generation::retry::RetryPolicy;
use std::sync::Arc;
use tracing::{debug, warn};

/// Where a set of labels came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanSource {
    Model,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StylePlan {
    pub labels: Vec<String>,
    pub source: PlanSource,
}

pub struct StylePlanner {
    adapter: Arc<dyn GenerationAdapter>,
    retry: RetryPolicy,
    fallback_labels: Vec<String>,
    default_label: String,
}

impl StylePlanner {
    pub fn new(adapter: Arc<dyn GenerationAdapter>, retry: RetryPolicy, styles: &StylesConfig) -> Self {
        Self {
            adapter,
            retry,
            fallback_labels: styles.fallback_labels.clone(),
            default_label: styles.default_label.clone(),
        }
    }

    /// Plan exactly `count` labels for `prompt`.
    pub async fn plan(&self, prompt: &str, count: usize) -> StylePlan {
        let response = self
            .retry
            .run("plan_styles", || self.adapter.plan_styles_raw(prompt, count))
            .await;

        let parsed = match response {
            Ok(text) => {
                let labels = parse_style_labels(&text);
                if labels.is_none() {
                    debug!(response = %text, "Style response did not contain a label array");
                }
                labels
            }
            Err(err) => {
                warn!(error = %err, "Style planning request failed, using fallback labels");
                None
            }
        };

        match parsed {
            Some(labels) => StylePlan {
                labels: self.fit(labels, count),
                source: PlanSource::Model,
            },
            None => StylePlan {
                labels: self.fallback(count),
                source: PlanSource::Fallback,
            },
        }
    }

    /// The built-in labels, truncated to `count` and padded with the default.
    pub fn fallback(&self, count: usize) -> Vec<String> {
        self.fit(self.fallback_labels.clone(), count)
    }

    fn fit(&self, mut labels: Vec<String>, count: usize) -> Vec<String> {
        labels.truncate(count);
        for label in labels.iter_mut() {
            if label.trim().is_empty() {
                *label = self.default_label.clone();
            }
        }
        labels.resize(count, self.default_label.clone());
        labels
    }
}

/// Extract the label array embedded in free text: the span from the first
/// `[` to the last `]` that parses as a JSON array of strings, preferring the
/// widest span.
pub fn parse_style_labels(text: &str) -> Option<Vec<String>> {
    let start = text.find('[')?;
    text[start..]
        .rmatch_indices(']')
        .find_map(|(end, _)| serde_json::from_str::<Vec<String>>(&text[start..=start + end]).ok())
        .map(|labels| labels.into_iter().map(|l| l.trim().to_string()).collect())
}
