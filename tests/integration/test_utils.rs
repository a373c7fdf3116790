//! Shared test utilities for integration tests
//!
//! A scripted generation adapter whose behavior is keyed by the style each
//! artifact prompt carries, plus an orchestrator builder with short delays.

use async_trait::async_trait;
use flashui::config::StylesConfig;
use flashui::generation::{
    FragmentStream, GenerationAdapter, GenerationSettings, RetryPolicy, SessionOrchestrator,
    StylePlanner,
};
use flashui::{ApiError, SessionStore};
use futures::stream;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Scripted behavior for one style.
#[derive(Clone)]
pub enum StyleScript {
    /// Stream these fragments and end cleanly.
    Stream(Vec<&'static str>),
    /// Fail to open with a rate limit `times` times, then stream.
    RateLimited {
        times: usize,
        fragments: Vec<&'static str>,
    },
    /// Stream these fragments, then yield an error.
    BreakAfter(Vec<&'static str>),
    /// Refuse to open with a non-retryable error.
    Denied,
}

pub struct ScriptedAdapter {
    plan: Result<String, String>,
    styles: HashMap<String, StyleScript>,
    opens: Mutex<HashMap<String, usize>>,
}

impl ScriptedAdapter {
    pub fn new(plan: &str) -> Self {
        Self {
            plan: Ok(plan.to_string()),
            styles: HashMap::new(),
            opens: Mutex::new(HashMap::new()),
        }
    }

    pub fn failing_plan(message: &str) -> Self {
        Self {
            plan: Err(message.to_string()),
            ..Self::new("")
        }
    }

    pub fn style(mut self, name: &str, script: StyleScript) -> Self {
        self.styles.insert(name.to_string(), script);
        self
    }

    /// Number of stream opens attempted for `style`.
    pub fn open_calls(&self, style: &str) -> usize {
        self.opens.lock().get(style).copied().unwrap_or(0)
    }
}

fn style_of(prompt: &str) -> String {
    prompt
        .split("Style: ")
        .nth(1)
        .and_then(|rest| rest.split('.').next())
        .unwrap_or_default()
        .to_string()
}

fn fragments(items: &[&'static str]) -> Vec<Result<String, ApiError>> {
    items.iter().map(|f| Ok(f.to_string())).collect()
}

#[async_trait]
impl GenerationAdapter for ScriptedAdapter {
    async fn plan_styles_raw(&self, _prompt: &str, _count: usize) -> Result<String, ApiError> {
        self.plan.clone().map_err(ApiError::ProviderError)
    }

    async fn generate_artifact_stream(&self, prompt: &str) -> Result<FragmentStream, ApiError> {
        let style = style_of(prompt);
        let attempt = {
            let mut opens = self.opens.lock();
            let count = opens.entry(style.clone()).or_insert(0);
            *count += 1;
            *count
        };
        let script = self
            .styles
            .get(&style)
            .cloned()
            .unwrap_or(StyleScript::Stream(vec!["<p>default</p>"]));
        match script {
            StyleScript::Stream(items) => Ok(Box::pin(stream::iter(fragments(&items)))),
            StyleScript::RateLimited { times, fragments: items } => {
                if attempt <= times {
                    Err(ApiError::ProviderRateLimit("429 RESOURCE_EXHAUSTED".to_string()))
                } else {
                    Ok(Box::pin(stream::iter(fragments(&items))))
                }
            }
            StyleScript::BreakAfter(items) => {
                let mut events = fragments(&items);
                events.push(Err(ApiError::ProviderRequestFailed(
                    "connection reset".to_string(),
                )));
                Ok(Box::pin(stream::iter(events)))
            }
            StyleScript::Denied => Err(ApiError::ProviderAuthFailed("key rejected".to_string())),
        }
    }
}

pub fn settings() -> GenerationSettings {
    GenerationSettings {
        stagger: Duration::from_millis(800),
        max_variations: 3,
        placeholder_label: "Loading".to_string(),
    }
}

pub fn orchestrator(
    store: Arc<SessionStore>,
    adapter: Arc<ScriptedAdapter>,
) -> SessionOrchestrator {
    let retry = RetryPolicy::new(3, Duration::from_millis(1500));
    let planner = StylePlanner::new(adapter.clone(), retry, &StylesConfig::default());
    SessionOrchestrator::with_parts(store, adapter, planner, retry, settings())
}
