//! Generation Client Adapter
//!
//! The engine's only view of the model: one single-shot call for style
//! planning and one streamed call per artifact. [`ProviderAdapter`] backs the
//! trait with any [`ModelProviderClient`].

use crate::error::ApiError;
use crate::generation::prompts::style_planning_prompt;
use crate::provider::{
    ChatMessage, CompletionOptions, CompletionStream, MessageRole, ModelProviderClient,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Lazy, single-consumption sequence of generated text fragments.
pub type FragmentStream = CompletionStream;

#[async_trait]
pub trait GenerationAdapter: Send + Sync {
    /// Ask for `count` style labels for `prompt`; returns the raw model text.
    async fn plan_styles_raw(&self, prompt: &str, count: usize) -> Result<String, ApiError>;

    /// Open a streamed generation for a fully built artifact prompt.
    async fn generate_artifact_stream(&self, prompt: &str) -> Result<FragmentStream, ApiError>;
}

pub struct ProviderAdapter {
    client: Arc<dyn ModelProviderClient>,
    options: CompletionOptions,
}

impl ProviderAdapter {
    pub fn new(client: Arc<dyn ModelProviderClient>, options: CompletionOptions) -> Self {
        Self { client, options }
    }

    pub fn client(&self) -> &dyn ModelProviderClient {
        self.client.as_ref()
    }

    fn user_message(content: String) -> Vec<ChatMessage> {
        vec![ChatMessage {
            role: MessageRole::User,
            content,
        }]
    }
}

#[async_trait]
impl GenerationAdapter for ProviderAdapter {
    async fn plan_styles_raw(&self, prompt: &str, count: usize) -> Result<String, ApiError> {
        let messages = Self::user_message(style_planning_prompt(prompt, count));
        let response = self.client.complete(messages, self.options.clone()).await?;
        Ok(response.content)
    }

    async fn generate_artifact_stream(&self, prompt: &str) -> Result<FragmentStream, ApiError> {
        let messages = Self::user_message(prompt.to_string());
        self.client.stream(messages, self.options.clone()).await
    }
}
