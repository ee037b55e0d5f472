//! Model collaborator: the provider trait and an OpenAI-compatible backend.

pub mod http;
pub mod openai;

use async_trait::async_trait;

use crate::error::MedicError;
use crate::tools::ToolDefinition;
use crate::types::{FinishReason, GenerationSettings, ModelMessage, ToolCall, Usage};

pub use openai::OpenAiProvider;

/// One reasoning-step request.
///
/// `system` is synthesized fresh for every step and never stored in the
/// conversation; `messages` holds only non-system history.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub system: String,
    pub messages: Vec<ModelMessage>,
    pub tools: Vec<ToolDefinition>,
    pub settings: GenerationSettings,
}

/// A whole (non-streamed) model reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Usage,
    pub finish_reason: Option<FinishReason>,
}

impl ModelReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_tool_call(mut self, call: ToolCall) -> Self {
        self.tool_calls.push(call);
        self
    }
}

/// Core trait implemented by model backends.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name (e.g., "openai").
    fn provider_name(&self) -> &str;
    /// The model ID this provider instance serves.
    fn model_id(&self) -> &str;

    /// Run one model round-trip. Errors are fatal to the run.
    async fn invoke(&self, request: &ProviderRequest) -> Result<ModelReply, MedicError>;
}
