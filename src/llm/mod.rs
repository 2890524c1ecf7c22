//! Conversational collaborator seam
//!
//! The dispatch loop only needs one blocking round-trip:
//! history + tool schemas in, text or a single tool request out.

pub mod openai;

pub use openai::OpenAiCompatibleClient;

use crate::memory::ChatMessage;
use crate::models::ToolRequest;
use crate::tools::ToolSchema;
use crate::Result;
use async_trait::async_trait;

/// One collaborator reply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionReply {
    pub content: Option<String>,
    pub tool_request: Option<ToolRequest>,
}

impl CompletionReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_request: None,
        }
    }

    pub fn tool(request: ToolRequest) -> Self {
        Self {
            content: None,
            tool_request: Some(request),
        }
    }
}

/// Trait for chat completion backends
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// `tools` is empty when no tool call may be requested
    async fn complete(&self, history: &[ChatMessage], tools: &[ToolSchema])
        -> Result<CompletionReply>;
}
