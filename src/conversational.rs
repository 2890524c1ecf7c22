//! Conversational interaction handler
//!
//! Drives the two-round protocol of one chat session: the collaborator may
//! request a single tool in round one, the result is fed back, and round two
//! produces the final answer.

use crate::analytics::TradeAnalytics;
use crate::config::SYSTEM_PROMPT;
use crate::execution::ExecutionEngine;
use crate::llm::ChatCompletion;
use crate::memory::{ChatMessage, ConversationHistory};
use crate::tools::ToolCatalog;
use crate::Result;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// One user's session: ledger analytics, bound tools and running history
pub struct ChatSession {
    history: ConversationHistory,
    engine: ExecutionEngine,
    completion: Box<dyn ChatCompletion>,
}

impl ChatSession {
    pub fn new(analytics: Arc<TradeAnalytics>, completion: Box<dyn ChatCompletion>) -> Self {
        Self {
            history: ConversationHistory::with_system_prompt(SYSTEM_PROMPT),
            engine: ExecutionEngine::new(ToolCatalog::bind(analytics)),
            completion,
        }
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn analytics(&self) -> &TradeAnalytics {
        self.engine.catalog().analytics()
    }

    /// User questions and final answers as shown, in order
    pub fn transcript(&self) -> Vec<(&'static str, &str)> {
        self.history
            .displayed()
            .map(|(role, text)| (role.as_str(), text))
            .collect()
    }

    /// Answer one user turn.
    ///
    /// A collaborator failure leaves the history exactly as it was before
    /// the turn and is returned to the caller. The collaborator keeps seeing
    /// its own raw replies; only the returned text is unwrapped.
    pub async fn ask(&mut self, question: &str) -> Result<String> {
        let checkpoint = self.history.message_count();
        self.history.add_message(ChatMessage::user(question));

        match self.run_turn().await {
            Ok(answer) => Ok(answer),
            Err(e) => {
                warn!(error = %e, "Turn failed, rolling back history");
                self.history.truncate(checkpoint);
                Err(e)
            }
        }
    }

    async fn run_turn(&mut self) -> Result<String> {
        let schemas = self.engine.catalog().schemas();

        info!(
            round = 1,
            messages = self.history.message_count(),
            approx_tokens = self.history.total_tokens(),
            "Requesting completion"
        );
        let first = self
            .completion
            .complete(self.history.messages(), &schemas)
            .await?;

        let raw_answer = match first.tool_request {
            Some(request) => {
                let observation = self.engine.execute(&request);
                info!(
                    tool_name = %observation.tool_name,
                    status = ?observation.status,
                    execution_time_ms = observation.execution_time_ms,
                    "Tool result ready"
                );

                self.history.add_message(ChatMessage::tool_request(request));
                self.history.add_message(ChatMessage::tool_result(
                    observation.tool_name,
                    observation.call_id,
                    observation.content,
                ));

                info!(
                    round = 2,
                    messages = self.history.message_count(),
                    approx_tokens = self.history.total_tokens(),
                    "Requesting completion"
                );
                let second = self.completion.complete(self.history.messages(), &[]).await?;
                if let Some(extra) = &second.tool_request {
                    warn!(tool_name = %extra.name, "Ignoring tool request in the final round");
                }
                second.content.unwrap_or_default()
            }
            None => first.content.unwrap_or_default(),
        };

        let answer = unwrap_structured_answer(&raw_answer);
        self.history
            .add_message(ChatMessage::answer(raw_answer, answer.clone()));

        Ok(answer)
    }
}

/// Unwrap an answer given as a JSON object.
///
/// Uses `value` when present and truthy, otherwise the first field.
/// Anything that is not a non-empty object is returned verbatim.
pub fn unwrap_structured_answer(raw: &str) -> String {
    let object = match serde_json::from_str::<Value>(raw.trim()) {
        Ok(Value::Object(object)) if !object.is_empty() => object,
        _ => return raw.to_string(),
    };

    let chosen = match object.get("value") {
        Some(value) if is_truthy(value) => value,
        _ => match object.values().next() {
            Some(first) => first,
            None => return raw.to_string(),
        },
    };

    render_value(chosen)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map_or(true, |n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}
