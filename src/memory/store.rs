//! Conversation history storage
//!
//! Ordered, role-tagged turns of one chat session, including tool requests
//! and tool results.

use crate::models::ToolRequest;
use serde::{Deserialize, Serialize};

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        }
    }
}

/// A single turn in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    /// Tool name, set on tool-result turns
    pub name: Option<String>,
    /// Correlation id linking a tool result to its request
    pub tool_call_id: Option<String>,
    /// Set on assistant turns that asked for a tool
    pub tool_request: Option<ToolRequest>,
    /// Approximate token count
    pub token_count: usize,
    /// Text shown in the user-facing transcript; `None` keeps the turn hidden
    pub display: Option<String>,
}

impl ChatMessage {
    fn build(role: MessageRole, content: String, display: Option<String>) -> Self {
        let token_count = (content.len() + 3) / 4;

        Self {
            role,
            content,
            name: None,
            tool_call_id: None,
            tool_request: None,
            token_count,
            display,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::build(MessageRole::System, content.into(), None)
    }

    pub fn user(content: impl Into<String>) -> Self {
        let content = content.into();
        Self::build(MessageRole::User, content.clone(), Some(content))
    }

    /// Final assistant answer: `raw` goes back to the collaborator,
    /// `shown` to the transcript
    pub fn answer(raw: impl Into<String>, shown: impl Into<String>) -> Self {
        Self::build(MessageRole::Assistant, raw.into(), Some(shown.into()))
    }

    /// Assistant turn that requested a tool
    pub fn tool_request(request: ToolRequest) -> Self {
        let mut message = Self::build(MessageRole::Assistant, String::new(), None);
        message.token_count = (request.name.len() + request.arguments.len() + 3) / 4;
        message.tool_request = Some(request);
        message
    }

    pub fn tool_result(
        name: impl Into<String>,
        tool_call_id: Option<String>,
        content: impl Into<String>,
    ) -> Self {
        let mut message = Self::build(MessageRole::Tool, content.into(), None);
        message.name = Some(name.into());
        message.tool_call_id = tool_call_id;
        message
    }
}

/// Conversation history for one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
    /// Total token count (approximate)
    total_tokens: usize,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            total_tokens: 0,
        }
    }

    /// History opened by a hidden system turn
    pub fn with_system_prompt(prompt: &str) -> Self {
        let mut history = Self::new();
        history.add_message(ChatMessage::system(prompt));
        history
    }

    pub fn add_message(&mut self, message: ChatMessage) {
        self.total_tokens += message.token_count;
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// User questions and final answers as shown, in order
    pub fn displayed(&self) -> impl Iterator<Item = (MessageRole, &str)> {
        self.messages
            .iter()
            .filter_map(|m| m.display.as_deref().map(|text| (m.role, text)))
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn total_tokens(&self) -> usize {
        self.total_tokens
    }

    /// Drop every message after the first `len`
    pub fn truncate(&mut self, len: usize) {
        if len >= self.messages.len() {
            return;
        }
        self.messages.truncate(len);
        self.recompute_total_tokens();
    }

    /// Recompute token count (prevents drift)
    fn recompute_total_tokens(&mut self) {
        self.total_tokens = self.messages.iter().map(|m| m.token_count).sum();
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_is_hidden() {
        let history = ConversationHistory::with_system_prompt("You are a finance assistant.");
        assert_eq!(history.message_count(), 1);
        assert_eq!(history.messages()[0].role, MessageRole::System);
        assert_eq!(history.displayed().count(), 0);
    }

    #[test]
    fn test_tool_turns() {
        let mut history = ConversationHistory::new();
        history.add_message(ChatMessage::user("What is my AAPL profit?"));
        history.add_message(ChatMessage::tool_request(ToolRequest {
            id: Some("call_1".to_string()),
            name: "calculate_profit_for_instrument".to_string(),
            arguments: r#"{"instrument":"AAPL"}"#.to_string(),
        }));
        history.add_message(ChatMessage::tool_result(
            "calculate_profit_for_instrument",
            Some("call_1".to_string()),
            "50.00",
        ));

        let result = history.last().unwrap();
        assert_eq!(result.role, MessageRole::Tool);
        assert_eq!(result.name.as_deref(), Some("calculate_profit_for_instrument"));
        assert_eq!(result.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(history.displayed().count(), 1);
        assert!(history.total_tokens() > 0);
    }

    #[test]
    fn test_truncate_rolls_back() {
        let mut history = ConversationHistory::with_system_prompt("sys");
        let before_tokens = history.total_tokens();

        history.add_message(ChatMessage::user("question one"));
        history.add_message(ChatMessage::answer(r#"{"value": "answer"}"#, "answer"));
        history.truncate(1);

        assert_eq!(history.message_count(), 1);
        assert_eq!(history.total_tokens(), before_tokens);
    }

    #[test]
    fn test_answer_keeps_raw_content_and_shows_unwrapped_text() {
        let mut history = ConversationHistory::with_system_prompt("sys");
        history.add_message(ChatMessage::user("profit?"));
        history.add_message(ChatMessage::answer(r#"{"value": "50.00"}"#, "50.00"));

        assert_eq!(history.last().unwrap().content, r#"{"value": "50.00"}"#);
        assert_eq!(
            history.displayed().collect::<Vec<_>>(),
            vec![(MessageRole::User, "profit?"), (MessageRole::Assistant, "50.00")]
        );
    }
}
