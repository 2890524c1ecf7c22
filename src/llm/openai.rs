//! OpenAI-compatible chat completion client
//!
//! Talks to any `/chat/completions` endpoint with tool calling, such as a
//! local Ollama server. Uses a long-lived reqwest::Client for connection pooling.

use crate::config::AgentConfig;
use crate::error::LedgerAgentError;
use crate::llm::{ChatCompletion, CompletionReply};
use crate::memory::{ChatMessage, MessageRole};
use crate::models::ToolRequest;
use crate::tools::ToolSchema;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{error, info, warn};

/// Reusable chat completion client (connection-pooled)
pub struct OpenAiCompatibleClient {
    client: Client,
    config: AgentConfig,
}

impl OpenAiCompatibleClient {
    pub fn new(config: AgentConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(4)
            .timeout(config.timeout)
            .build()?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn build_request(&self, history: &[ChatMessage], tools: &[ToolSchema]) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: to_wire_messages(history),
            tools: (!tools.is_empty())
                .then(|| tools.iter().map(ToolSchema::to_function_tool).collect()),
            tool_choice: (!tools.is_empty()).then(|| "auto".to_string()),
            response_format: self
                .config
                .json_mode
                .then(|| json!({ "type": "json_object" })),
            stream: false,
        }
    }
}

#[async_trait]
impl ChatCompletion for OpenAiCompatibleClient {
    async fn complete(
        &self,
        history: &[ChatMessage],
        tools: &[ToolSchema],
    ) -> Result<CompletionReply> {
        let request = self.build_request(history, tools);

        info!(
            model = %self.config.model,
            messages = request.messages.len(),
            tools = tools.len(),
            "Calling chat completion endpoint"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Chat completion request failed: {}", e);
                LedgerAgentError::LlmError(format!("chat completion request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Chat completion error response: {}", error_text);
            return Err(LedgerAgentError::LlmError(format!(
                "chat completion endpoint returned {}: {}",
                status, error_text
            )));
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            error!("Failed to parse chat completion response: {}", e);
            LedgerAgentError::LlmError(format!("chat completion parse error: {}", e))
        })?;

        parse_reply(body)
    }
}

//
// ================= Wire Format =================
//

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
    function_call: Option<WireFunction>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    id: Option<String>,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

impl WireFunction {
    /// Some servers send arguments as an object instead of a JSON string
    fn arguments_string(&self) -> String {
        match &self.arguments {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(raw)) => raw.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// History as `messages` entries
fn to_wire_messages(history: &[ChatMessage]) -> Vec<Value> {
    history
        .iter()
        .map(|message| match (message.role, &message.tool_request) {
            (MessageRole::Assistant, Some(request)) => match &request.id {
                Some(id) => json!({
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": id,
                        "type": "function",
                        "function": {
                            "name": request.name,
                            "arguments": request.arguments,
                        }
                    }]
                }),
                None => json!({
                    "role": "assistant",
                    "content": null,
                    "function_call": {
                        "name": request.name,
                        "arguments": request.arguments,
                    }
                }),
            },
            (MessageRole::Tool, _) => match &message.tool_call_id {
                Some(id) => json!({
                    "role": "tool",
                    "name": message.name,
                    "tool_call_id": id,
                    "content": message.content,
                }),
                None => json!({
                    "role": "function",
                    "name": message.name,
                    "content": message.content,
                }),
            },
            (role, _) => json!({
                "role": role.as_str(),
                "content": message.content,
            }),
        })
        .collect()
}

fn parse_reply(body: ChatResponse) -> Result<CompletionReply> {
    let message = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LedgerAgentError::LlmError("No choices in chat completion".to_string()))?
        .message;

    if message.tool_calls.len() > 1 {
        warn!(
            requested = message.tool_calls.len(),
            "Multiple tool calls requested; only the first is serviced"
        );
    }

    let tool_request = match message.tool_calls.into_iter().next() {
        Some(call) => Some(ToolRequest {
            id: call.id.clone(),
            name: call.function.name.clone(),
            arguments: call.function.arguments_string(),
        }),
        None => message.function_call.map(|function| ToolRequest {
            id: None,
            arguments: function.arguments_string(),
            name: function.name,
        }),
    };

    Ok(CompletionReply {
        content: message.content,
        tool_request,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(json_mode: bool) -> OpenAiCompatibleClient {
        OpenAiCompatibleClient::new(AgentConfig {
            json_mode,
            ..AgentConfig::default()
        })
        .unwrap()
    }

    fn schema() -> ToolSchema {
        ToolSchema {
            name: "calculate_ach_transactions_sum".to_string(),
            description: "Sum of all ACH transactions.".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        }
    }

    #[test]
    fn test_request_serialization() {
        let history = vec![
            ChatMessage::system("You are a finance assistant."),
            ChatMessage::user("How much did I deposit?"),
        ];

        let request = client(true).build_request(&history, &[schema()]);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "How much did I deposit?");
        assert_eq!(json["tools"][0]["function"]["name"], "calculate_ach_transactions_sum");
        assert_eq!(json["tool_choice"], "auto");
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn test_second_round_omits_tools() {
        let history = vec![ChatMessage::user("hi")];
        let json = serde_json::to_value(client(false).build_request(&history, &[])).unwrap();

        assert!(json.get("tools").is_none());
        assert!(json.get("tool_choice").is_none());
        assert!(json.get("response_format").is_none());
    }

    #[test]
    fn test_tool_turns_on_the_wire() {
        let request = ToolRequest {
            id: Some("call_9".to_string()),
            name: "risk_management_advice".to_string(),
            arguments: String::new(),
        };
        let history = vec![
            ChatMessage::tool_request(request),
            ChatMessage::tool_result("risk_management_advice", Some("call_9".to_string()), "- ok"),
            ChatMessage::tool_result("risk_management_advice", None, "- ok"),
        ];

        let wire = to_wire_messages(&history);
        assert_eq!(wire[0]["tool_calls"][0]["id"], "call_9");
        assert_eq!(wire[0]["tool_calls"][0]["function"]["name"], "risk_management_advice");
        assert_eq!(wire[1]["role"], "tool");
        assert_eq!(wire[1]["tool_call_id"], "call_9");
        assert_eq!(wire[2]["role"], "function");
    }

    #[test]
    fn test_parse_tool_call_reply() {
        let body: ChatResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "calculate_profit_for_instrument",
                            "arguments": "{\"instrument\": \"AAPL\"}"
                        }
                    }]
                }
            }]
        }))
        .unwrap();

        let reply = parse_reply(body).unwrap();
        let request = reply.tool_request.unwrap();
        assert_eq!(request.id.as_deref(), Some("call_1"));
        assert_eq!(request.name, "calculate_profit_for_instrument");
        assert_eq!(request.arguments, r#"{"instrument": "AAPL"}"#);
    }

    #[test]
    fn test_parse_legacy_function_call_with_object_arguments() {
        let body: ChatResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "content": "",
                    "function_call": {
                        "name": "calculate_profit_for_instrument",
                        "arguments": {"instrument": "TSLA"}
                    }
                }
            }]
        }))
        .unwrap();

        let request = parse_reply(body).unwrap().tool_request.unwrap();
        assert!(request.id.is_none());
        assert_eq!(request.arguments, r#"{"instrument":"TSLA"}"#);
    }

    #[test]
    fn test_parse_text_reply_and_empty_choices() {
        let body: ChatResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "content": "Hello" } }]
        }))
        .unwrap();
        assert_eq!(parse_reply(body).unwrap(), CompletionReply::text("Hello"));

        let empty: ChatResponse = serde_json::from_value(json!({ "choices": [] })).unwrap();
        assert!(matches!(parse_reply(empty), Err(LedgerAgentError::LlmError(_))));
    }
}
