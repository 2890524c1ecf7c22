//! Execution of collaborator tool requests
//!
//! Deterministic: looks the tool up, parses its arguments, runs it and
//! serializes the result. Failures become tool-result text, never errors.

use crate::error::LedgerAgentError;
use crate::models::{ExecutionStatus, ToolObservation, ToolRequest};
use crate::tools::{ToolArgs, ToolCatalog};
use crate::Result;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, warn};

/// Parse a JSON-encoded argument object.
///
/// Empty input and `null` mean "no arguments".
pub fn parse_arguments(raw: &str) -> Result<ToolArgs> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(ToolArgs::new());
    }

    match serde_json::from_str::<Value>(trimmed)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(ToolArgs::new()),
        other => Err(LedgerAgentError::InvalidToolInput(format!(
            "tool arguments must be a JSON object, got {}",
            other
        ))),
    }
}

/// Services tool requests against one session's catalog
pub struct ExecutionEngine {
    catalog: ToolCatalog,
}

impl ExecutionEngine {
    pub fn new(catalog: ToolCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Run one request and describe the outcome
    pub fn execute(&self, request: &ToolRequest) -> ToolObservation {
        let start = Instant::now();

        debug!(
            tool_name = %request.name,
            arguments = %request.arguments,
            "Executing tool request"
        );

        let (status, content) = match self.run(request) {
            Ok(content) => (ExecutionStatus::Success, content),
            Err(e @ LedgerAgentError::UnknownTool(_)) => {
                warn!(tool_name = %request.name, "Tool not registered");
                (
                    ExecutionStatus::Skipped,
                    format!(
                        "Error: {}. Available tools: {}",
                        e,
                        self.catalog.list().join(", ")
                    ),
                )
            }
            Err(e) => {
                warn!(tool_name = %request.name, error = %e, "Tool execution failed");
                (ExecutionStatus::Failed, format!("Error: {}", e))
            }
        };

        let execution_time_ms = start.elapsed().as_millis() as u64;

        debug!(
            tool_name = %request.name,
            ?status,
            execution_time_ms,
            "Tool request completed"
        );

        ToolObservation {
            tool_name: request.name.clone(),
            call_id: request.id.clone(),
            status,
            content,
            execution_time_ms,
        }
    }

    fn run(&self, request: &ToolRequest) -> Result<String> {
        let tool = self
            .catalog
            .get(&request.name)
            .ok_or_else(|| LedgerAgentError::UnknownTool(request.name.clone()))?;

        let args = match parse_arguments(&request.arguments) {
            Ok(args) => args,
            Err(e) if !tool.takes_required_params() => {
                warn!(
                    tool_name = %request.name,
                    error = %e,
                    "Ignoring malformed arguments for a tool without required parameters"
                );
                ToolArgs::new()
            }
            Err(e) => {
                return Err(LedgerAgentError::InvalidToolInput(format!(
                    "could not parse arguments for {}: {}",
                    request.name, e
                )))
            }
        };

        let result = self.catalog.invoke(&request.name, &args)?;
        Ok(result.to_display_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::TradeAnalytics;
    use std::sync::Arc;

    fn engine() -> ExecutionEngine {
        let analytics = TradeAnalytics::from_csv_str(
            "Instrument,Trans Code,Amount,Description\n\
             AAPL,BTO,$100.00,Apple\n\
             AAPL,STC,$150.00,Apple\n",
        )
        .unwrap();
        ExecutionEngine::new(ToolCatalog::bind(Arc::new(analytics)))
    }

    fn request(name: &str, arguments: &str) -> ToolRequest {
        ToolRequest {
            id: Some("call_0".to_string()),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    #[test]
    fn test_parse_arguments() {
        assert!(parse_arguments("").unwrap().is_empty());
        assert!(parse_arguments("  ").unwrap().is_empty());
        assert!(parse_arguments("null").unwrap().is_empty());
        assert_eq!(
            parse_arguments(r#"{"instrument":"AAPL"}"#).unwrap()["instrument"],
            "AAPL"
        );
        assert!(parse_arguments("[1, 2]").is_err());
        assert!(parse_arguments("{not json").is_err());
    }

    #[test]
    fn test_execute_success() {
        let observation = engine().execute(&request(
            "calculate_profit_for_instrument",
            r#"{"instrument": "AAPL"}"#,
        ));

        assert_eq!(observation.status, ExecutionStatus::Success);
        assert_eq!(observation.content, "50.00");
        assert_eq!(observation.call_id.as_deref(), Some("call_0"));
    }

    #[test]
    fn test_unknown_tool_is_reported_not_raised() {
        let observation = engine().execute(&request("get_stock_price", "{}"));

        assert_eq!(observation.status, ExecutionStatus::Skipped);
        assert!(observation.content.contains("Unknown tool: get_stock_price"));
        assert!(observation.content.contains("risk_management_advice"));
    }

    #[test]
    fn test_malformed_arguments_for_zero_parameter_tool() {
        let observation = engine().execute(&request("get_max_transaction", "{oops"));

        assert_eq!(observation.status, ExecutionStatus::Success);
        assert_eq!(observation.content, "50.00");
    }

    #[test]
    fn test_malformed_arguments_for_required_parameter_tool() {
        let observation =
            engine().execute(&request("calculate_profit_for_instrument", "{oops"));

        assert_eq!(observation.status, ExecutionStatus::Failed);
        assert!(observation.content.starts_with("Error: Invalid tool input"));
    }

    #[test]
    fn test_missing_required_argument() {
        let observation = engine().execute(&request("calculate_profit_for_instrument", ""));

        assert_eq!(observation.status, ExecutionStatus::Failed);
        assert!(observation.content.contains("instrument"));
    }
}
