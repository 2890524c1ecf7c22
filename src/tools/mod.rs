//! Tool catalog
//!
//! A fixed template of named, schema-described operations. Each session
//! binds the template to its own `TradeAnalytics`; the template itself is
//! never mutated.

use crate::analytics::TradeAnalytics;
use crate::error::LedgerAgentError;
use crate::models::{ScalarValue, ToolResult};
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Keyword arguments of a tool call
pub type ToolArgs = Map<String, Value>;

/// Operation bound to an analytics snapshot
pub type ToolHandler = fn(&TradeAnalytics, &ToolArgs) -> Result<ToolResult>;

pub const PROFIT_FOR_INSTRUMENT: &str = "calculate_profit_for_instrument";
pub const MAX_TRANSACTION: &str = "get_max_transaction";
pub const ACH_TRANSACTIONS_SUM: &str = "calculate_ach_transactions_sum";
pub const EXP_LOSS_PERCENTAGE: &str = "calculate_exp_loss_percentage";
pub const RISK_MANAGEMENT_ADVICE: &str = "risk_management_advice";

/// Name, description and JSON-Schema parameters, as shown to the collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolSchema {
    /// Parameter names listed under `required`
    pub fn required_params(&self) -> Vec<&str> {
        self.parameters
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// OpenAI `tools` entry
    pub fn to_function_tool(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

struct ToolTemplate {
    name: &'static str,
    description: &'static str,
    parameters: fn() -> Value,
    handler: ToolHandler,
}

fn no_parameters() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn instrument_parameter() -> Value {
    json!({
        "type": "object",
        "properties": {
            "instrument": {
                "type": "string",
                "description": "Ticker / option root"
            }
        },
        "required": ["instrument"]
    })
}

const TOOL_TEMPLATES: [ToolTemplate; 5] = [
    ToolTemplate {
        name: PROFIT_FOR_INSTRUMENT,
        description: "Return the total (realised) profit or loss for a single symbol.",
        parameters: instrument_parameter,
        handler: profit_for_instrument,
    },
    ToolTemplate {
        name: MAX_TRANSACTION,
        description: "Largest realised profit or loss of any single instrument in the trade log.",
        parameters: no_parameters,
        handler: max_transaction,
    },
    ToolTemplate {
        name: ACH_TRANSACTIONS_SUM,
        description: "Sum of all ACH transactions.",
        parameters: no_parameters,
        handler: ach_transactions_sum,
    },
    ToolTemplate {
        name: EXP_LOSS_PERCENTAGE,
        description: "Calculate the percentage of expiration loss.",
        parameters: no_parameters,
        handler: exp_loss_percentage,
    },
    ToolTemplate {
        name: RISK_MANAGEMENT_ADVICE,
        description: "Give risk management advice based on the trade log.",
        parameters: no_parameters,
        handler: risk_management_advice,
    },
];

//
// ================= Handlers =================
//

fn profit_for_instrument(analytics: &TradeAnalytics, args: &ToolArgs) -> Result<ToolResult> {
    let instrument = args
        .get("instrument")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            LedgerAgentError::InvalidToolInput(
                "Expected string 'instrument' in arguments".to_string(),
            )
        })?;

    Ok(ToolResult::Scalar(
        analytics.profit_for_instrument(instrument).into(),
    ))
}

fn max_transaction(analytics: &TradeAnalytics, _args: &ToolArgs) -> Result<ToolResult> {
    Ok(ToolResult::Scalar(ScalarValue::Number(analytics.max_pnl())))
}

fn ach_transactions_sum(analytics: &TradeAnalytics, _args: &ToolArgs) -> Result<ToolResult> {
    Ok(ToolResult::Scalar(ScalarValue::Number(analytics.ach_sum())))
}

fn exp_loss_percentage(analytics: &TradeAnalytics, _args: &ToolArgs) -> Result<ToolResult> {
    Ok(ToolResult::Scalar(ScalarValue::Number(
        analytics.expiration_loss_percentage(),
    )))
}

fn risk_management_advice(analytics: &TradeAnalytics, _args: &ToolArgs) -> Result<ToolResult> {
    Ok(ToolResult::List(analytics.risk_advice().to_vec()))
}

//
// ================= Catalog =================
//

pub struct BoundTool {
    schema: ToolSchema,
    handler: ToolHandler,
}

impl BoundTool {
    pub fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn takes_required_params(&self) -> bool {
        !self.schema.required_params().is_empty()
    }
}

/// Tools of one session, bound to that session's analytics
pub struct ToolCatalog {
    analytics: Arc<TradeAnalytics>,
    tools: Vec<BoundTool>,
}

impl ToolCatalog {
    pub fn bind(analytics: Arc<TradeAnalytics>) -> Self {
        let tools = TOOL_TEMPLATES
            .iter()
            .map(|template| BoundTool {
                schema: ToolSchema {
                    name: template.name.to_string(),
                    description: template.description.to_string(),
                    parameters: (template.parameters)(),
                },
                handler: template.handler,
            })
            .collect();

        Self { analytics, tools }
    }

    pub fn analytics(&self) -> &TradeAnalytics {
        &self.analytics
    }

    pub fn get(&self, name: &str) -> Option<&BoundTool> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    pub fn list(&self) -> Vec<&str> {
        self.tools.iter().map(BoundTool::name).collect()
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|tool| tool.schema.clone()).collect()
    }

    /// Run a tool by name against this catalog's analytics
    pub fn invoke(&self, name: &str, args: &ToolArgs) -> Result<ToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| LedgerAgentError::UnknownTool(name.to_string()))?;

        (tool.handler)(self.analytics(), args)
    }
}
