//! Core data models for tool requests and results

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Tool Results =================
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarValue {
    Number(Decimal),
    Text(String),
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Number(value) => write!(f, "{}", value),
            ScalarValue::Text(text) => write!(f, "{}", text),
        }
    }
}

impl From<Decimal> for ScalarValue {
    fn from(value: Decimal) -> Self {
        ScalarValue::Number(value)
    }
}

/// Column-labelled rows, already formatted as text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render as a GitHub-style pipe table without an index column
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!("| {} |\n", self.columns.join(" | ")));
        out.push_str(&format!(
            "|{}|\n",
            self.columns
                .iter()
                .map(|c| "-".repeat(c.len().max(3) + 2))
                .collect::<Vec<_>>()
                .join("|")
        ));

        for row in &self.rows {
            let cells: Vec<&str> = (0..self.columns.len())
                .map(|i| row.get(i).map(String::as_str).unwrap_or(""))
                .collect();
            out.push_str(&format!("| {} |\n", cells.join(" | ")));
        }

        out
    }
}

/// Value returned by a bound tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ToolResult {
    Scalar(ScalarValue),
    Table(Table),
    List(Vec<String>),
}

impl ToolResult {
    /// Text handed back to the collaborator as the tool turn's content
    pub fn to_display_text(&self) -> String {
        match self {
            ToolResult::Scalar(value) => value.to_string(),
            ToolResult::Table(table) => table.to_markdown(),
            ToolResult::List(items) => items
                .iter()
                .map(|item| format!("- {}", item))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

//
// ================= Tool I/O =================
//

/// A collaborator's request to run one named tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    /// Correlation id, present for the `tool_calls` protocol variant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    /// JSON-encoded argument object, possibly empty
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failed,
    Skipped,
}

/// Outcome of servicing one tool request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolObservation {
    pub tool_name: String,
    pub call_id: Option<String>,
    pub status: ExecutionStatus,
    pub content: String,
    pub execution_time_ms: u64,
}
