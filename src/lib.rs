//! Brokerage Trade Ledger Agent
//!
//! A conversational analytics engine over a brokerage trade log that:
//! - Normalizes raw CSV rows into cleaned transaction records
//! - Computes per-instrument PnL, expiration loss, ACH totals and risk advice
//! - Exposes those figures as a fixed catalog of named tools
//! - Answers questions through a two-round tool-calling chat loop
//!
//! TURN LOOP:
//! QUESTION → ROUND 1 → TOOL? → ROUND 2 → ANSWER

pub mod analytics;
pub mod config;
pub mod conversational;
pub mod error;
pub mod execution;
pub mod ledger;
pub mod llm;
pub mod memory;
pub mod models;
pub mod tools;

pub use error::Result;

// Re-export common types
pub use analytics::TradeAnalytics;
pub use config::AgentConfig;
pub use conversational::ChatSession;
pub use ledger::Ledger;
pub use models::*;
