//! Environment-driven configuration
//!
//! Values are read from the process environment; the binary loads `.env` first.

use crate::error::LedgerAgentError;
use crate::Result;
use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434/v1";
pub const DEFAULT_MODEL: &str = "dwightfoster03/functionary-small-v3.1:latest";
pub const DEFAULT_API_KEY: &str = "ollama";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Opening system turn of every session
pub const SYSTEM_PROMPT: &str =
    "You are a finance assistant. If you need calculations, call one of the available functions.";

/// Settings for the chat completion collaborator
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    /// Ask the endpoint for `json_object` responses
    pub json_mode: bool,
    pub timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            json_mode: true,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl AgentConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = non_empty("LEDGER_AGENT_BASE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);

        let model = non_empty("LEDGER_AGENT_MODEL").unwrap_or(defaults.model);
        let api_key = non_empty("LEDGER_AGENT_API_KEY").unwrap_or(defaults.api_key);

        let json_mode = match non_empty("LEDGER_AGENT_JSON_MODE") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                LedgerAgentError::ConfigError(format!(
                    "LEDGER_AGENT_JSON_MODE must be true or false, got '{}'",
                    raw
                ))
            })?,
            None => defaults.json_mode,
        };

        let timeout = match non_empty("LEDGER_AGENT_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    LedgerAgentError::ConfigError(format!(
                        "LEDGER_AGENT_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                        raw
                    ))
                })?;
                Duration::from_secs(secs)
            }
            None => defaults.timeout,
        };

        Ok(Self {
            base_url,
            model,
            api_key,
            json_mode,
            timeout,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
