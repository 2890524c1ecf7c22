//! Agent Memory System
//!
//! Holds the running conversation of a session so every collaborator round
//! sees the full history.

pub mod store;

pub use store::{ChatMessage, ConversationHistory, MessageRole};
