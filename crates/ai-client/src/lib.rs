//! `ai-client`: minimal async client for the hosted reasoning service.
//!
//! Sends single-turn prompts to the Anthropic Messages API and returns the
//! free-text answer. Named tool capabilities are remote MCP servers
//! registered on the client and attached per request by name.
//!
//! ```rust,ignore
//! use ai_client::{AiClient, AskOptions, ToolServer};
//!
//! let client = AiClient::from_env("ANTHROPIC_API_KEY")?.with_tool(ToolServer {
//!     name: "vault-mcp".into(),
//!     url: "https://vault.example.com/mcp".into(),
//!     authorization_token: None,
//! });
//! let answer = client
//!     .ask("Fetch project #42", &AskOptions { tools: vec!["vault-mcp".into()], ..Default::default() })
//!     .await?;
//! ```

pub mod client;
pub mod error;
pub mod types;

#[cfg(test)]
mod tests;

pub use client::{AiClient, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
pub use error::AiClientError;
pub use types::{AskOptions, ContentBlock, MessageResponse, ToolServer, Usage};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, AiClientError>;
