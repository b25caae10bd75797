use serde::{Deserialize, Serialize};

// ─── Caller-facing ────────────────────────────────────────────────────────

/// A remote MCP server the model may call during a request.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolServer {
    /// Name the caller refers to the tool by, e.g. `vault-mcp`.
    pub name: String,
    pub url: String,
    pub authorization_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AskOptions {
    /// Falls back to [`crate::DEFAULT_MODEL`].
    pub model: Option<String>,
    /// Falls back to [`crate::DEFAULT_MAX_TOKENS`].
    pub max_tokens: Option<u32>,
    /// Names of registered tool servers to attach.
    pub tools: Vec<String>,
}

// ─── Wire format ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct MessageRequest<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    pub messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mcp_servers: Vec<McpServer<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct McpServer<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub url: &'a str,
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_token: Option<&'a str>,
}

/// `POST /v1/messages` response body. Only the fields this crate reads.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl MessageResponse {
    /// Every text block, joined by newlines. Tool-use blocks are skipped.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    /// `mcp_tool_use`, `mcp_tool_result`, and any future block type.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}
