use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::AiClientError;
use crate::types::{AskOptions, McpServer, MessageRequest, MessageResponse, ToolServer, WireMessage};
use crate::Result;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Beta flag that enables remote MCP servers on the Messages API.
pub const MCP_CLIENT_BETA: &str = "mcp-client-2025-04-04";

const MAX_ATTEMPTS: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

pub struct AiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    tools: HashMap<String, ToolServer>,
    retry_base: Duration,
}

impl AiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            tools: HashMap::new(),
            retry_base: Duration::from_secs(1),
        })
    }

    /// Read the API key from the named environment variable.
    pub fn from_env(var: &str) -> Result<Self> {
        let key = std::env::var(var)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AiClientError::MissingApiKey(var.to_string()))?;
        Self::new(key)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_tool(mut self, server: ToolServer) -> Self {
        self.tools.insert(server.name.clone(), server);
        self
    }

    /// Base delay for rate-limit backoff; attempt `n` waits `base * 2^n`.
    pub fn with_retry_base(mut self, base: Duration) -> Self {
        self.retry_base = base;
        self
    }

    /// Send one single-turn prompt and return the concatenated text answer.
    pub async fn ask(&self, prompt: &str, options: &AskOptions) -> Result<String> {
        let response = self.create_message(prompt, options).await?;
        if let Some(usage) = response.usage {
            debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                stop_reason = response.stop_reason.as_deref().unwrap_or(""),
                "model answered"
            );
        }
        Ok(response.text())
    }

    pub async fn create_message(&self, prompt: &str, options: &AskOptions) -> Result<MessageResponse> {
        let mcp_servers = options
            .tools
            .iter()
            .map(|name| -> Result<McpServer<'_>> {
                let server = self
                    .tools
                    .get(name)
                    .ok_or_else(|| AiClientError::UnknownTool(name.clone()))?;
                Ok(McpServer {
                    kind: "url",
                    url: &server.url,
                    name: &server.name,
                    authorization_token: server.authorization_token.as_deref(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let uses_tools = !mcp_servers.is_empty();

        let request = MessageRequest {
            model: options.model.as_deref().unwrap_or(DEFAULT_MODEL),
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS).max(1),
            messages: vec![WireMessage {
                role: "user",
                content: prompt,
            }],
            mcp_servers,
        };
        let url = format!("{}/v1/messages", self.base_url);

        let mut attempt = 0;
        loop {
            let mut builder = self
                .http
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&request);
            if uses_tools {
                builder = builder.header("anthropic-beta", MCP_CLIENT_BETA);
            }
            let response = builder.send().await?;

            match response.status().as_u16() {
                200 => return Ok(response.json::<MessageResponse>().await?),
                429 => {
                    attempt += 1;
                    if attempt >= MAX_ATTEMPTS {
                        return Err(AiClientError::RateLimited { attempts: attempt });
                    }
                    let wait = self.retry_base * 2u32.pow(attempt);
                    warn!(attempt, ?wait, "rate limited, backing off");
                    tokio::time::sleep(wait).await;
                }
                status => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(AiClientError::Api { status, body });
                }
            }
        }
    }
}
