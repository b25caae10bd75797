use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("environment variable {0} is not set")]
    MissingApiKey(String),

    #[error("tool '{0}' is not configured")]
    UnknownTool(String),
}
