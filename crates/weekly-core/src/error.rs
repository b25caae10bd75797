use chrono::Weekday;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeeklyError {
    #[error("not initialized: run 'weekly init'")]
    NotInitialized,

    #[error("invalid week key '{0}': expected YYYY-MM-DD")]
    InvalidWeekKey(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WeeklyError>;

/// The model answer did not contain a usable JSON value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no parseable JSON {expected} in response: {reason}")]
pub struct ParseFailure {
    pub expected: &'static str,
    pub reason: String,
}

/// Failure of an external collaborator (warehouse, AI service, key-value
/// store, identity, snapshot file).
#[derive(Debug, Error)]
pub enum SourceError {
    /// No client is configured for this collaborator.
    #[error("{0} is not available")]
    Unavailable(&'static str),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error(transparent)]
    Parse(#[from] ParseFailure),
}

impl SourceError {
    pub fn upstream(err: impl std::fmt::Display) -> Self {
        SourceError::Upstream(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefusalReason {
    #[error("Report generation is not available on {0}")]
    OutsideGenerationWindow(Weekday),

    #[error("Generation already in progress")]
    AlreadyGenerating,
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Refused(#[from] RefusalReason),

    #[error("Generation failed: {0}")]
    Aborted(String),
}
