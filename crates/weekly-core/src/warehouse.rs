//! HTTP client for the warehouse query endpoint.
//!
//! Protocol: `POST {endpoint}` with body `{"query": "<sql>"}`; the response
//! is `{"rows": [{column: scalar, ...}, ...]}`.

use crate::error::SourceError;
use crate::sources::{Row, Warehouse};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    rows: Vec<Row>,
}

pub struct HttpWarehouse {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpWarehouse {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(SourceError::upstream)?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token,
        })
    }
}

#[async_trait]
impl Warehouse for HttpWarehouse {
    async fn query(&self, sql: &str) -> Result<Vec<Row>, SourceError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "query": sql }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(SourceError::upstream)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Upstream(format!(
                "warehouse returned {status}: {body}"
            )));
        }
        let parsed: QueryResponse = response.json().await.map_err(SourceError::upstream)?;
        tracing::debug!(rows = parsed.rows.len(), "warehouse query complete");
        Ok(parsed.rows)
    }
}
