//! Constructs concrete collaborators from the team config and injects them
//! into a [`Controller`]. Anything not configured gets its null object.

use ai_client::{AiClient, AiClientError};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use std::path::Path;
use std::sync::Arc;
use weekly_core::config::TeamConfig;
use weekly_core::error::SourceError;
use weekly_core::kv::RedbStore;
use weekly_core::lifecycle::{Clock, Controller, FixedClock, SystemClock};
use weekly_core::paths;
use weekly_core::sources::{
    AskOptions, EnvIdentity, FileSnapshots, NoReasoner, NoWarehouse, Reasoner, Sources, Warehouse,
};
use weekly_core::store::ReportStore;
use weekly_core::warehouse::HttpWarehouse;

pub struct Wired {
    pub controller: Controller,
    pub kv: Arc<RedbStore>,
}

pub fn clock(now: Option<DateTime<FixedOffset>>) -> Arc<dyn Clock> {
    match now {
        Some(at) => Arc::new(FixedClock(at)),
        None => Arc::new(SystemClock),
    }
}

pub fn load_config(root: &Path) -> anyhow::Result<TeamConfig> {
    TeamConfig::load(root).context("failed to load config")
}

pub fn controller(root: &Path, now: Option<DateTime<FixedOffset>>) -> anyhow::Result<Wired> {
    let config = load_config(root)?;
    let store_path = paths::store_path(root);
    let kv = Arc::new(
        RedbStore::open(&store_path)
            .with_context(|| format!("failed to open {}", store_path.display()))?,
    );
    let sources = Sources {
        warehouse: warehouse(&config)?,
        reasoner: reasoner(&config)?,
        identity: Arc::new(EnvIdentity),
        snapshots: Arc::new(FileSnapshots::new(paths::snapshots_dir(root))),
    };
    let controller = Controller::new(config, sources, ReportStore::new(kv.clone()), clock(now));
    Ok(Wired { controller, kv })
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn warehouse(config: &TeamConfig) -> anyhow::Result<Arc<dyn Warehouse>> {
    let Some(endpoint) = config.warehouse.endpoint.as_deref() else {
        tracing::debug!("no warehouse endpoint configured");
        return Ok(Arc::new(NoWarehouse));
    };
    let token = env_var(&config.warehouse.token_env);
    let client = HttpWarehouse::new(endpoint, token).context("failed to build warehouse client")?;
    Ok(Arc::new(client))
}

fn reasoner(config: &TeamConfig) -> anyhow::Result<Arc<dyn Reasoner>> {
    if !config.ai.enabled {
        return Ok(Arc::new(NoReasoner));
    }
    let mut client = match AiClient::from_env(&config.ai.api_key_env) {
        Ok(client) => client,
        Err(AiClientError::MissingApiKey(var)) => {
            tracing::info!(%var, "AI service disabled: no API key");
            return Ok(Arc::new(NoReasoner));
        }
        Err(e) => return Err(e).context("failed to build AI client"),
    };
    if let Some(base_url) = &config.ai.base_url {
        client = client.with_base_url(base_url.clone());
    }
    for (name, server) in &config.ai.tools {
        client = client.with_tool(ai_client::ToolServer {
            name: name.clone(),
            url: server.url.clone(),
            authorization_token: server.token_env.as_deref().and_then(env_var),
        });
    }
    Ok(Arc::new(AiReasoner { client }))
}

/// Adapts [`AiClient`] to the core's reasoning interface.
struct AiReasoner {
    client: AiClient,
}

#[async_trait]
impl Reasoner for AiReasoner {
    async fn ask(&self, prompt: &str, options: &AskOptions) -> Result<String, SourceError> {
        let options = ai_client::AskOptions {
            model: options.model.clone(),
            max_tokens: options.max_tokens,
            tools: options.tools.clone(),
        };
        self.client.ask(prompt, &options).await.map_err(|e| match e {
            // A tool that was never registered is a missing capability.
            AiClientError::UnknownTool(_) => SourceError::Unavailable("tracker tool"),
            other => SourceError::upstream(other),
        })
    }
}
