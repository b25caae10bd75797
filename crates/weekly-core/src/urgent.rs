//! Urgent-item synthesis: one reasoning call over everything resolved so far.

use crate::config::TeamConfig;
use crate::error::ParseFailure;
use crate::extract::{extract_json, JsonShape};
use crate::report::{DependentProjectStatus, MetricsSnapshot, ProjectStatus, UrgentItem};
use crate::sources::{AskOptions, Reasoner};
use std::fmt::Write as _;
use tracing::{info, warn};

/// The data block appended to the configured instructions.
pub fn build_context(
    config: &TeamConfig,
    metrics: &MetricsSnapshot,
    projects: &[ProjectStatus],
    dependents: &[DependentProjectStatus],
) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Metrics:");
    let order = config.metrics.keys();
    for (key, value) in metrics.in_order(&order) {
        match value {
            Some(v) => {
                let _ = writeln!(out, "- {key}: {v}");
            }
            None => {
                let _ = writeln!(out, "- {key}: N/A");
            }
        }
    }

    let _ = writeln!(out, "\nProjects:");
    for p in projects {
        let _ = writeln!(
            out,
            "- {}: State={}, Risk={}, DateHealth={}, Summary: {}",
            p.name, p.state, p.risk, p.date_health, p.narrative
        );
    }

    let _ = writeln!(out, "\nDependent Projects:");
    for d in dependents {
        let _ = writeln!(
            out,
            "- {} ({}): {}, {} Impact: {}",
            d.name, d.team, d.status, config.team_name, d.impact
        );
    }

    let _ = writeln!(out, "\nKey Upcoming Dates:");
    for kd in config.key_dates.iter().take(config.urgent.key_date_limit) {
        let _ = writeln!(out, "- {}: {}", kd.date, kd.event);
    }

    out
}

pub fn build_prompt(config: &TeamConfig, context: &str) -> String {
    format!("{}\n\nDATA:\n{}", config.urgent.prompt, context)
}

/// All-or-nothing: either every element of the first parseable array is a
/// well-formed item, or the answer is rejected.
pub fn parse_urgent_items(answer: &str) -> Result<Vec<UrgentItem>, ParseFailure> {
    let items: Vec<UrgentItem> = extract_json(answer, JsonShape::Array)?;
    Ok(items.into_iter().map(UrgentItem::bounded).collect())
}

/// Never fails; any upstream or parse failure yields no items.
pub async fn generate_urgent_items(
    config: &TeamConfig,
    reasoner: &dyn Reasoner,
    metrics: &MetricsSnapshot,
    projects: &[ProjectStatus],
    dependents: &[DependentProjectStatus],
) -> Vec<UrgentItem> {
    let prompt = build_prompt(config, &build_context(config, metrics, projects, dependents));
    let options = AskOptions {
        model: Some(config.ai.model.clone()),
        max_tokens: Some(config.ai.urgent_max_tokens),
        tools: Vec::new(),
    };
    let answer = match reasoner.ask(&prompt, &options).await {
        Ok(answer) => answer,
        Err(e) => {
            warn!(error = %e, "urgent items unavailable");
            return Vec::new();
        }
    };
    match parse_urgent_items(&answer) {
        Ok(items) => {
            info!(count = items.len(), "urgent items generated");
            items
        }
        Err(e) => {
            warn!(error = %e, "urgent items discarded");
            Vec::new()
        }
    }
}
