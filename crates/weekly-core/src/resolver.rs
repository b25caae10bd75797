//! Three-tier data resolution: live source, static snapshot, placeholder.
//!
//! Each category (metrics, owned projects, dependent projects) is resolved
//! independently. A failing or empty tier is logged and the next tier is
//! tried; the placeholder tier is built from configuration and always
//! succeeds, so none of the `resolve_*` functions can fail.
//!
//! Enrichment through the AI service (narrative condensation, dependent
//! status lookup) only ever touches live-tier data and degrades per item.

use crate::config::{DependentProjectConfig, TeamConfig};
use crate::error::SourceError;
use crate::extract::{extract_json, JsonShape};
use crate::report::{
    placeholder_dependents, placeholder_metrics, placeholder_projects, DependentProjectStatus,
    MetricsSnapshot, ProjectStatus, Report, NOT_SET, NO_UPDATES_NARRATIVE, STATUS_FETCH_FAILED,
    STATUS_UNKNOWN,
};
use crate::sources::{AskOptions, Row, Sources};
use crate::types::{DateHealth, ProjectState, RiskLevel};
use crate::week::WeekKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Narratives shorter than this are kept verbatim.
pub const MIN_CONDENSE_CHARS: usize = 50;
const UNKNOWN_PROJECT: &str = "Unknown Project";

// ---------------------------------------------------------------------------
// Tier / Resolved
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Live,
    Static,
    Placeholder,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Live => "live",
            Tier::Static => "static",
            Tier::Placeholder => "placeholder",
        }
    }
}

/// A resolved category value and the tier it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub tier: Tier,
}

impl<T> Resolved<T> {
    fn new(value: T, tier: Tier) -> Self {
        Self { value, tier }
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

pub struct Resolver<'a> {
    config: &'a TeamConfig,
    sources: &'a Sources,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a TeamConfig, sources: &'a Sources) -> Self {
        Self { config, sources }
    }

    pub async fn resolve_metrics(&self, week: &WeekKey) -> Resolved<MetricsSnapshot> {
        match self.live_metrics().await {
            Ok(Some(metrics)) => return Resolved::new(metrics, Tier::Live),
            Ok(None) => info!(category = "metrics", tier = "live", "no live data"),
            Err(e) => warn!(category = "metrics", tier = "live", error = %e, "falling back"),
        }
        if self.config.metrics.static_tier {
            if let Some(snapshot) = self.snapshot(week, "metrics").await {
                if !snapshot.metrics.is_all_unavailable() {
                    return Resolved::new(snapshot.metrics, Tier::Static);
                }
            }
        }
        Resolved::new(placeholder_metrics(self.config), Tier::Placeholder)
    }

    pub async fn resolve_projects(&self, week: &WeekKey) -> Resolved<Vec<ProjectStatus>> {
        match self.live_projects().await {
            Ok(Some(projects)) => {
                let projects = self.condense_narratives(projects).await;
                return Resolved::new(projects, Tier::Live);
            }
            Ok(None) => info!(category = "projects", tier = "live", "no live data"),
            Err(e) => warn!(category = "projects", tier = "live", error = %e, "falling back"),
        }
        if let Some(snapshot) = self.snapshot(week, "projects").await {
            if !snapshot.projects.is_empty() {
                return Resolved::new(snapshot.projects, Tier::Static);
            }
        }
        Resolved::new(placeholder_projects(self.config), Tier::Placeholder)
    }

    pub async fn resolve_dependents(&self, week: &WeekKey) -> Resolved<Vec<DependentProjectStatus>> {
        match self.live_dependents().await {
            Ok(Some(dependents)) => return Resolved::new(dependents, Tier::Live),
            Ok(None) => info!(category = "dependents", tier = "live", "no live data"),
            Err(e) => warn!(category = "dependents", tier = "live", error = %e, "falling back"),
        }
        if let Some(snapshot) = self.snapshot(week, "dependents").await {
            if !snapshot.dependent_projects.is_empty() {
                return Resolved::new(snapshot.dependent_projects, Tier::Static);
            }
        }
        Resolved::new(placeholder_dependents(self.config), Tier::Placeholder)
    }

    async fn snapshot(&self, week: &WeekKey, category: &'static str) -> Option<Report> {
        match self.sources.snapshots.load(week).await {
            Ok(Some(report)) => Some(report),
            Ok(None) => {
                debug!(category, tier = "static", week = %week, "no snapshot");
                None
            }
            Err(e) => {
                warn!(category, tier = "static", week = %week, error = %e, "snapshot unreadable");
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Live tiers
    // -----------------------------------------------------------------------

    /// `Ok(None)` when nothing is configured or every query came back empty.
    async fn live_metrics(&self) -> Result<Option<MetricsSnapshot>, SourceError> {
        let queries = &self.config.metrics.queries;
        if queries.is_empty() {
            return Ok(None);
        }
        let mut metrics = placeholder_metrics(self.config);
        let mut any_rows = false;
        for query in queries {
            let rows = self.sources.warehouse.query(&query.sql).await?;
            let Some(first) = rows.first() else {
                debug!(query = %query.name, "metric query returned no rows");
                continue;
            };
            any_rows = true;
            for field in &query.fields {
                metrics.set(field.key.clone(), first.get(&field.column).and_then(number));
            }
        }
        Ok(any_rows.then_some(metrics))
    }

    async fn live_projects(&self) -> Result<Option<Vec<ProjectStatus>>, SourceError> {
        let Some(sql) = self.config.projects.render_query() else {
            return Ok(None);
        };
        let rows = self.sources.warehouse.query(&sql).await?;
        if rows.is_empty() {
            return Ok(None);
        }
        debug!(count = rows.len(), "fetched live projects");
        Ok(Some(rows.iter().map(project_from_row).collect()))
    }

    /// Fails as a whole only when the AI service is absent; any other
    /// lookup failure degrades that one entry.
    async fn live_dependents(&self) -> Result<Option<Vec<DependentProjectStatus>>, SourceError> {
        let configured = &self.config.dependents.projects;
        if configured.is_empty() {
            return Ok(None);
        }
        let mut out = Vec::with_capacity(configured.len());
        for dep in configured {
            let Some(tracker_id) = dep.tracker_id.as_deref() else {
                out.push(DependentProjectStatus::with_status(dep, STATUS_UNKNOWN));
                continue;
            };
            match self.lookup_dependent(dep, tracker_id).await {
                Ok(status) => out.push(status),
                Err(e @ SourceError::Unavailable(_)) => return Err(e),
                Err(e) => {
                    warn!(project = %dep.name, tracker_id, error = %e, "dependent lookup failed");
                    out.push(DependentProjectStatus::with_status(dep, STATUS_FETCH_FAILED));
                }
            }
        }
        Ok(Some(out))
    }

    async fn lookup_dependent(
        &self,
        dep: &DependentProjectConfig,
        tracker_id: &str,
    ) -> Result<DependentProjectStatus, SourceError> {
        let options = AskOptions {
            model: Some(self.config.ai.model.clone()),
            max_tokens: Some(self.config.ai.lookup_max_tokens),
            tools: vec![self.config.dependents.tracker_tool.clone()],
        };
        let answer = self
            .sources
            .reasoner
            .ask(&dependent_prompt(tracker_id), &options)
            .await?;
        let found: DependentLookup = extract_json(&answer, JsonShape::Object)?;
        Ok(DependentProjectStatus {
            name: non_empty(found.name).unwrap_or_else(|| dep.name.clone()),
            team: dep.team.clone(),
            lead: dep.lead.clone(),
            status: non_empty(found.status).unwrap_or_else(|| STATUS_UNKNOWN.to_string()),
            impact: dep.impact.clone(),
            target_date: non_empty(found.target_date).unwrap_or_else(|| NOT_SET.to_string()),
        })
    }

    // -----------------------------------------------------------------------
    // Narrative condensation
    // -----------------------------------------------------------------------

    async fn condense_narratives(&self, projects: Vec<ProjectStatus>) -> Vec<ProjectStatus> {
        let options = AskOptions {
            model: Some(self.config.ai.model.clone()),
            max_tokens: Some(self.config.ai.summary_max_tokens),
            tools: Vec::new(),
        };
        let mut out = Vec::with_capacity(projects.len());
        let mut available = true;
        for mut project in projects {
            if available && should_condense(&project.narrative) {
                let prompt = condense_prompt(&project.name, &project.narrative);
                match self.sources.reasoner.ask(&prompt, &options).await {
                    Ok(answer) => {
                        let answer = answer.trim();
                        if !answer.is_empty() {
                            project.narrative = answer.to_string();
                        }
                    }
                    Err(SourceError::Unavailable(what)) => {
                        info!(service = what, "narratives kept verbatim");
                        available = false;
                    }
                    Err(e) => warn!(project = %project.name, error = %e, "condensation failed"),
                }
            }
            out.push(project);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct DependentLookup {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, rename = "targetDate", alias = "target_date")]
    target_date: Option<String>,
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

/// Numbers pass through; numeric strings are parsed; anything else is unavailable.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn flag(row: &Row, column: &str) -> bool {
    match row.get(column) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1"),
        _ => false,
    }
}

/// Normalise one tracker row. Date health and risk are always derived.
pub fn project_from_row(row: &Row) -> ProjectStatus {
    let raw_health = text(row, "date_health");
    ProjectStatus {
        tracker_id: text(row, "project_id"),
        name: text(row, "name").unwrap_or_else(|| UNKNOWN_PROJECT.to_string()),
        state: text(row, "state")
            .map(|s| ProjectState::parse_lenient(&s))
            .unwrap_or(ProjectState::Unknown),
        owner: text(row, "owner")
            .or_else(|| text(row, "champion"))
            .unwrap_or_else(|| NOT_SET.to_string()),
        target_date: text(row, "target_end_date")
            .or_else(|| text(row, "target_date"))
            .unwrap_or_else(|| NOT_SET.to_string()),
        date_health: DateHealth::normalize(raw_health.as_deref()),
        risk: RiskLevel::derive(
            flag(row, "is_off_track_active_project"),
            flag(row, "is_past_due_date"),
            raw_health.as_deref(),
        ),
        priority: text(row, "priority")
            .map(|p| p.to_lowercase())
            .unwrap_or_else(crate::config::default_priority),
        narrative: text(row, "recent_updates")
            .or_else(|| text(row, "project_summary"))
            .unwrap_or_else(|| NO_UPDATES_NARRATIVE.to_string()),
    }
}

pub fn should_condense(narrative: &str) -> bool {
    narrative != NO_UPDATES_NARRATIVE && narrative.chars().count() >= MIN_CONDENSE_CHARS
}

fn condense_prompt(name: &str, narrative: &str) -> String {
    format!(
        "Summarize these recent project updates into 2-3 concise sentences for a weekly \
team status report. Focus on what was accomplished and any blockers or risks.

Project: {name}
Raw updates: {narrative}

Return ONLY the summary text, no formatting or labels."
    )
}

fn dependent_prompt(tracker_id: &str) -> String {
    format!(
        "Use the project tracker tool to fetch project #{tracker_id}.

Return ONLY a JSON object with these fields (no markdown, no explanation):
{{
  \"name\": \"project name\",
  \"status\": \"brief status summary\",
  \"targetDate\": \"target date or null\"
}}"
    )
}
