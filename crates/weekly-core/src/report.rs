//! The weekly report aggregate and its parts.
//!
//! Field names serialize in camelCase. Snapshot files written by earlier
//! dashboards use a few older names (`migrationMetrics`, `thisWeek`,
//! `vaultId`, `champion`, `targetEndDate`, `marketsImpact`); those are
//! accepted as aliases.

use crate::config::{default_priority, DependentProjectConfig, RosterProject, TeamConfig};
use crate::types::{DateHealth, ProjectState, RiskLevel};
use crate::week::WeekKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Narrative shown for roster projects before the first generation.
pub const PLACEHOLDER_NARRATIVE: &str = "Generate report to see weekly updates.";
/// Narrative used when the tracker returned no recent activity.
pub const NO_UPDATES_NARRATIVE: &str = "No updates available.";
pub const STATUS_UNKNOWN: &str = "Status unknown";
pub const STATUS_FETCH_FAILED: &str = "Failed to fetch";
/// Rendered for any missing date or owner.
pub const NOT_SET: &str = "--";
pub const UNKNOWN_USER: &str = "Unknown";

// ---------------------------------------------------------------------------
// MetricsSnapshot
// ---------------------------------------------------------------------------

/// Named numeric indicators. `None` means unavailable, never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricsSnapshot(BTreeMap<String, Option<f64>>);

impl MetricsSnapshot {
    /// A snapshot where every key is unavailable.
    pub fn unavailable<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(keys.into_iter().map(|k| (k.into(), None)).collect())
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied().flatten()
    }

    pub fn set(&mut self, key: impl Into<String>, value: Option<f64>) {
        self.0.insert(key.into(), value);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Entries with the keys of `order` first, in that order, then any other
    /// keys alphabetically.
    pub fn in_order<'a>(&'a self, order: &'a [String]) -> Vec<(&'a str, Option<f64>)> {
        let listed = order
            .iter()
            .filter_map(|k| self.0.get_key_value(k.as_str()))
            .map(|(k, v)| (k.as_str(), *v));
        let rest = self.iter().filter(|(k, _)| !order.iter().any(|o| o == k));
        listed.chain(rest).collect()
    }

    pub fn is_all_unavailable(&self) -> bool {
        self.0.values().all(Option::is_none)
    }
}

// ---------------------------------------------------------------------------
// ProjectStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatus {
    #[serde(default, alias = "vaultId", skip_serializing_if = "Option::is_none")]
    pub tracker_id: Option<String>,
    pub name: String,
    #[serde(default = "unknown_state")]
    pub state: ProjectState,
    #[serde(default = "not_set", alias = "champion")]
    pub owner: String,
    #[serde(default = "not_set", alias = "targetEndDate")]
    pub target_date: String,
    #[serde(default)]
    pub date_health: DateHealth,
    #[serde(default)]
    pub risk: RiskLevel,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default, alias = "thisWeek")]
    pub narrative: String,
}

fn unknown_state() -> ProjectState {
    ProjectState::Unknown
}

fn not_set() -> String {
    NOT_SET.to_string()
}

impl ProjectStatus {
    /// Roster entry with the narrative replaced by the placeholder text.
    pub fn from_roster(p: &RosterProject) -> Self {
        Self {
            tracker_id: p.tracker_id.clone(),
            name: p.name.clone(),
            state: p.state,
            owner: p.owner.clone().unwrap_or_else(not_set),
            target_date: p.target_date.clone().unwrap_or_else(not_set),
            date_health: p.date_health,
            risk: p.risk,
            priority: p.priority.to_lowercase(),
            narrative: PLACEHOLDER_NARRATIVE.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// DependentProjectStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependentProjectStatus {
    pub name: String,
    pub team: String,
    pub lead: String,
    pub status: String,
    #[serde(alias = "marketsImpact")]
    pub impact: String,
    #[serde(default = "not_set")]
    pub target_date: String,
}

impl DependentProjectStatus {
    pub fn with_status(config: &DependentProjectConfig, status: &str) -> Self {
        Self {
            name: config.name.clone(),
            team: config.team.clone(),
            lead: config.lead.clone(),
            status: status.to_string(),
            impact: config.impact.clone(),
            target_date: not_set(),
        }
    }
}

// ---------------------------------------------------------------------------
// UrgentItem / KeyDate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrgentItem {
    pub title: String,
    pub reason: String,
    pub action: String,
}

impl UrgentItem {
    pub const TITLE_MAX_CHARS: usize = 60;

    /// Truncate an over-long title on a char boundary, marking the cut.
    pub fn bounded(mut self) -> Self {
        if self.title.chars().count() > Self::TITLE_MAX_CHARS {
            let cut: String = self.title.chars().take(Self::TITLE_MAX_CHARS - 1).collect();
            self.title = format!("{}…", cut.trim_end());
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyDate {
    pub date: String,
    pub event: String,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub week_key: WeekKey,
    pub week_of: String,
    /// `None` for placeholders that were never generated.
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub generated_by: Option<String>,
    #[serde(default, alias = "migrationMetrics")]
    pub metrics: MetricsSnapshot,
    #[serde(default)]
    pub urgent_items: Vec<UrgentItem>,
    #[serde(default)]
    pub projects: Vec<ProjectStatus>,
    #[serde(default)]
    pub dependent_projects: Vec<DependentProjectStatus>,
    #[serde(default)]
    pub key_dates: Vec<KeyDate>,
}

impl Report {
    pub fn is_generated(&self) -> bool {
        self.generated_at.is_some()
    }

    /// Record when the report was produced.
    pub fn stamped(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = Some(at);
        self
    }
}

/// Pure construction: every field is passed in or a fixed default.
#[allow(clippy::too_many_arguments)]
pub fn assemble(
    week_key: WeekKey,
    metrics: MetricsSnapshot,
    projects: Vec<ProjectStatus>,
    dependent_projects: Vec<DependentProjectStatus>,
    urgent_items: Vec<UrgentItem>,
    key_dates: Vec<KeyDate>,
    generated_by: Option<String>,
) -> Report {
    Report {
        week_of: week_key.label(),
        week_key,
        generated_at: None,
        generated_by,
        metrics,
        urgent_items,
        projects,
        dependent_projects,
        key_dates,
    }
}

// ---------------------------------------------------------------------------
// Placeholders
// ---------------------------------------------------------------------------

pub fn placeholder_metrics(config: &TeamConfig) -> MetricsSnapshot {
    MetricsSnapshot::unavailable(config.metrics.keys())
}

pub fn placeholder_projects(config: &TeamConfig) -> Vec<ProjectStatus> {
    config
        .projects
        .roster
        .iter()
        .map(ProjectStatus::from_roster)
        .collect()
}

pub fn placeholder_dependents(config: &TeamConfig) -> Vec<DependentProjectStatus> {
    config
        .dependents
        .projects
        .iter()
        .map(|p| DependentProjectStatus::with_status(p, STATUS_UNKNOWN))
        .collect()
}

/// A never-generated report built purely from configuration.
pub fn placeholder_report(week_key: WeekKey, config: &TeamConfig) -> Report {
    assemble(
        week_key,
        placeholder_metrics(config),
        placeholder_projects(config),
        placeholder_dependents(config),
        Vec::new(),
        config.key_dates.clone(),
        None,
    )
}
