use crate::error::{Result, WeeklyError};
use crate::paths;
use crate::report::KeyDate;
use crate::types::{DateHealth, ProjectState, RiskLevel};
use crate::week::WeekAnchor;
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Placeholder the project query template must contain.
pub const PROJECT_IDS_PLACEHOLDER: &str = "{PROJECT_IDS}";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// WarehouseConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// HTTP query endpoint. `None` disables the live tier for metrics and projects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Environment variable holding the bearer token.
    #[serde(default = "default_warehouse_token_env")]
    pub token_env: String,
}

fn default_warehouse_token_env() -> String {
    "WEEKLY_WAREHOUSE_TOKEN".to_string()
}

// ---------------------------------------------------------------------------
// AiConfig
// ---------------------------------------------------------------------------

/// A named external tool capability the AI service may call (remote MCP server).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolServer {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_ai_enabled")]
    pub enabled: bool,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_summary_max_tokens")]
    pub summary_max_tokens: u32,
    #[serde(default = "default_urgent_max_tokens")]
    pub urgent_max_tokens: u32,
    #[serde(default = "default_lookup_max_tokens")]
    pub lookup_max_tokens: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tools: BTreeMap<String, ToolServer>,
}

fn default_ai_enabled() -> bool {
    true
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_summary_max_tokens() -> u32 {
    200
}

fn default_urgent_max_tokens() -> u32 {
    1500
}

fn default_lookup_max_tokens() -> u32 {
    1024
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: default_ai_enabled(),
            model: default_model(),
            base_url: None,
            api_key_env: default_api_key_env(),
            summary_max_tokens: default_summary_max_tokens(),
            urgent_max_tokens: default_urgent_max_tokens(),
            lookup_max_tokens: default_lookup_max_tokens(),
            tools: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// MetricsConfig
// ---------------------------------------------------------------------------

/// One snapshot indicator read from a query column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricField {
    /// Key in the report, e.g. `gmvMigratedPct`.
    pub key: String,
    /// Column in the first result row, e.g. `gmv_migrated_pct`.
    pub column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricQuery {
    pub name: String,
    pub sql: String,
    #[serde(default)]
    pub fields: Vec<MetricField>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub queries: Vec<MetricQuery>,
    /// Read metrics from the week's static snapshot when the live tier fails.
    #[serde(default)]
    pub static_tier: bool,
}

impl MetricsConfig {
    /// Every configured snapshot key, in declaration order, without duplicates.
    pub fn keys(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.queries
            .iter()
            .flat_map(|q| q.fields.iter())
            .filter(|f| seen.insert(f.key.as_str()))
            .map(|f| f.key.clone())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// Statically configured owned project, used when no live data is available.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RosterProject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracker_id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default = "default_roster_state")]
    pub state: ProjectState,
    #[serde(default = "default_priority")]
    pub priority: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<String>,
    #[serde(default)]
    pub date_health: DateHealth,
    #[serde(default)]
    pub risk: RiskLevel,
}

fn default_roster_state() -> ProjectState {
    ProjectState::Unknown
}

pub(crate) fn default_priority() -> String {
    "p1".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectsConfig {
    /// Live query template; `{PROJECT_IDS}` is replaced by the quoted id list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub roster: Vec<RosterProject>,
}

impl ProjectsConfig {
    /// Render the live query, or `None` when the live tier is not configured.
    pub fn render_query(&self) -> Option<String> {
        let template = self.query.as_deref()?;
        if self.ids.is_empty() {
            return None;
        }
        let ids = self
            .ids
            .iter()
            .map(|id| format!("'{}'", id.replace('\'', "")))
            .collect::<Vec<_>>()
            .join(", ");
        Some(template.replace(PROJECT_IDS_PLACEHOLDER, &ids))
    }
}

/// An externally owned project that depends on this team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DependentProjectConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracker_id: Option<String>,
    pub name: String,
    pub team: String,
    pub lead: String,
    /// What this project needs from the team.
    pub impact: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependentsConfig {
    /// Tool capability the AI service uses to look up tracker projects.
    #[serde(default = "default_tracker_tool")]
    pub tracker_tool: String,
    #[serde(default)]
    pub projects: Vec<DependentProjectConfig>,
}

fn default_tracker_tool() -> String {
    "vault-mcp".to_string()
}

impl Default for DependentsConfig {
    fn default() -> Self {
        Self {
            tracker_tool: default_tracker_tool(),
            projects: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// UrgentConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrgentConfig {
    #[serde(default = "default_urgent_prompt")]
    pub prompt: String,
    /// How many key dates are included in the request.
    #[serde(default = "default_key_date_limit")]
    pub key_date_limit: usize,
}

fn default_urgent_prompt() -> String {
    "Based on the following team weekly data, identify the top 3 most urgent items \
that need discussion or action.

Focus ONLY on projects owned by the team. Do NOT include items about dependent/external projects.

Consider:
- Projects at risk or off-track
- Deadline proximity for our projects
- Blockers affecting our deliverables
- Data anomalies in metrics

For each urgent item, provide:
1. A short title (under 60 chars)
2. Why it's urgent (1-2 sentences with specific data)
3. Recommended action (1 sentence, actionable)

Format as JSON array with objects containing: title, reason, action"
        .to_string()
}

fn default_key_date_limit() -> usize {
    5
}

impl Default for UrgentConfig {
    fn default() -> Self {
        Self {
            prompt: default_urgent_prompt(),
            key_date_limit: default_key_date_limit(),
        }
    }
}

// ---------------------------------------------------------------------------
// TeamConfig (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    pub team_name: String,
    /// Namespace for stored reports: keys are `{site_key}:{week_key}`.
    pub site_key: String,
    #[serde(default = "default_archive_depth")]
    pub archive_depth: u32,
    #[serde(default)]
    pub week_anchor: WeekAnchor,
    #[serde(default = "default_generation_days")]
    pub generation_days: Vec<Weekday>,
    #[serde(default)]
    pub warehouse: WarehouseConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub projects: ProjectsConfig,
    #[serde(default)]
    pub dependents: DependentsConfig,
    #[serde(default)]
    pub key_dates: Vec<KeyDate>,
    #[serde(default)]
    pub urgent: UrgentConfig,
}

fn default_version() -> u32 {
    1
}

/// Upper bound on how many previous weeks a load walks back through.
pub const MAX_ARCHIVE_DEPTH: u32 = 520;

fn default_archive_depth() -> u32 {
    4
}

fn default_generation_days() -> Vec<Weekday> {
    vec![Weekday::Mon, Weekday::Tue, Weekday::Wed]
}

impl TeamConfig {
    pub fn new(team_name: impl Into<String>, site_key: impl Into<String>) -> Self {
        Self {
            version: 1,
            team_name: team_name.into(),
            site_key: site_key.into(),
            archive_depth: default_archive_depth(),
            week_anchor: WeekAnchor::default(),
            generation_days: default_generation_days(),
            warehouse: WarehouseConfig::default(),
            ai: AiConfig::default(),
            metrics: MetricsConfig::default(),
            projects: ProjectsConfig::default(),
            dependents: DependentsConfig::default(),
            key_dates: Vec::new(),
            urgent: UrgentConfig::default(),
        }
    }

    pub fn can_generate_on(&self, day: Weekday) -> bool {
        self.generation_days.contains(&day)
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(WeeklyError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: TeamConfig = serde_yaml::from_str(&data)?;
        if cfg.site_key.trim().is_empty() {
            return Err(WeeklyError::InvalidConfig("site_key must not be empty".into()));
        }
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut push = |level: WarnLevel, message: String| {
            warnings.push(ConfigWarning { level, message })
        };

        if self.site_key.trim().is_empty() {
            push(WarnLevel::Error, "site_key is empty".to_string());
        }
        if self.archive_depth == 0 {
            push(
                WarnLevel::Warning,
                "archive_depth is 0: no previous weeks will be listed".to_string(),
            );
        }
        if self.archive_depth > MAX_ARCHIVE_DEPTH {
            push(
                WarnLevel::Warning,
                format!(
                    "archive_depth {} exceeds {MAX_ARCHIVE_DEPTH}: only {MAX_ARCHIVE_DEPTH} weeks are listed",
                    self.archive_depth
                ),
            );
        }
        if self.generation_days.is_empty() {
            push(
                WarnLevel::Warning,
                "generation_days is empty: reports can never be generated".to_string(),
            );
        }

        match self.projects.query.as_deref() {
            None if !self.projects.ids.is_empty() => push(
                WarnLevel::Warning,
                "projects.ids are configured but projects.query is missing".to_string(),
            ),
            Some(q) if !q.contains(PROJECT_IDS_PLACEHOLDER) => push(
                WarnLevel::Warning,
                format!("projects.query does not contain {PROJECT_IDS_PLACEHOLDER}"),
            ),
            _ => {}
        }

        let mut seen = HashSet::new();
        for query in &self.metrics.queries {
            if query.fields.is_empty() {
                push(
                    WarnLevel::Warning,
                    format!("metric query '{}' has no fields", query.name),
                );
            }
            for field in &query.fields {
                if !seen.insert(field.key.as_str()) {
                    push(
                        WarnLevel::Warning,
                        format!(
                            "metric key '{}' is defined more than once (query '{}')",
                            field.key, query.name
                        ),
                    );
                }
            }
        }

        let tracked = self
            .dependents
            .projects
            .iter()
            .any(|p| p.tracker_id.is_some());
        if tracked && self.dependents.tracker_tool.trim().is_empty() {
            push(
                WarnLevel::Error,
                "dependent projects have tracker ids but dependents.tracker_tool is empty"
                    .to_string(),
            );
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
