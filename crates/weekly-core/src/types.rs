use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ProjectState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProjectState {
    Discovery,
    Prototype,
    Build,
    Release,
    Observe,
    Done,
    /// Tracker reported nothing usable; rendered as `--`.
    Unknown,
}

impl ProjectState {
    pub fn all() -> &'static [ProjectState] {
        &[
            ProjectState::Discovery,
            ProjectState::Prototype,
            ProjectState::Build,
            ProjectState::Release,
            ProjectState::Observe,
            ProjectState::Done,
            ProjectState::Unknown,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectState::Discovery => "Discovery",
            ProjectState::Prototype => "Prototype",
            ProjectState::Build => "Build",
            ProjectState::Release => "Release",
            ProjectState::Observe => "Observe",
            ProjectState::Done => "Done",
            ProjectState::Unknown => "--",
        }
    }

    /// Case-insensitive parse; anything unrecognised is `Unknown`.
    pub fn parse_lenient(raw: &str) -> ProjectState {
        let raw = raw.trim();
        ProjectState::all()
            .iter()
            .copied()
            .find(|s| s.as_str().eq_ignore_ascii_case(raw))
            .unwrap_or(ProjectState::Unknown)
    }
}

impl fmt::Display for ProjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ProjectState {
    fn from(raw: String) -> Self {
        ProjectState::parse_lenient(&raw)
    }
}

impl From<ProjectState> for String {
    fn from(state: ProjectState) -> Self {
        state.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// DateHealth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateHealth {
    #[default]
    OnTrack,
    AtRisk,
    OffTrack,
}

impl DateHealth {
    pub fn as_str(self) -> &'static str {
        match self {
            DateHealth::OnTrack => "on-track",
            DateHealth::AtRisk => "at-risk",
            DateHealth::OffTrack => "off-track",
        }
    }

    /// Normalise a tracker status string ("Off Track", "at risk", ...).
    /// Absent or unrecognised values are on-track.
    pub fn normalize(raw: Option<&str>) -> DateHealth {
        let Some(raw) = raw else {
            return DateHealth::OnTrack;
        };
        let normalized = raw
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-");
        if normalized.contains("off") {
            DateHealth::OffTrack
        } else if normalized.contains("risk") {
            DateHealth::AtRisk
        } else {
            DateHealth::OnTrack
        }
    }
}

impl fmt::Display for DateHealth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RiskLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }

    /// Derive risk from the tracker's raw flags and date-health string.
    pub fn derive(off_track_active: bool, past_due: bool, raw_health: Option<&str>) -> RiskLevel {
        if off_track_active || past_due {
            return RiskLevel::High;
        }
        let health = raw_health.unwrap_or_default().to_lowercase();
        if health.contains("off") {
            RiskLevel::High
        } else if health.contains("risk") {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
