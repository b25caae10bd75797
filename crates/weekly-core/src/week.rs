//! Calendar-week identifiers.
//!
//! A [`WeekKey`] is the Monday that anchors one weekly report, rendered as
//! `YYYY-MM-DD`. Keys order by calendar date, and because the rendering is
//! zero-padded ISO they also sort correctly as plain strings.

use crate::error::WeeklyError;
use chrono::{Datelike, Days, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// WeekAnchor
// ---------------------------------------------------------------------------

/// How a Sunday is assigned to a week.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekAnchor {
    /// Monday through Sunday form one week; Sunday belongs to the Monday
    /// six days earlier.
    #[default]
    Monday,
    /// Sunday maps to the *following* Monday, so "this week" advances on
    /// Sunday. Matches dashboards whose week rolls over Sunday evening.
    SundayRollsForward,
}

// ---------------------------------------------------------------------------
// WeekKey
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WeekKey(NaiveDate);

impl WeekKey {
    /// Build a key from a date that is already a Monday.
    pub fn from_monday(date: NaiveDate) -> Option<Self> {
        (date.weekday() == chrono::Weekday::Mon).then_some(Self(date))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The key `weeks` weeks before this one, or `None` past the earliest
    /// representable date.
    pub fn weeks_before(&self, weeks: u32) -> Option<WeekKey> {
        self.0
            .checked_sub_days(Days::new(u64::from(weeks) * 7))
            .map(WeekKey)
    }

    /// Human label such as `Feb 2, 2026`.
    pub fn label(&self) -> String {
        format_for_display(self)
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl std::str::FromStr for WeekKey {
    type Err = WeeklyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map_err(|_| WeeklyError::InvalidWeekKey(s.to_string()))?;
        WeekKey::from_monday(date).ok_or_else(|| WeeklyError::InvalidWeekKey(s.to_string()))
    }
}

impl Serialize for WeekKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WeekKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Calculator
// ---------------------------------------------------------------------------

fn monday_of(today: NaiveDate, anchor: WeekAnchor) -> NaiveDate {
    match anchor {
        WeekAnchor::Monday => {
            today - Duration::days(i64::from(today.weekday().num_days_from_monday()))
        }
        // day - weekday(Sunday=0) + 1
        WeekAnchor::SundayRollsForward => {
            let from_sunday = i64::from(today.weekday().num_days_from_sunday());
            today - Duration::days(from_sunday) + Duration::days(1)
        }
    }
}

/// The key of the week containing `today`.
pub fn current_week_key(today: NaiveDate, anchor: WeekAnchor) -> WeekKey {
    WeekKey(monday_of(today, anchor))
}

/// The key `weeks_ago` weeks before the week containing `today`.
pub fn week_key_offset(today: NaiveDate, weeks_ago: u32, anchor: WeekAnchor) -> Option<WeekKey> {
    current_week_key(today, anchor).weeks_before(weeks_ago)
}

pub fn format_for_display(week: &WeekKey) -> String {
    week.0.format("%b %-d, %Y").to_string()
}
