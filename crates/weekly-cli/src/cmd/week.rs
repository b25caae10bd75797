use crate::output::print_json;
use crate::wiring;
use anyhow::Context;
use chrono::{DateTime, FixedOffset};
use std::path::Path;
use weekly_core::config::TeamConfig;
use weekly_core::week::{week_key_offset, WeekAnchor};
use weekly_core::WeeklyError;

pub fn run(
    root: &Path,
    ago: u32,
    now: Option<DateTime<FixedOffset>>,
    json: bool,
) -> anyhow::Result<()> {
    // Usable before `init`: an absent config means the default anchor.
    let anchor = match TeamConfig::load(root) {
        Ok(cfg) => cfg.week_anchor,
        Err(WeeklyError::NotInitialized) => WeekAnchor::default(),
        Err(e) => return Err(anyhow::Error::new(e).context("failed to load config")),
    };
    let today = wiring::clock(now).now().date_naive();
    let week = week_key_offset(today, ago, anchor)
        .with_context(|| format!("{ago} weeks back is outside the calendar range"))?;

    if json {
        print_json(&serde_json::json!({
            "weekKey": week,
            "label": week.label(),
            "weeksAgo": ago,
        }))?;
    } else {
        println!("{week}  ({})", week.label());
    }
    Ok(())
}
