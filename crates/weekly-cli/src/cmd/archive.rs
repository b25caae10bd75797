use crate::output::{print_json, print_table};
use crate::wiring;
use anyhow::Context;
use chrono::{DateTime, FixedOffset};
use std::path::Path;
use weekly_core::week::WeekKey;

pub fn run(
    root: &Path,
    all: bool,
    now: Option<DateTime<FixedOffset>>,
    json: bool,
) -> anyhow::Result<()> {
    let wired = wiring::controller(root, now)?;
    if all {
        return list_stored(&wired, json);
    }

    let ctl = &wired.controller;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(ctl.load_data());
    let weeks = ctl.weeks();

    if json {
        return print_json(&weeks);
    }
    let rows = weeks
        .iter()
        .map(|w| {
            vec![
                if w.active { "*" } else { "" }.to_string(),
                w.week_key.to_string(),
                w.label.clone(),
                if w.generated { "generated" } else { "placeholder" }.to_string(),
            ]
        })
        .collect();
    print_table(&["", "WEEK", "LABEL", "STATUS"], rows);
    Ok(())
}

/// Every stored week for this site, newest first.
fn list_stored(wired: &wiring::Wired, json: bool) -> anyhow::Result<()> {
    let prefix = format!("{}:", wired.controller.config().site_key);
    let mut weeks = wired
        .kv
        .keys_with_prefix(&prefix)
        .context("failed to list stored reports")?
        .iter()
        .filter_map(|key| key.strip_prefix(&prefix)?.parse::<WeekKey>().ok())
        .collect::<Vec<_>>();
    weeks.reverse();

    if json {
        return print_json(&weeks);
    }
    if weeks.is_empty() {
        println!("No stored reports.");
    }
    for week in weeks {
        println!("{week}  ({})", week.label());
    }
    Ok(())
}
