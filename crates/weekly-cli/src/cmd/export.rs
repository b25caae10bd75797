use crate::cmd::parse_week;
use crate::output::print_json;
use crate::wiring;
use anyhow::Context;
use chrono::{DateTime, FixedOffset};
use std::path::Path;
use weekly_core::{io, paths};

pub fn run(
    root: &Path,
    week: Option<&str>,
    now: Option<DateTime<FixedOffset>>,
    json: bool,
) -> anyhow::Result<()> {
    let wired = wiring::controller(root, now)?;
    let ctl = &wired.controller;
    let week = match week {
        Some(raw) => parse_week(raw)?,
        None => ctl.current_week(),
    };

    let store = weekly_core::store::ReportStore::new(wired.kv.clone());
    let rt = tokio::runtime::Runtime::new()?;
    let report = rt
        .block_on(store.get(&ctl.config().site_key, &week))
        .with_context(|| format!("failed to read report for week {week}"))?
        .with_context(|| format!("no report stored for week {week}"))?;

    let path = paths::snapshot_path(root, &week);
    let data = serde_json::to_vec_pretty(&report)?;
    io::atomic_write(&path, &data)
        .with_context(|| format!("failed to write {}", path.display()))?;

    if json {
        print_json(&serde_json::json!({ "weekKey": week, "path": path }))?;
    } else {
        println!("Exported week of {} to {}", report.week_of, path.display());
    }
    Ok(())
}
