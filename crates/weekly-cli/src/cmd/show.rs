use crate::cmd::parse_week;
use crate::output::{print_json, print_report};
use crate::wiring;
use chrono::{DateTime, FixedOffset};
use std::path::Path;

pub fn run(
    root: &Path,
    week: Option<&str>,
    now: Option<DateTime<FixedOffset>>,
    json: bool,
) -> anyhow::Result<()> {
    let week = week.map(parse_week).transpose()?;
    let wired = wiring::controller(root, now)?;
    let ctl = &wired.controller;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        ctl.load_data().await;
        if let Some(week) = week {
            if !ctl.switch_active_week(week).await {
                anyhow::bail!("no report stored for week {week}");
            }
        }
        Ok(())
    })?;

    let Some(report) = ctl.visible_report() else {
        anyhow::bail!("no report to show");
    };
    if json {
        print_json(&report)?;
    } else {
        print_report(ctl.config(), &report);
        if !report.is_generated() && ctl.can_generate_today() {
            println!("\nRun 'weekly generate' to build this week's report.");
        }
    }
    Ok(())
}
