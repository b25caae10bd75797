use crate::output::{print_json, print_report};
use crate::wiring;
use chrono::{DateTime, FixedOffset};
use std::path::Path;

pub fn run(root: &Path, now: Option<DateTime<FixedOffset>>, json: bool) -> anyhow::Result<()> {
    let wired = wiring::controller(root, now)?;
    let ctl = &wired.controller;

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(async {
        ctl.load_data().await;
        ctl.generate().await
    })?;

    if json {
        print_json(&report)?;
    } else {
        print_report(ctl.config(), &report);
        println!("\nReport saved for week of {}.", report.week_of);
    }
    Ok(())
}
