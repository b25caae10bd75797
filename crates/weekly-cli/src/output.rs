use serde::Serialize;
use weekly_core::config::TeamConfig;
use weekly_core::report::Report;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

/// Left-aligned columns sized by character count.
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<String>| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{cell:w$}"))
            .collect();
        println!("  {}", padded.join("  ").trim_end());
    };

    line(headers.iter().map(|h| h.to_string()).collect());
    line(widths.iter().map(|&w| "-".repeat(w)).collect());
    for row in rows {
        line(row);
    }
}

pub fn print_report(config: &TeamConfig, report: &Report) {
    println!("{} weekly report, week of {}", config.team_name, report.week_of);
    match (report.generated_at, report.generated_by.as_deref()) {
        (Some(at), Some(by)) => println!("Generated {} by {by}", at.format("%Y-%m-%d %H:%M UTC")),
        (Some(at), None) => println!("Generated {}", at.format("%Y-%m-%d %H:%M UTC")),
        (None, _) => println!("Not generated yet"),
    }

    println!("\nMetrics");
    let order = config.metrics.keys();
    let metrics: Vec<Vec<String>> = report
        .metrics
        .in_order(&order)
        .into_iter()
        .map(|(key, value)| {
            let shown = value.map_or_else(|| "--".to_string(), |v| v.to_string());
            vec![key.to_string(), shown]
        })
        .collect();
    if metrics.is_empty() {
        println!("  (none configured)");
    } else {
        print_table(&["METRIC", "VALUE"], metrics);
    }

    println!("\nUrgent items");
    if report.urgent_items.is_empty() {
        println!("  (none)");
    }
    for (i, item) in report.urgent_items.iter().enumerate() {
        println!("  {}. {}", i + 1, item.title);
        println!("     Why: {}", item.reason);
        println!("     Action: {}", item.action);
    }

    println!("\nProjects");
    if report.projects.is_empty() {
        println!("  (none)");
    } else {
        let rows = report
            .projects
            .iter()
            .map(|p| {
                vec![
                    p.name.clone(),
                    p.priority.clone(),
                    p.state.to_string(),
                    p.risk.to_string(),
                    p.date_health.to_string(),
                    p.owner.clone(),
                    p.target_date.clone(),
                ]
            })
            .collect();
        print_table(
            &["PROJECT", "PRI", "STATE", "RISK", "HEALTH", "OWNER", "TARGET"],
            rows,
        );
        for p in &report.projects {
            println!("\n  {}: {}", p.name, p.narrative);
        }
    }

    println!("\nDependent projects");
    if report.dependent_projects.is_empty() {
        println!("  (none)");
    } else {
        let rows = report
            .dependent_projects
            .iter()
            .map(|d| {
                vec![
                    d.name.clone(),
                    d.team.clone(),
                    d.lead.clone(),
                    d.status.clone(),
                    d.target_date.clone(),
                ]
            })
            .collect();
        print_table(&["PROJECT", "TEAM", "LEAD", "STATUS", "TARGET"], rows);
    }

    if !report.key_dates.is_empty() {
        println!("\nKey dates");
        for kd in &report.key_dates {
            println!("  {}: {}", kd.date, kd.event);
        }
    }
}
