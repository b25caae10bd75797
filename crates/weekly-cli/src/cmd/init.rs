use anyhow::Context;
use std::path::Path;
use weekly_core::{config::TeamConfig, io, paths};

pub fn run(root: &Path, team: Option<&str>, site_key: Option<&str>) -> anyhow::Result<()> {
    let team_name = team.map(str::to_string).unwrap_or_else(|| {
        root.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "team".to_string())
    });

    println!("Initializing weekly reports in: {}", root.display());

    for dir in [paths::weekly_dir(root), paths::snapshots_dir(root)] {
        io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let config_path = paths::config_path(root);
    if config_path.exists() {
        println!("  exists:  {}", paths::CONFIG_FILE);
    } else {
        let site_key = site_key
            .map(str::to_string)
            .unwrap_or_else(|| default_site_key(&team_name));
        TeamConfig::new(&team_name, site_key)
            .save(root)
            .context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
    }

    println!("\nNext: add metric queries, projects, and key dates to {}", paths::CONFIG_FILE);
    Ok(())
}

/// `Markets Team` → `markets-team-weekly-updates`.
fn default_site_key(team: &str) -> String {
    let slug = team
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "weekly-updates".to_string()
    } else {
        format!("{slug}-weekly-updates")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_key_from_team_name() {
        assert_eq!(default_site_key("Markets"), "markets-weekly-updates");
        assert_eq!(default_site_key("B2B & Channels"), "b2b-channels-weekly-updates");
        assert_eq!(default_site_key("!!!"), "weekly-updates");
    }
}
