use crate::week::WeekKey;
use std::path::{Path, PathBuf};

pub const WEEKLY_DIR: &str = ".weekly";
pub const CONFIG_FILE: &str = ".weekly/config.yaml";
pub const STORE_FILE: &str = ".weekly/reports.redb";
pub const SNAPSHOTS_DIR: &str = ".weekly/snapshots";

pub fn weekly_dir(root: &Path) -> PathBuf {
    root.join(WEEKLY_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn store_path(root: &Path) -> PathBuf {
    root.join(STORE_FILE)
}

pub fn snapshots_dir(root: &Path) -> PathBuf {
    root.join(SNAPSHOTS_DIR)
}

/// File name of the static snapshot for one week: `week-YYYY-MM-DD.json`.
pub fn snapshot_file_name(week: &WeekKey) -> String {
    format!("week-{week}.json")
}

pub fn snapshot_path(root: &Path, week: &WeekKey) -> PathBuf {
    snapshots_dir(root).join(snapshot_file_name(week))
}
