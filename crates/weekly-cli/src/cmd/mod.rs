pub mod archive;
pub mod config;
pub mod export;
pub mod generate;
pub mod init;
pub mod show;
pub mod week;

use weekly_core::week::WeekKey;

pub(crate) fn parse_week(raw: &str) -> anyhow::Result<WeekKey> {
    Ok(raw.parse::<WeekKey>()?)
}
