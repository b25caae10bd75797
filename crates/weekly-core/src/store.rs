use crate::error::SourceError;
use crate::report::Report;
use crate::sources::KeyValueStore;
use crate::week::WeekKey;
use std::sync::Arc;

/// Composite store key: `"{site_key}:{week_key}"`.
pub fn store_key(site_key: &str, week: &WeekKey) -> String {
    format!("{site_key}:{week}")
}

/// Report persistence over an injected key-value service. Owns every
/// persisted report; in-memory copies elsewhere are caches of it.
#[derive(Clone)]
pub struct ReportStore {
    kv: Arc<dyn KeyValueStore>,
}

impl ReportStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// A stored value that no longer deserializes is reported as an error.
    pub async fn get(&self, site_key: &str, week: &WeekKey) -> Result<Option<Report>, SourceError> {
        let key = store_key(site_key, week);
        let Some(value) = self.kv.get(&key).await? else {
            return Ok(None);
        };
        let report = serde_json::from_value(value)
            .map_err(|e| SourceError::Upstream(format!("stored report {key} is malformed: {e}")))?;
        Ok(Some(report))
    }

    /// Overwrites any report already stored for the same week.
    pub async fn put(&self, site_key: &str, week: &WeekKey, report: &Report) -> Result<(), SourceError> {
        let key = store_key(site_key, week);
        let value = serde_json::to_value(report).map_err(SourceError::upstream)?;
        self.kv.set(&key, value).await?;
        tracing::info!(key = %key, "report saved");
        Ok(())
    }

    /// Stored reports for the `depth` weeks before `current`, newest first.
    /// Missing weeks and unreadable entries are skipped.
    pub async fn list_recent(&self, site_key: &str, current: &WeekKey, depth: u32) -> Vec<Report> {
        let mut reports = Vec::new();
        for weeks_ago in 1..=depth {
            let Some(week) = current.weeks_before(weeks_ago) else {
                break;
            };
            match self.get(site_key, &week).await {
                Ok(Some(report)) => reports.push(report),
                Ok(None) => {}
                Err(e) => tracing::warn!(week = %week, error = %e, "skipping archived week"),
            }
        }
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TeamConfig;
    use crate::report::{placeholder_report, UrgentItem};
    use crate::sources::MemoryStore;
    use chrono::{TimeZone, Utc};

    const SITE: &str = "markets-weekly-updates";

    fn week(s: &str) -> WeekKey {
        s.parse().unwrap()
    }

    fn generated(week_key: WeekKey) -> Report {
        let mut report = placeholder_report(week_key, &TeamConfig::new("Markets", SITE));
        report.generated_by = Some("lead@example.com".into());
        report.urgent_items.push(UrgentItem {
            title: "Translations slipping".into(),
            reason: "Two weeks behind".into(),
            action: "Re-plan scope".into(),
        });
        report.metrics.set("gmvMigratedPct", Some(73.5));
        report.stamped(Utc.with_ymd_and_hms(2026, 2, 2, 15, 4, 5).unwrap())
    }

    #[test]
    fn key_format() {
        assert_eq!(
            store_key(SITE, &week("2026-02-02")),
            "markets-weekly-updates:2026-02-02"
        );
    }

    #[tokio::test]
    async fn put_then_get_is_deep_equal() {
        let store = ReportStore::new(Arc::new(MemoryStore::new()));
        let report = generated(week("2026-02-02"));
        store.put(SITE, &report.week_key, &report).await.unwrap();
        let loaded = store.get(SITE, &week("2026-02-02")).await.unwrap();
        assert_eq!(loaded, Some(report));
    }

    #[tokio::test]
    async fn sites_are_isolated() {
        let store = ReportStore::new(Arc::new(MemoryStore::new()));
        let report = generated(week("2026-02-02"));
        store.put(SITE, &report.week_key, &report).await.unwrap();
        let other = store
            .get("channels-weekly-updates", &week("2026-02-02"))
            .await
            .unwrap();
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn list_recent_skips_gaps_newest_first() {
        let store = ReportStore::new(Arc::new(MemoryStore::new()));
        for w in ["2026-01-26", "2026-01-12", "2025-12-29"] {
            let report = generated(week(w));
            store.put(SITE, &report.week_key, &report).await.unwrap();
        }
        // Current week itself is never part of the archive.
        let current = generated(week("2026-02-02"));
        store.put(SITE, &current.week_key, &current).await.unwrap();

        let recent = store.list_recent(SITE, &week("2026-02-02"), 4).await;
        let keys: Vec<String> = recent.iter().map(|r| r.week_key.to_string()).collect();
        assert_eq!(keys, vec!["2026-01-26", "2026-01-12"]);
    }

    #[tokio::test]
    async fn list_recent_stops_at_earliest_date() {
        use crate::week::{current_week_key, WeekAnchor};
        let store = ReportStore::new(Arc::new(MemoryStore::new()));
        let earliest = chrono::NaiveDate::MIN + chrono::Duration::days(14);
        let current = current_week_key(earliest, WeekAnchor::Monday);
        assert!(store.list_recent(SITE, &current, 10).await.is_empty());
    }

    #[tokio::test]
    async fn malformed_entry_is_error_and_skipped_in_archive() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(&store_key(SITE, &week("2026-01-26")), serde_json::json!({"bogus": true}))
            .await
            .unwrap();
        let store = ReportStore::new(kv);
        assert!(store.get(SITE, &week("2026-01-26")).await.is_err());
        assert!(store.list_recent(SITE, &week("2026-02-02"), 2).await.is_empty());
    }
}
