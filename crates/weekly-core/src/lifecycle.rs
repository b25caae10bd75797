//! Report lifecycle controller.
//!
//! A [`Controller`] owns one session: the current report, the archive of
//! recent weeks, the active (displayed) week, and the lifecycle state. It is
//! constructed with every collaborator injected and is safe to share across
//! tasks; generation is single-flight through an atomic flag. If the
//! generating future is dropped, the flag is released and the session
//! returns to `Idle`.
//!
//! ```text
//!            load_data()              generate() ok
//!   Idle ──────────────────► Loaded ◄──────────────── Generating
//!    ▲                         │  generate()               │
//!    │                         └──────────────────────────►│
//!    └──────────────────── generate() failed ──────────────┘
//! ```

use crate::config::{TeamConfig, MAX_ARCHIVE_DEPTH};
use crate::error::{LifecycleError, RefusalReason};
use crate::report::{assemble, placeholder_report, Report, UNKNOWN_USER};
use crate::resolver::Resolver;
use crate::sources::Sources;
use crate::store::ReportStore;
use crate::urgent::generate_urgent_items;
use crate::week::{current_week_key, WeekKey};
use chrono::{DateTime, Datelike, FixedOffset, Local, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of "now" in the user's local offset. The day gate and the week
/// key are both evaluated against it.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Idle,
    Generating,
    Loaded,
}

#[derive(Debug)]
struct Session {
    state: LifecycleState,
    current: Option<Report>,
    /// Newest first. Never contains the current report's week.
    archive: Vec<Report>,
    active_week: Option<WeekKey>,
}

impl Session {
    fn held(&self, week: &WeekKey) -> Option<&Report> {
        self.current
            .iter()
            .chain(self.archive.iter())
            .find(|r| r.week_key == *week)
    }
}

/// Everything the presentation layer reads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub state: LifecycleState,
    pub current: Option<Report>,
    pub archive: Vec<Report>,
    pub active_week: Option<WeekKey>,
    pub is_generating: bool,
    pub can_generate_today: bool,
}

/// One row of the week navigation list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekEntry {
    pub week_key: WeekKey,
    pub label: String,
    pub active: bool,
    pub generated: bool,
}

/// Ends a generation run on drop: a session still marked `Generating`
/// (the run was cancelled) goes back to `Idle`, then the flag is cleared.
struct FlightGuard<'a>(&'a Controller);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        {
            let mut session = self.0.session();
            if session.state == LifecycleState::Generating {
                debug!("generation cancelled");
                session.state = LifecycleState::Idle;
            }
        }
        self.0.generating.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct Controller {
    config: TeamConfig,
    sources: Sources,
    store: ReportStore,
    clock: Arc<dyn Clock>,
    generating: AtomicBool,
    session: Mutex<Session>,
}

impl Controller {
    pub fn new(
        config: TeamConfig,
        sources: Sources,
        store: ReportStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            sources,
            store,
            clock,
            generating: AtomicBool::new(false),
            session: Mutex::new(Session {
                state: LifecycleState::Idle,
                current: None,
                archive: Vec::new(),
                active_week: None,
            }),
        }
    }

    pub fn config(&self) -> &TeamConfig {
        &self.config
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn current_week(&self) -> WeekKey {
        current_week_key(self.clock.now().date_naive(), self.config.week_anchor)
    }

    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::Acquire)
    }

    pub fn can_generate_today(&self) -> bool {
        self.config.can_generate_on(self.clock.now().weekday())
    }

    pub fn state(&self) -> LifecycleState {
        self.session().state
    }

    // -----------------------------------------------------------------------
    // Load
    // -----------------------------------------------------------------------

    /// Populate the session: stored report for this week, else the week's
    /// static snapshot, else the most recent archived report, else a
    /// placeholder. The archive is always refreshed.
    pub async fn load_data(&self) -> SessionView {
        let site = self.config.site_key.as_str();
        let week = self.current_week();

        let mut archive = self
            .store
            .list_recent(site, &week, self.config.archive_depth.min(MAX_ARCHIVE_DEPTH))
            .await;

        let stored = match self.store.get(site, &week).await {
            Ok(found) => found,
            Err(e) => {
                warn!(week = %week, error = %e, "store read failed");
                None
            }
        };

        let current = match stored {
            Some(report) => {
                debug!(week = %week, source = "store", "loaded current report");
                report
            }
            None => match self.load_snapshot(&week).await {
                Some(report) => {
                    debug!(week = %week, source = "snapshot", "loaded current report");
                    report
                }
                None if !archive.is_empty() => {
                    let report = archive.remove(0);
                    info!(week = %week, adopted = %report.week_key, "showing most recent archived report");
                    report
                }
                None => {
                    debug!(week = %week, source = "placeholder", "no report yet");
                    placeholder_report(week, &self.config)
                }
            },
        };

        {
            let mut session = self.session();
            session.active_week = Some(current.week_key);
            archive.retain(|r| r.week_key != current.week_key);
            session.current = Some(current);
            session.archive = archive;
            if !self.is_generating() {
                session.state = LifecycleState::Loaded;
            }
        }
        self.view()
    }

    async fn load_snapshot(&self, week: &WeekKey) -> Option<Report> {
        match self.sources.snapshots.load(week).await {
            Ok(found) => found,
            Err(e) => {
                warn!(week = %week, error = %e, "snapshot unreadable");
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Generate
    // -----------------------------------------------------------------------

    /// Run one generation. Refusals make no external calls and change no
    /// state. Any failure leaves the store and the current report untouched.
    pub async fn generate(&self) -> Result<Report, LifecycleError> {
        let now = self.clock.now();
        let day = now.weekday();
        if !self.config.can_generate_on(day) {
            info!(%day, "generation refused outside window");
            return Err(RefusalReason::OutsideGenerationWindow(day).into());
        }
        if self
            .generating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!("generation refused: already running");
            return Err(RefusalReason::AlreadyGenerating.into());
        }
        let _guard = FlightGuard(self);

        {
            self.session().state = LifecycleState::Generating;
        }

        let week = current_week_key(now.date_naive(), self.config.week_anchor);
        info!(week = %week, site = %self.config.site_key, "generating report");
        let result = self.run(week, now.with_timezone(&Utc)).await;

        let mut session = self.session();
        match result {
            Ok(report) => {
                session.archive.retain(|r| r.week_key != week);
                if let Some(previous) = session.current.take() {
                    if previous.week_key != week && previous.is_generated() {
                        session.archive.push(previous);
                        session.archive.sort_by(|a, b| b.week_key.cmp(&a.week_key));
                    }
                }
                session.current = Some(report.clone());
                session.active_week = Some(week);
                session.state = LifecycleState::Loaded;
                info!(week = %week, "report generated");
                Ok(report)
            }
            Err(e) => {
                session.state = LifecycleState::Idle;
                warn!(week = %week, error = %e, "generation aborted");
                Err(e)
            }
        }
    }

    async fn run(&self, week: WeekKey, at: DateTime<Utc>) -> Result<Report, LifecycleError> {
        let resolver = Resolver::new(&self.config, &self.sources);

        let metrics = resolver.resolve_metrics(&week).await;
        let projects = resolver.resolve_projects(&week).await;
        let dependents = resolver.resolve_dependents(&week).await;
        info!(
            metrics = metrics.tier.as_str(),
            projects = projects.tier.as_str(),
            dependents = dependents.tier.as_str(),
            "data resolved"
        );

        let urgent_items = generate_urgent_items(
            &self.config,
            self.sources.reasoner.as_ref(),
            &metrics.value,
            &projects.value,
            &dependents.value,
        )
        .await;

        let generated_by = match self.sources.identity.current_user().await {
            Ok(identity) => identity.attribution(),
            Err(e) => {
                debug!(error = %e, "no identity for attribution");
                UNKNOWN_USER.to_string()
            }
        };

        let report = assemble(
            week,
            metrics.value,
            projects.value,
            dependents.value,
            urgent_items,
            self.config.key_dates.clone(),
            Some(generated_by),
        )
        .stamped(at);

        self.store
            .put(&self.config.site_key, &week, &report)
            .await
            .map_err(|e| LifecycleError::Aborted(e.to_string()))?;
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Read side
    // -----------------------------------------------------------------------

    /// Make `week` the displayed week. Held reports switch immediately;
    /// otherwise the store is consulted and a hit is cached in the archive.
    /// Returns whether the switch happened.
    pub async fn switch_active_week(&self, week: WeekKey) -> bool {
        {
            let mut session = self.session();
            if session.held(&week).is_some() {
                session.active_week = Some(week);
                return true;
            }
        }

        let found = match self.store.get(&self.config.site_key, &week).await {
            Ok(found) => found,
            Err(e) => {
                warn!(week = %week, error = %e, "store read failed");
                None
            }
        };
        let Some(report) = found else {
            debug!(week = %week, "no stored report for week");
            return false;
        };

        let mut session = self.session();
        if session.held(&week).is_none() {
            session.archive.push(report);
            session.archive.sort_by(|a, b| b.week_key.cmp(&a.week_key));
        }
        session.active_week = Some(week);
        true
    }

    /// The report for the active week.
    pub fn visible_report(&self) -> Option<Report> {
        let session = self.session();
        let week = session.active_week?;
        session.held(&week).cloned()
    }

    /// Current and archived weeks, newest first, without duplicates.
    pub fn weeks(&self) -> Vec<WeekEntry> {
        let session = self.session();
        let mut entries: Vec<WeekEntry> = session
            .current
            .iter()
            .chain(session.archive.iter())
            .map(|r| WeekEntry {
                week_key: r.week_key,
                label: r.week_of.clone(),
                active: session.active_week == Some(r.week_key),
                generated: r.is_generated(),
            })
            .collect();
        entries.sort_by(|a, b| b.week_key.cmp(&a.week_key));
        entries.dedup_by_key(|e| e.week_key);
        entries
    }

    pub fn view(&self) -> SessionView {
        let is_generating = self.is_generating();
        let can_generate_today = self.can_generate_today();
        let session = self.session();
        SessionView {
            state: session.state,
            current: session.current.clone(),
            archive: session.archive.clone(),
            active_week: session.active_week,
            is_generating,
            can_generate_today,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DependentProjectConfig, MetricField, MetricQuery, RosterProject};
    use crate::error::SourceError;
    use crate::report::{PLACEHOLDER_NARRATIVE, STATUS_FETCH_FAILED};
    use crate::sources::{
        AskOptions, Identity, IdentityProvider, KeyValueStore, MemoryStore, Reasoner, Row,
        SnapshotSource, Warehouse,
    };
    use crate::store::store_key;
    use crate::types::{DateHealth, ProjectState, RiskLevel};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::{json, Value};
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    const SITE: &str = "markets-weekly-updates";

    // -----------------------------------------------------------------------
    // Fakes
    // -----------------------------------------------------------------------

    /// Counts calls; optionally parks on the first call until released.
    #[derive(Default)]
    struct CountingWarehouse {
        calls: AtomicUsize,
        gate: Option<(Arc<Notify>, Arc<Notify>)>,
    }

    #[async_trait]
    impl Warehouse for CountingWarehouse {
        async fn query(&self, sql: &str) -> Result<Vec<Row>, SourceError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if let (0, Some((entered, release))) = (n, &self.gate) {
                entered.notify_one();
                release.notified().await;
            }
            let row = if sql.contains("migration") {
                json!({"gmv_migrated_pct": 73.5, "shops_remaining": 120})
            } else {
                json!({"project_id": "46500", "name": "Sub-country Markets", "state": "Build",
                       "date_health": "At Risk", "recent_updates": "Short note."})
            };
            Ok(vec![row.as_object().cloned().unwrap_or_default()])
        }
    }

    struct Scripted {
        answers: Vec<(&'static str, Result<&'static str, ()>)>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Reasoner for Scripted {
        async fn ask(&self, prompt: &str, _o: &AskOptions) -> Result<String, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.answers.iter().find(|(needle, _)| prompt.contains(needle)) {
                Some((_, Ok(text))) => Ok(text.to_string()),
                Some((_, Err(()))) => Err(SourceError::Upstream("tool call failed".into())),
                None => Ok(String::new()),
            }
        }
    }

    struct Lead;

    #[async_trait]
    impl IdentityProvider for Lead {
        async fn current_user(&self) -> Result<Identity, SourceError> {
            Ok(Identity {
                email: Some("lead@example.com".into()),
                name: None,
            })
        }
    }

    /// Reads succeed against an inner store; every write fails.
    struct ReadOnlyStore(MemoryStore);

    #[async_trait]
    impl KeyValueStore for ReadOnlyStore {
        async fn get(&self, key: &str) -> Result<Option<Value>, SourceError> {
            self.0.get(key).await
        }
        async fn set(&self, _key: &str, _value: Value) -> Result<(), SourceError> {
            Err(SourceError::Upstream("quota exceeded".into()))
        }
    }

    struct OneSnapshot(Report);

    #[async_trait]
    impl SnapshotSource for OneSnapshot {
        async fn load(&self, week: &WeekKey) -> Result<Option<Report>, SourceError> {
            Ok((self.0.week_key == *week).then(|| self.0.clone()))
        }
    }

    // -----------------------------------------------------------------------
    // Fixtures
    // -----------------------------------------------------------------------

    fn at(y: i32, m: u32, d: u32) -> Arc<dyn Clock> {
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        Arc::new(FixedClock(offset.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap()))
    }

    /// Tuesday.
    fn tuesday() -> Arc<dyn Clock> {
        at(2026, 2, 3)
    }

    fn week(s: &str) -> WeekKey {
        s.parse().unwrap()
    }

    fn config() -> TeamConfig {
        let mut cfg = TeamConfig::new("Markets", SITE);
        cfg.metrics.queries = vec![MetricQuery {
            name: "migration".into(),
            sql: "SELECT migration".into(),
            fields: vec![
                MetricField {
                    key: "gmvMigratedPct".into(),
                    column: "gmv_migrated_pct".into(),
                },
                MetricField {
                    key: "gmvChangeWoW".into(),
                    column: "gmv_change_wow".into(),
                },
                MetricField {
                    key: "shopsRemaining".into(),
                    column: "shops_remaining".into(),
                },
            ],
        }];
        cfg.projects.query = Some("SELECT projects IN ({PROJECT_IDS})".into());
        cfg.projects.ids = vec!["46500".into()];
        cfg.projects.roster = vec![RosterProject {
            tracker_id: Some("46500".into()),
            name: "Sub-country Markets".into(),
            owner: Some("Cole Atkinson".into()),
            state: ProjectState::Build,
            priority: "p0".into(),
            target_date: None,
            date_health: DateHealth::OnTrack,
            risk: RiskLevel::Low,
        }];
        cfg.dependents.projects = vec![
            DependentProjectConfig {
                tracker_id: Some("43504".into()),
                name: "Discounts by Market".into(),
                team: "Pricing".into(),
                lead: "David Wolf".into(),
                impact: "Needs API".into(),
            },
            DependentProjectConfig {
                tracker_id: Some("47003".into()),
                name: "Fulfillable Inventory".into(),
                team: "Inventory".into(),
                lead: "Sam".into(),
                impact: "Shared model".into(),
            },
        ];
        cfg
    }

    fn live_sources(warehouse: Arc<CountingWarehouse>, reasoner: Arc<Scripted>) -> Sources {
        Sources {
            warehouse,
            reasoner,
            identity: Arc::new(Lead),
            ..Sources::offline()
        }
    }

    fn reasoner(urgent: &'static str) -> Arc<Scripted> {
        Arc::new(Scripted {
            answers: vec![
                ("#43504", Err(())),
                ("#47003", Ok(r#"{"name": "Fulfillable Inventory", "status": "On track", "targetDate": "Apr 23"}"#)),
                ("DATA:", Ok(urgent)),
            ],
            calls: AtomicUsize::new(0),
        })
    }

    fn stored(week_key: WeekKey, cfg: &TeamConfig) -> Report {
        placeholder_report(week_key, cfg)
            .stamped(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap())
    }

    async fn seed(kv: &MemoryStore, report: &Report) {
        kv.set(
            &store_key(SITE, &report.week_key),
            serde_json::to_value(report).unwrap(),
        )
        .await
        .unwrap();
    }

    // -----------------------------------------------------------------------
    // Load
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn empty_everything_loads_placeholder() {
        let cfg = config();
        let ctl = Controller::new(
            cfg,
            Sources::offline(),
            ReportStore::new(Arc::new(MemoryStore::new())),
            tuesday(),
        );
        let view = ctl.load_data().await;
        assert_eq!(view.state, LifecycleState::Loaded);
        let current = view.current.unwrap();
        assert_eq!(current.week_key, week("2026-02-02"));
        assert!(current.generated_at.is_none());
        assert!(current.urgent_items.is_empty());
        assert_eq!(current.projects.len(), 1);
        assert_eq!(current.projects[0].name, "Sub-country Markets");
        assert_eq!(current.projects[0].narrative, PLACEHOLDER_NARRATIVE);
        assert!(view.archive.is_empty());
        assert_eq!(view.active_week, Some(week("2026-02-02")));
    }

    #[tokio::test]
    async fn load_prefers_store_then_snapshot_then_archive() {
        let cfg = config();
        let kv = Arc::new(MemoryStore::new());
        seed(&kv, &stored(week("2026-01-26"), &cfg)).await;
        seed(&kv, &stored(week("2026-01-12"), &cfg)).await;

        // No current-week report and no snapshot: adopt the newest archived one.
        let ctl = Controller::new(
            cfg.clone(),
            Sources::offline(),
            ReportStore::new(kv.clone()),
            tuesday(),
        );
        let view = ctl.load_data().await;
        assert_eq!(view.current.unwrap().week_key, week("2026-01-26"));
        let archived: Vec<WeekKey> = view.archive.iter().map(|r| r.week_key).collect();
        assert_eq!(archived, vec![week("2026-01-12")]);

        // A snapshot for this week wins over the archive.
        let mut snapshot = placeholder_report(week("2026-02-02"), &cfg);
        snapshot.projects[0].narrative = "from snapshot".into();
        let ctl = Controller::new(
            cfg.clone(),
            Sources {
                snapshots: Arc::new(OneSnapshot(snapshot)),
                ..Sources::offline()
            },
            ReportStore::new(kv.clone()),
            tuesday(),
        );
        let view = ctl.load_data().await;
        let current = view.current.unwrap();
        assert_eq!(current.projects[0].narrative, "from snapshot");
        assert_eq!(view.archive.len(), 2);

        // A stored report for this week wins over everything.
        seed(&kv, &stored(week("2026-02-02"), &cfg)).await;
        let ctl = Controller::new(cfg, Sources::offline(), ReportStore::new(kv), tuesday());
        let view = ctl.load_data().await;
        assert!(view.current.unwrap().is_generated());
    }

    // -----------------------------------------------------------------------
    // Generate
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn generation_runs_full_sequence_and_persists() {
        let cfg = config();
        let kv = Arc::new(MemoryStore::new());
        let wh = Arc::new(CountingWarehouse::default());
        let ai = reasoner(r#"[{"title": "Beta at risk", "reason": "Date health", "action": "Re-plan"}]"#);
        let ctl = Controller::new(
            cfg,
            live_sources(wh.clone(), ai.clone()),
            ReportStore::new(kv.clone()),
            tuesday(),
        );
        ctl.load_data().await;

        let report = ctl.generate().await.unwrap();
        assert_eq!(report.week_key, week("2026-02-02"));
        assert_eq!(report.generated_by.as_deref(), Some("lead@example.com"));
        assert!(report.is_generated());
        assert_eq!(report.metrics.get("gmvMigratedPct"), Some(73.5));
        assert_eq!(report.metrics.get("gmvChangeWoW"), None);
        assert_eq!(report.projects[0].date_health, DateHealth::AtRisk);
        assert_eq!(report.dependent_projects[0].status, STATUS_FETCH_FAILED);
        assert_eq!(report.dependent_projects[1].status, "On track");
        assert_eq!(report.urgent_items[0].title, "Beta at risk");

        assert_eq!(kv.writes(), vec![store_key(SITE, &week("2026-02-02"))]);
        assert_eq!(ctl.state(), LifecycleState::Loaded);
        assert!(!ctl.is_generating());
        assert_eq!(ctl.visible_report(), Some(report.clone()));

        // Round trip through the store.
        let store = ReportStore::new(kv);
        assert_eq!(
            store.get(SITE, &week("2026-02-02")).await.unwrap(),
            Some(report)
        );
    }

    #[tokio::test]
    async fn unparseable_urgent_answer_still_assembles() {
        let kv = Arc::new(MemoryStore::new());
        let ctl = Controller::new(
            config(),
            live_sources(
                Arc::new(CountingWarehouse::default()),
                reasoner("Everything looks fine, nothing urgent."),
            ),
            ReportStore::new(kv.clone()),
            tuesday(),
        );
        let report = ctl.generate().await.unwrap();
        assert!(report.urgent_items.is_empty());
        assert_eq!(kv.writes().len(), 1);
    }

    #[tokio::test]
    async fn refused_outside_window_without_calls() {
        let kv = Arc::new(MemoryStore::new());
        let wh = Arc::new(CountingWarehouse::default());
        let ai = reasoner("[]");
        // Saturday.
        let ctl = Controller::new(
            config(),
            live_sources(wh.clone(), ai.clone()),
            ReportStore::new(kv.clone()),
            at(2026, 2, 7),
        );
        ctl.load_data().await;
        let before = ctl.view();

        let err = ctl.generate().await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Refused(RefusalReason::OutsideGenerationWindow(chrono::Weekday::Sat))
        ));
        assert_eq!(err.to_string(), "Report generation is not available on Sat");
        assert_eq!(wh.calls.load(Ordering::SeqCst), 0);
        assert_eq!(ai.calls.load(Ordering::SeqCst), 0);
        assert!(kv.writes().is_empty());
        assert_eq!(ctl.state(), LifecycleState::Loaded);
        assert_eq!(ctl.view().current, before.current);
        assert!(!ctl.can_generate_today());
    }

    #[tokio::test]
    async fn second_request_while_generating_is_refused() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let wh = Arc::new(CountingWarehouse {
            calls: AtomicUsize::new(0),
            gate: Some((entered.clone(), release.clone())),
        });
        let kv = Arc::new(MemoryStore::new());
        let ctl = Arc::new(Controller::new(
            config(),
            live_sources(wh, reasoner("[]")),
            ReportStore::new(kv.clone()),
            tuesday(),
        ));

        let first = tokio::spawn({
            let ctl = ctl.clone();
            async move { ctl.generate().await }
        });
        entered.notified().await;

        assert!(ctl.is_generating());
        assert_eq!(ctl.state(), LifecycleState::Generating);
        let err = ctl.generate().await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Refused(RefusalReason::AlreadyGenerating)
        ));

        release.notify_one();
        let report = first.await.unwrap().unwrap();
        assert_eq!(report.week_key, week("2026-02-02"));
        assert_eq!(kv.writes().len(), 1);
        assert!(!ctl.is_generating());
    }

    #[tokio::test]
    async fn cancelled_generation_returns_to_idle() {
        let entered = Arc::new(Notify::new());
        // Never released: the first warehouse call parks until the task dies.
        let parked = Arc::new(Notify::new());
        let wh = Arc::new(CountingWarehouse {
            calls: AtomicUsize::new(0),
            gate: Some((entered.clone(), parked)),
        });
        let kv = Arc::new(MemoryStore::new());
        let ctl = Arc::new(Controller::new(
            config(),
            live_sources(wh, reasoner("[]")),
            ReportStore::new(kv.clone()),
            tuesday(),
        ));

        let task = tokio::spawn({
            let ctl = ctl.clone();
            async move { ctl.generate().await }
        });
        entered.notified().await;
        assert_eq!(ctl.state(), LifecycleState::Generating);

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert!(!ctl.is_generating());
        assert_eq!(ctl.state(), LifecycleState::Idle);
        let view = ctl.view();
        assert!(!view.is_generating);
        assert_eq!(view.state, LifecycleState::Idle);

        assert_eq!(ctl.load_data().await.state, LifecycleState::Loaded);
        assert!(kv.writes().is_empty());

        // The guard is free again.
        let report = ctl.generate().await.unwrap();
        assert_eq!(report.week_key, week("2026-02-02"));
        assert_eq!(ctl.state(), LifecycleState::Loaded);
    }

    #[tokio::test]
    async fn failed_put_aborts_and_keeps_previous_report() {
        let cfg = config();
        let inner = MemoryStore::new();
        let previous = stored(week("2026-02-02"), &cfg);
        seed(&inner, &previous).await;
        let ctl = Controller::new(
            cfg,
            live_sources(Arc::new(CountingWarehouse::default()), reasoner("[]")),
            ReportStore::new(Arc::new(ReadOnlyStore(inner))),
            tuesday(),
        );
        ctl.load_data().await;

        let err = ctl.generate().await.unwrap_err();
        assert!(matches!(err, LifecycleError::Aborted(_)));
        assert!(err.to_string().starts_with("Generation failed:"));
        assert_eq!(ctl.state(), LifecycleState::Idle);
        assert!(!ctl.is_generating());
        assert_eq!(ctl.visible_report(), Some(previous));
    }

    // -----------------------------------------------------------------------
    // Read side
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn switch_between_held_and_stored_weeks() {
        let mut cfg = config();
        cfg.archive_depth = 1;
        let kv = Arc::new(MemoryStore::new());
        seed(&kv, &stored(week("2026-02-02"), &cfg)).await;
        seed(&kv, &stored(week("2026-01-26"), &cfg)).await;
        seed(&kv, &stored(week("2026-01-05"), &cfg)).await;

        let ctl = Controller::new(cfg, Sources::offline(), ReportStore::new(kv.clone()), tuesday());
        ctl.load_data().await;

        assert!(ctl.switch_active_week(week("2026-01-26")).await);
        assert_eq!(ctl.visible_report().unwrap().week_key, week("2026-01-26"));

        // Beyond archive depth: fetched from the store and cached.
        assert!(ctl.switch_active_week(week("2026-01-05")).await);
        assert_eq!(ctl.visible_report().unwrap().week_key, week("2026-01-05"));
        let weeks: Vec<(String, bool)> = ctl
            .weeks()
            .into_iter()
            .map(|w| (w.week_key.to_string(), w.active))
            .collect();
        assert_eq!(
            weeks,
            vec![
                ("2026-02-02".to_string(), false),
                ("2026-01-26".to_string(), false),
                ("2026-01-05".to_string(), true),
            ]
        );

        assert!(!ctl.switch_active_week(week("2025-06-02")).await);
        assert_eq!(ctl.visible_report().unwrap().week_key, week("2026-01-05"));
        assert_eq!(kv.writes().len(), 3);
    }

    #[tokio::test]
    async fn regeneration_replaces_current_and_archives_adopted_report() {
        let cfg = config();
        let kv = Arc::new(MemoryStore::new());
        seed(&kv, &stored(week("2026-01-26"), &cfg)).await;
        let ctl = Controller::new(
            cfg,
            live_sources(Arc::new(CountingWarehouse::default()), reasoner("[]")),
            ReportStore::new(kv),
            tuesday(),
        );
        // Last week's report is adopted as current until this week exists.
        let view = ctl.load_data().await;
        assert_eq!(view.current.unwrap().week_key, week("2026-01-26"));

        ctl.generate().await.unwrap();
        let view = ctl.view();
        assert_eq!(view.current.unwrap().week_key, week("2026-02-02"));
        assert_eq!(view.active_week, Some(week("2026-02-02")));
        let archived: Vec<WeekKey> = view.archive.iter().map(|r| r.week_key).collect();
        assert_eq!(archived, vec![week("2026-01-26")]);
    }
}
