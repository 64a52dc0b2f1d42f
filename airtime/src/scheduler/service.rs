//! Scheduler service implementation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::Result;
use crate::config::AppConfig;
use crate::domain::{StatusSnapshot, TimeOfDay};
use crate::media::{MediaProber, MetadataCache};
use crate::schedule::{ScheduleStore, StoreOutcome, resolve};
use crate::status::StatusPublisher;
use crate::utils::fs;

/// Timing configuration for the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Cadence of status publication.
    pub tick_interval: Duration,
    /// Minimum time between metadata refreshes.
    pub rescan_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let app = AppConfig::default();
        Self::from(&app)
    }
}

impl From<&AppConfig> for SchedulerConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            tick_interval: config.tick_interval,
            rescan_interval: config.rescan_interval,
        }
    }
}

/// Lifecycle of the loop. There is no terminal state besides process exit
/// (or cancellation of [`Scheduler::run`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Init,
    Running,
}

/// What one tick did.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub metadata_refreshed: bool,
    pub schedule: StoreOutcome,
    /// The published snapshot; `None` if publishing failed.
    pub published: Option<StatusSnapshot>,
}

/// Owns all state carried between ticks.
pub struct Scheduler {
    config: SchedulerConfig,
    state: SchedulerState,
    schedule: ScheduleStore,
    metadata: MetadataCache,
    publisher: StatusPublisher,
    last_metadata_refresh: Option<Instant>,
    now_playing: Option<(TimeOfDay, String)>,
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        schedule: ScheduleStore,
        metadata: MetadataCache,
        publisher: StatusPublisher,
    ) -> Self {
        Self {
            config,
            state: SchedulerState::Init,
            schedule,
            metadata,
            publisher,
            last_metadata_refresh: None,
            now_playing: None,
        }
    }

    /// Prepare storage and cached state from `config`.
    ///
    /// Fails only when a required directory cannot be created; this is the
    /// one fatal error class of the service.
    pub async fn bootstrap(config: &AppConfig, prober: Arc<dyn MediaProber>) -> Result<Self> {
        config.validate()?;

        fs::ensure_dir_all_with_op("creating media directory", &config.media_dir).await?;
        fs::ensure_parent_dir(&config.status_path).await?;
        fs::ensure_parent_dir(&config.metadata_path).await?;

        let mut metadata = MetadataCache::new(
            &config.metadata_path,
            &config.media_dir,
            prober,
            config.probe_concurrency,
        );
        metadata.load_persisted().await;

        let mut schedule = ScheduleStore::new(&config.schedule_path, config.default_display_secs);
        schedule.reload_if_changed().await;

        info!(
            media_dir = %config.media_dir.display(),
            schedule = %config.schedule_path.display(),
            status = %config.status_path.display(),
            "Scheduler initialized"
        );

        Ok(Self::new(
            SchedulerConfig::from(config),
            schedule,
            metadata,
            StatusPublisher::new(&config.status_path),
        ))
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn schedule(&self) -> &ScheduleStore {
        &self.schedule
    }

    pub fn metadata(&self) -> &MetadataCache {
        &self.metadata
    }

    fn is_refresh_due(&self, now: Instant) -> bool {
        match self.last_metadata_refresh {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.config.rescan_interval,
        }
    }

    /// Run one tick with the wall clock.
    pub async fn tick(&mut self) -> TickReport {
        self.tick_at(Utc::now(), Instant::now()).await
    }

    /// Run one tick as if the wall clock read `now_utc` and the monotonic
    /// clock read `now`.
    pub async fn tick_at(&mut self, now_utc: DateTime<Utc>, now: Instant) -> TickReport {
        let mut metadata_refreshed = false;
        if self.is_refresh_due(now) {
            match self.metadata.refresh(now_utc).await {
                Ok(_) => metadata_refreshed = true,
                Err(e) => warn!(error = %e, "Metadata refresh failed, keeping previous catalog"),
            }
            // Reset even on failure so a broken library is not rescanned every tick.
            self.last_metadata_refresh = Some(now);
        }

        let schedule_outcome = self.schedule.reload_if_changed().await;

        let resolution = resolve(self.schedule.current(), now_utc);
        note_now_playing(
            &mut self.now_playing,
            resolution.current.map(|e| (e.time_of_day, e.media_id.as_str())),
        );

        let catalog = self.metadata.catalog();
        let published = match self.publisher.publish(resolution, &catalog, now_utc).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(error = %e, "Failed to publish status");
                None
            }
        };

        TickReport {
            metadata_refreshed,
            schedule: schedule_outcome,
            published,
        }
    }

    /// Tick at the configured cadence until `cancel` fires.
    pub async fn run(&mut self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.state = SchedulerState::Running;
        info!(
            tick_ms = self.config.tick_interval.as_millis() as u64,
            rescan_ms = self.config.rescan_interval.as_millis() as u64,
            "Scheduler running"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Scheduler loop shutting down");
                    break;
                }
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }
    }
}

/// Log when the current entry changes between ticks.
fn note_now_playing(last: &mut Option<(TimeOfDay, String)>, current: Option<(TimeOfDay, &str)>) {
    let changed = match (last.as_ref(), current) {
        (Some((time, media)), Some((t, m))) => *time != t || media != m,
        (None, None) => false,
        _ => true,
    };
    if !changed {
        return;
    }

    match current {
        Some((time, media)) => info!(time = %time, media = %media, "Now playing"),
        None => info!("Schedule is empty, nothing playing"),
    }
    *last = current.map(|(t, m)| (t, m.to_string()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::media::ProbeResult;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingProber {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MediaProber for CountingProber {
        async fn probe(&self, path: &Path) -> Result<ProbeResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if path.to_string_lossy().contains("corrupt") {
                return Err(Error::probe("unreadable"));
            }
            Ok(ProbeResult {
                title: format!("Title of {}", path.file_stem().unwrap().to_string_lossy()),
                ..ProbeResult::default()
            })
        }
    }

    fn app_config(dir: &Path) -> AppConfig {
        AppConfig {
            media_dir: dir.join("media"),
            schedule_path: dir.join("schedule.json"),
            metadata_path: dir.join("state").join("media_metadata.json"),
            status_path: dir.join("state").join("obs_status.json"),
            log_dir: dir.join("logs"),
            ..AppConfig::default()
        }
    }

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, h, m, s).unwrap()
    }

    #[tokio::test]
    async fn test_bootstrap_creates_directories() {
        let dir = TempDir::new().unwrap();
        let config = app_config(dir.path());

        let scheduler = Scheduler::bootstrap(&config, Arc::new(CountingProber::default()))
            .await
            .unwrap();

        assert!(config.media_dir.is_dir());
        assert!(dir.path().join("state").is_dir());
        assert_eq!(scheduler.state(), SchedulerState::Init);
    }

    #[tokio::test]
    async fn test_bootstrap_fails_when_media_dir_cannot_be_created() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file, not a directory").unwrap();

        let config = AppConfig {
            media_dir: blocker.join("media"),
            ..app_config(dir.path())
        };
        let result = Scheduler::bootstrap(&config, Arc::new(CountingProber::default())).await;
        assert!(matches!(result, Err(Error::IoPath { .. })));
    }

    #[tokio::test]
    async fn test_metadata_refresh_follows_rescan_interval() {
        let dir = TempDir::new().unwrap();
        let config = app_config(dir.path());
        std::fs::create_dir_all(&config.media_dir).unwrap();
        std::fs::write(config.media_dir.join("a.mp4"), b"").unwrap();

        let prober = Arc::new(CountingProber::default());
        let mut scheduler = Scheduler::bootstrap(&config, prober.clone()).await.unwrap();

        let start = Instant::now();
        let report = scheduler.tick_at(at(9, 0, 0), start).await;
        assert!(report.metadata_refreshed);
        assert_eq!(prober.calls.load(Ordering::SeqCst), 1);

        for secs in 1..=10 {
            let report = scheduler
                .tick_at(at(9, 0, secs), start + Duration::from_secs(secs.into()))
                .await;
            assert!(!report.metadata_refreshed, "refreshed after {secs}s");
        }

        let report = scheduler
            .tick_at(at(9, 0, 11), start + Duration::from_secs(11))
            .await;
        assert!(report.metadata_refreshed);
        assert_eq!(prober.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_tick_publishes_with_empty_schedule() {
        let dir = TempDir::new().unwrap();
        let config = app_config(dir.path());
        let mut scheduler = Scheduler::bootstrap(&config, Arc::new(CountingProber::default()))
            .await
            .unwrap();

        let report = scheduler.tick_at(at(12, 0, 0), Instant::now()).await;
        let snapshot = report.published.unwrap();
        assert!(snapshot.current.is_none());
        assert!(snapshot.next.is_none());
        assert!(config.status_path.is_file());
    }

    #[tokio::test]
    async fn test_tick_picks_up_schedule_edits() {
        let dir = TempDir::new().unwrap();
        let config = app_config(dir.path());
        std::fs::create_dir_all(&config.media_dir).unwrap();
        std::fs::write(config.media_dir.join("corrupt.mp4"), b"").unwrap();

        let mut scheduler = Scheduler::bootstrap(&config, Arc::new(CountingProber::default()))
            .await
            .unwrap();
        let start = Instant::now();
        scheduler.tick_at(at(9, 0, 0), start).await;

        std::fs::write(
            &config.schedule_path,
            r#"{"timezone":"UTC","items":[{"time":"08:00:00","media":"corrupt.mp4","metadata_display_duration":3}]}"#,
        )
        .unwrap();

        let report = scheduler
            .tick_at(at(9, 0, 1), start + Duration::from_secs(1))
            .await;
        assert_eq!(report.schedule, StoreOutcome::Reloaded);

        let snapshot = report.published.unwrap();
        assert_eq!(snapshot.current.unwrap().media, "corrupt.mp4");
        // Probe failure still yields an entry with default fields.
        assert_eq!(snapshot.metadata.unwrap().title, "corrupt");
        assert_eq!(snapshot.display_until, Some(at(9, 0, 4)));
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_stop_ticks() {
        let dir = TempDir::new().unwrap();
        let config = app_config(dir.path());
        let mut scheduler = Scheduler::bootstrap(&config, Arc::new(CountingProber::default()))
            .await
            .unwrap();

        std::fs::remove_dir_all(dir.path().join("state")).unwrap();
        let report = scheduler.tick_at(at(12, 0, 0), Instant::now()).await;
        assert!(report.published.is_none());

        std::fs::create_dir_all(dir.path().join("state")).unwrap();
        let report = scheduler.tick_at(at(12, 0, 1), Instant::now()).await;
        assert!(report.published.is_some());
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig {
            tick_interval: Duration::from_millis(10),
            ..app_config(dir.path())
        };
        let mut scheduler = Scheduler::bootstrap(&config, Arc::new(CountingProber::default()))
            .await
            .unwrap();

        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            stopper.cancel();
        });

        scheduler.run(cancel).await;
        assert_eq!(scheduler.state(), SchedulerState::Running);
        assert!(config.status_path.is_file());
    }
}
