//! Completion detection for the control panel's backup archive.
//!
//! The panel gives no completion callback, so completion is inferred from
//! observations only:
//!
//! 1. **Discovery**: poll the search directory for the newest file matching
//!    the archive pattern, accepting it only if it was modified within the
//!    recency window (older files are leftovers from earlier runs).
//! 2. **Stability**: poll the candidate's size until it has stayed unchanged
//!    for `stability_checks` consecutive polls and exceeds `min_size`.
//!
//! Both phases share one deadline base captured when watching starts.

pub mod clock;
pub mod progress;

use crate::config::WatchConfig;
use crate::fs::{ArtifactFs, ArtifactPattern, FileStat};
use crate::utils::errors::{BackupError, Result};
use clock::Clock;
use progress::{format_bytes, format_duration, format_speed, GrowthTracker};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Polling parameters for one wait
#[derive(Debug, Clone)]
pub struct WatchSettings {
    pub pattern: ArtifactPattern,
    pub poll_interval: Duration,

    /// Deadline for discovery, measured from the start of the wait
    pub overall_timeout: Duration,

    /// Maximum age of a file to count as created by this run
    pub recency_window: Duration,

    /// Extra time the stability phase gets on top of `overall_timeout`
    pub extra_write_allowance: Duration,

    pub stability_checks: u32,
    pub min_size: u64,
}

impl WatchSettings {
    pub fn from_config(config: &WatchConfig) -> Result<Self> {
        let pattern = ArtifactPattern::parse(&config.pattern).ok_or_else(|| {
            BackupError::Config(format!("invalid archive pattern: {}", config.pattern))
        })?;

        Ok(Self {
            pattern,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            overall_timeout: Duration::from_secs(config.overall_timeout_secs),
            recency_window: Duration::from_secs(config.recency_window_secs),
            extra_write_allowance: Duration::from_secs(config.extra_write_allowance_secs),
            stability_checks: config.stability_checks,
            min_size: config.min_size_bytes,
        })
    }

    /// Quiet period required before an archive counts as complete
    pub fn quiet_period(&self) -> Duration {
        self.poll_interval * self.stability_checks
    }
}

/// The file believed to be this run's archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactCandidate {
    pub path: PathBuf,
    pub last_modified: SystemTime,
    pub observed_size: u64,
    pub first_seen: SystemTime,
    pub last_seen: SystemTime,
}

impl ArtifactCandidate {
    fn new(stat: &FileStat, now: SystemTime) -> Self {
        Self {
            path: stat.path.clone(),
            last_modified: stat.modified,
            observed_size: stat.size,
            first_seen: now,
            last_seen: now,
        }
    }

    fn observe(&mut self, size: u64, now: SystemTime) {
        self.observed_size = size;
        self.last_seen = now;
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchPhase {
    Discovery,
    Stability,
}

impl std::fmt::Display for WatchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatchPhase::Discovery => write!(f, "New backup file did not appear"),
            WatchPhase::Stability => write!(f, "Backup file did not finish writing"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WatchError {
    #[error("{phase} (gave up after {}s)", .waited.as_secs())]
    NotFound { phase: WatchPhase, waited: Duration },
}

/// Pick the newest match, accepted only if younger than `recency_window`.
///
/// A stale newest file means every other match is stale too, so no older
/// file is ever considered.
pub fn select_candidate(
    files: &[FileStat],
    now: SystemTime,
    recency_window: Duration,
) -> Option<&FileStat> {
    let newest = files.iter().max_by_key(|f| f.modified)?;
    if newest.age_at(now) < recency_window {
        Some(newest)
    } else {
        None
    }
}

/// Counts consecutive unchanged size observations.
#[derive(Debug, Clone)]
pub struct StabilityTracker {
    required: u32,
    min_size: u64,
    last_size: Option<u64>,
    unchanged: u32,
}

impl StabilityTracker {
    pub fn new(required: u32, min_size: u64) -> Self {
        Self {
            required,
            min_size,
            last_size: None,
            unchanged: 0,
        }
    }

    /// Feed one size observation; returns true once the archive counts as complete.
    pub fn observe(&mut self, size: u64) -> bool {
        if self.last_size == Some(size) {
            self.unchanged += 1;
        } else {
            self.last_size = Some(size);
            self.unchanged = 0;
        }

        self.unchanged >= self.required && size > self.min_size
    }

    pub fn unchanged(&self) -> u32 {
        self.unchanged
    }
}

/// Polls the filesystem until the run's archive exists and stops growing
pub struct ArtifactWatcher {
    fs: Arc<dyn ArtifactFs>,
    clock: Arc<dyn Clock>,
}

impl ArtifactWatcher {
    pub fn new(fs: Arc<dyn ArtifactFs>, clock: Arc<dyn Clock>) -> Self {
        Self { fs, clock }
    }

    /// Wait for a fresh, fully written archive in `search_dir`
    pub async fn await_artifact(
        &self,
        search_dir: &Path,
        settings: &WatchSettings,
    ) -> std::result::Result<ArtifactCandidate, WatchError> {
        let start = self.clock.now();

        info!(
            "Monitoring {} for new backup file (timeout: {})",
            search_dir.display(),
            format_duration(settings.overall_timeout)
        );

        let mut candidate = self.discover(search_dir, settings, start).await?;

        info!("Found new backup file: {}", candidate.file_name());
        info!("Waiting for write completion...");

        self.await_stable(&mut candidate, settings, start).await?;

        Ok(candidate)
    }

    async fn discover(
        &self,
        search_dir: &Path,
        settings: &WatchSettings,
        start: SystemTime,
    ) -> std::result::Result<ArtifactCandidate, WatchError> {
        while self.clock.elapsed_since(start) < settings.overall_timeout {
            let now = self.clock.now();

            match self.fs.list_matching(search_dir, &settings.pattern) {
                Ok(files) => {
                    if let Some(stat) = select_candidate(&files, now, settings.recency_window) {
                        return Ok(ArtifactCandidate::new(stat, now));
                    }
                    if !files.is_empty() {
                        debug!("{} matching file(s), none recent enough", files.len());
                    }
                }
                Err(e) => {
                    warn!("Failed to list {}: {}", search_dir.display(), e);
                }
            }

            self.clock.sleep(settings.poll_interval).await;
        }

        error!("New backup file did not appear within timeout");
        Err(WatchError::NotFound {
            phase: WatchPhase::Discovery,
            waited: self.clock.elapsed_since(start),
        })
    }

    async fn await_stable(
        &self,
        candidate: &mut ArtifactCandidate,
        settings: &WatchSettings,
        start: SystemTime,
    ) -> std::result::Result<(), WatchError> {
        let deadline = settings.overall_timeout + settings.extra_write_allowance;
        let mut tracker = StabilityTracker::new(settings.stability_checks, settings.min_size);
        let mut growth = GrowthTracker::new(self.clock.now(), candidate.observed_size);

        while self.clock.elapsed_since(start) < deadline {
            let now = self.clock.now();

            match self.fs.size_of(&candidate.path) {
                Ok(size) => {
                    candidate.observe(size, now);
                    let snapshot = growth.update(now, size);
                    let complete = tracker.observe(size);

                    info!(
                        unchanged_polls = tracker.unchanged(),
                        "Current size: {} ({}, {} elapsed)",
                        format_bytes(snapshot.size),
                        format_speed(snapshot.bytes_per_second),
                        format_duration(snapshot.elapsed)
                    );

                    if complete {
                        info!(
                            "File size stable for {}. Assuming complete.",
                            format_duration(settings.quiet_period())
                        );
                        return Ok(());
                    }
                }
                Err(e) => {
                    warn!("Failed to read size of {}: {}", candidate.path.display(), e);
                }
            }

            self.clock.sleep(settings.poll_interval).await;
        }

        error!("Timeout waiting for backup completion");
        Err(WatchError::NotFound {
            phase: WatchPhase::Stability,
            waited: self.clock.elapsed_since(start),
        })
    }
}
