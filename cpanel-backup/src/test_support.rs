//! Scripted collaborators for driving the watcher and orchestrator in tests.

use crate::api::{ApiOutcome, BackupRequest, ControlPanel};
use crate::config::TransferMethod;
use crate::executor::RunResult;
use crate::fs::{ArtifactFs, ArtifactPattern, FileStat};
use crate::notify::Notifier;
use crate::transfer::{Destination, TransferResult, Transporter};
use crate::utils::errors::{BackupError, Result};
use crate::watcher::clock::Clock;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

/// Clock whose `sleep` advances time instantly
pub struct ManualClock {
    now: Mutex<SystemTime>,
}

impl ManualClock {
    pub fn new(start: SystemTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn starting_now() -> Self {
        Self::new(SystemTime::now())
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        *self.now.lock().unwrap() += duration;
    }
}

/// Filesystem replaying queued observations. The last queued listing and
/// the last queued size repeat forever.
#[derive(Default)]
pub struct ScriptedFs {
    listings: Mutex<VecDeque<Vec<FileStat>>>,
    sizes: Mutex<VecDeque<u64>>,
    listing_failures: AtomicUsize,
    fail_remove: AtomicBool,
    removed: Mutex<Vec<PathBuf>>,
    list_calls: AtomicUsize,
    size_calls: AtomicUsize,
}

impl ScriptedFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_listing(&self, files: Vec<FileStat>) {
        self.listings.lock().unwrap().push_back(files);
    }

    pub fn set_sizes(&self, sizes: &[u64]) {
        *self.sizes.lock().unwrap() = sizes.iter().copied().collect();
    }

    /// Make the next `n` listings fail
    pub fn fail_listings(&self, n: usize) {
        self.listing_failures.store(n, Ordering::SeqCst);
    }

    pub fn fail_removes(&self) {
        self.fail_remove.store(true, Ordering::SeqCst);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn size_calls(&self) -> usize {
        self.size_calls.load(Ordering::SeqCst)
    }

    pub fn removed(&self) -> Vec<PathBuf> {
        self.removed.lock().unwrap().clone()
    }
}

fn next_or_last<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

impl ArtifactFs for ScriptedFs {
    fn list_matching(&self, _dir: &Path, _pattern: &ArtifactPattern) -> io::Result<Vec<FileStat>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .listing_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(io::Error::new(io::ErrorKind::Other, "scripted listing failure"));
        }

        Ok(next_or_last(&mut self.listings.lock().unwrap()).unwrap_or_default())
    }

    fn size_of(&self, path: &Path) -> io::Result<u64> {
        self.size_calls.fetch_add(1, Ordering::SeqCst);
        next_or_last(&mut self.sizes.lock().unwrap()).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no scripted size for {}", path.display()),
            )
        })
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "Permission denied"));
        }
        self.removed.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

/// Panel answering every trigger with the same outcome
pub struct StubControlPanel {
    outcome: ApiOutcome,
    calls: AtomicUsize,
    last_timeout: Mutex<Option<Duration>>,
}

impl StubControlPanel {
    pub fn new(outcome: ApiOutcome) -> Self {
        Self {
            outcome,
            calls: AtomicUsize::new(0),
            last_timeout: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_timeout(&self) -> Option<Duration> {
        *self.last_timeout.lock().unwrap()
    }
}

#[async_trait]
impl ControlPanel for StubControlPanel {
    async fn trigger(&self, _request: &BackupRequest, timeout: Duration) -> ApiOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_timeout.lock().unwrap() = Some(timeout);
        self.outcome.clone()
    }
}

/// Transporter returning a fixed result and recording what it was asked to send
pub struct StubTransporter {
    result: TransferResult,
    sent: Mutex<Vec<PathBuf>>,
}

impl StubTransporter {
    pub fn new(result: TransferResult) -> Self {
        Self {
            result,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<PathBuf> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transporter for StubTransporter {
    fn method(&self) -> TransferMethod {
        TransferMethod::Curl
    }

    async fn send(&self, local_path: &Path, _destination: &Destination) -> TransferResult {
        self.sent.lock().unwrap().push(local_path.to_path_buf());
        self.result.clone()
    }
}

/// Notifier that keeps every result it is handed
pub struct RecordingNotifier {
    results: Mutex<Vec<RunResult>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// Records, then reports a delivery failure
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn results(&self) -> Vec<RunResult> {
        self.results.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, result: &RunResult) -> Result<()> {
        self.results.lock().unwrap().push(result.clone());
        if self.fail {
            return Err(BackupError::Notification("sendmail exited with status 75".to_string()));
        }
        Ok(())
    }
}
