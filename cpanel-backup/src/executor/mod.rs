//! Backup run orchestrator - sequences one full backup run.
//!
//! Triggering -> WaitingForArtifact -> Uploading -> CleaningUp -> Notifying -> Done
//!
//! Any stage may end the run early as Failed, but every run passes through
//! Notifying exactly once. The local archive is deleted only after a
//! successful upload.

pub mod state;

pub use state::{RunReport, RunResult, RunState};

use crate::api::{ApiOutcome, BackupRequest, ControlPanel, CpanelClient};
use crate::config::{Config, TransferMethod};
use crate::fs::{ArtifactFs, LocalFs};
use crate::notify::{build_notifier, Notifier};
use crate::transfer::{build_transporter, Destination, TransferResult, Transporter};
use crate::utils::errors::Result;
use crate::watcher::clock::SystemClock;
use crate::watcher::{ArtifactWatcher, WatchError, WatchSettings};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Fatal stage failures
#[derive(Error, Debug)]
pub enum StageError {
    #[error("cPanel API reported failure: {errors}")]
    TriggerRejected { errors: String, diagnostic: String },

    #[error("Timeout waiting for backup file creation.")]
    ArtifactTimeout {
        source: WatchError,
        /// What the trigger call returned
        trigger: String,
    },

    #[error("Failed to upload backup via {method}. Check output for details.")]
    Transfer {
        method: TransferMethod,
        result: TransferResult,
    },
}

impl StageError {
    /// Payload attached to the failure notification
    pub fn diagnostic(&self) -> String {
        match self {
            StageError::TriggerRejected { diagnostic, .. } => diagnostic.clone(),
            StageError::ArtifactTimeout { source, trigger } => {
                format!("{}\n\nTrigger: {}", source, trigger)
            }
            StageError::Transfer { result, .. } => format!(
                "Exit code: {}\n{}",
                result.exit_code_label(),
                result.diagnostic_output
            ),
        }
    }
}

/// Per-run parameters derived from configuration
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub search_dir: PathBuf,
    pub watch: WatchSettings,
    pub destination: Destination,
    pub api_timeout: Duration,

    /// Fail the run when the panel reports the job as failed
    pub strict_status: bool,
}

impl RunSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            search_dir: config.search_dir(),
            watch: WatchSettings::from_config(&config.watch)?,
            destination: Destination::from_config(&config.transfer),
            api_timeout: config.api_timeout(),
            strict_status: config.api.strict_status,
        })
    }
}

/// Main backup orchestrator
pub struct BackupOrchestrator {
    api: Arc<dyn ControlPanel>,
    watcher: ArtifactWatcher,
    fs: Arc<dyn ArtifactFs>,
    transporter: Arc<dyn Transporter>,
    notifier: Arc<dyn Notifier>,
    settings: RunSettings,
}

impl BackupOrchestrator {
    pub fn new(
        api: Arc<dyn ControlPanel>,
        watcher: ArtifactWatcher,
        fs: Arc<dyn ArtifactFs>,
        transporter: Arc<dyn Transporter>,
        notifier: Arc<dyn Notifier>,
        settings: RunSettings,
    ) -> Self {
        Self {
            api,
            watcher,
            fs,
            transporter,
            notifier,
            settings,
        }
    }

    /// Wire up the production collaborators
    pub fn from_config(config: &Config) -> Result<Self> {
        let fs: Arc<dyn ArtifactFs> = Arc::new(LocalFs);

        Ok(Self::new(
            Arc::new(CpanelClient::new(&config.api)?),
            ArtifactWatcher::new(fs.clone(), Arc::new(SystemClock)),
            fs,
            build_transporter(&config.transfer),
            build_notifier(config),
            RunSettings::from_config(config)?,
        ))
    }

    /// Execute one backup run. Never fails; the outcome is in the report.
    pub async fn run(&self, request: &BackupRequest) -> RunReport {
        let run_id = uuid::Uuid::new_v4();
        self.run_inner(request)
            .instrument(info_span!("backup_run", %run_id))
            .await
    }

    async fn run_inner(&self, request: &BackupRequest) -> RunReport {
        info!("Starting cPanel Full Backup Process...");

        let mut states = Vec::new();
        let result = match self.execute(request, &mut states).await {
            Ok(message) => {
                info!("[OK] {}", message);
                RunResult::success(message)
            }
            Err(e) => {
                error!("[ERROR] {}", e);
                RunResult::failure(e.to_string(), Some(e.diagnostic()))
            }
        };

        enter(&mut states, RunState::Notifying);
        if let Err(e) = self.notifier.notify(&result).await {
            warn!("Failed to send notification: {}", e);
        }

        enter(
            &mut states,
            if result.success {
                RunState::Done
            } else {
                RunState::Failed
            },
        );

        RunReport { result, states }
    }

    async fn execute(
        &self,
        request: &BackupRequest,
        states: &mut Vec<RunState>,
    ) -> std::result::Result<String, StageError> {
        enter(states, RunState::Triggering);
        info!("Requesting local backup generation via cPanel UAPI...");
        let outcome = self.api.trigger(request, self.settings.api_timeout).await;
        self.assess_trigger(&outcome)?;

        enter(states, RunState::WaitingForArtifact);
        let artifact = self
            .watcher
            .await_artifact(&self.settings.search_dir, &self.settings.watch)
            .await
            .map_err(|source| StageError::ArtifactTimeout {
                source,
                trigger: outcome.diagnostic(),
            })?;
        info!("Local backup created: {}", artifact.path.display());

        enter(states, RunState::Uploading);
        let transfer = self
            .transporter
            .send(&artifact.path, &self.settings.destination)
            .await;
        if !transfer.success {
            return Err(StageError::Transfer {
                method: self.transporter.method(),
                result: transfer,
            });
        }

        enter(states, RunState::CleaningUp);
        match self.fs.remove(&artifact.path) {
            Ok(()) => info!("Local backup file deleted."),
            // the archive is already offsite; a leftover copy is only a disk-space problem
            Err(e) => warn!(
                "[WARN] Failed to delete local backup file {}: {}",
                artifact.path.display(),
                e
            ),
        }

        Ok(format!(
            "Backup successfully uploaded to {}",
            self.settings.destination.host
        ))
    }

    /// Only strict mode turns a trigger problem into a failed run
    fn assess_trigger(&self, outcome: &ApiOutcome) -> std::result::Result<(), StageError> {
        match outcome {
            ApiOutcome::ApiResult(result) if result.status => {
                info!("{}", outcome.describe());
            }
            ApiOutcome::ApiResult(result) => {
                if self.settings.strict_status {
                    return Err(StageError::TriggerRejected {
                        errors: result.error_summary(),
                        diagnostic: outcome.diagnostic(),
                    });
                }
                warn!("[WARN] {}", outcome.describe());
                warn!("However, attempting to monitor for backup file anyway...");
            }
            _ => {
                warn!("[WARN] Backup request failed: {}", outcome.describe());
                warn!("The job may have started regardless, monitoring for backup file anyway...");
            }
        }
        Ok(())
    }
}

fn enter(states: &mut Vec<RunState>, state: RunState) {
    debug!(%state, "Entering state");
    states.push(state);
}
