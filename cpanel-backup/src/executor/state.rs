//! Run states and the single result of a run.

use crate::utils::errors::Result;
use serde::Serialize;

/// Pipeline states, visited in this order on the success path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Triggering,
    WaitingForArtifact,
    Uploading,
    CleaningUp,
    Notifying,
    Done,
    Failed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunState::Triggering => "triggering",
            RunState::WaitingForArtifact => "waiting_for_artifact",
            RunState::Uploading => "uploading",
            RunState::CleaningUp => "cleaning_up",
            RunState::Notifying => "notifying",
            RunState::Done => "done",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of a full run; drives the notification and the exit code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    pub success: bool,

    /// Success message or error description
    pub detail: String,

    /// Raw API response, transfer output or timeout description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl RunResult {
    pub fn success(detail: impl Into<String>) -> Self {
        Self {
            success: true,
            detail: detail.into(),
            diagnostic: None,
        }
    }

    pub fn failure(detail: impl Into<String>, diagnostic: Option<String>) -> Self {
        Self {
            success: false,
            detail: detail.into(),
            diagnostic,
        }
    }

    /// Process exit status for this result
    pub fn exit_code(&self) -> u8 {
        if self.success {
            0
        } else {
            1
        }
    }
}

/// Result plus the states the run passed through
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub result: RunResult,
    pub states: Vec<RunState>,
}

impl RunReport {
    pub fn visited(&self, state: RunState) -> bool {
        self.states.contains(&state)
    }

    pub fn final_state(&self) -> Option<RunState> {
        self.states.last().copied()
    }

    /// Single-line JSON summary for the log
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
