//! Control-panel API access.
//!
//! The orchestrator talks to the panel only through [`ControlPanel`], whose
//! single call never fails with `Err`: every failure is folded into an
//! [`ApiOutcome`] before it crosses this boundary.

pub mod client;
pub mod outcome;

pub use client::CpanelClient;
pub use outcome::{ApiOutcome, ApiResult};

use async_trait::async_trait;
use std::time::Duration;

/// Input to one trigger call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRequest {
    /// Address the panel mails its own completion report to
    pub notify_address: String,
}

impl BackupRequest {
    pub fn new(notify_address: impl Into<String>) -> Self {
        Self {
            notify_address: notify_address.into(),
        }
    }
}

#[async_trait]
pub trait ControlPanel: Send + Sync {
    /// Ask the panel to start a full backup into the account's home directory
    async fn trigger(&self, request: &BackupRequest, timeout: Duration) -> ApiOutcome;
}
