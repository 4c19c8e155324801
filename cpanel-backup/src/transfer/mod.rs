//! Offsite transfer of the finished archive.
//!
//! A [`Transporter`] never fails with `Err`; whatever happens is reported in
//! a [`TransferResult`] carrying the exit status and captured output.

pub mod curl;
pub mod sftp;

pub use curl::CurlTransporter;
pub use sftp::SftpTransporter;

use crate::config::{TransferConfig, TransferMethod};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Where the archive goes
#[derive(Clone)]
pub struct Destination {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub remote_dir: String,
}

impl std::fmt::Debug for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Destination")
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("remote_dir", &self.remote_dir)
            .finish()
    }
}

impl Destination {
    pub fn from_config(config: &TransferConfig) -> Self {
        Self {
            protocol: config.protocol.clone(),
            host: config.host.clone(),
            port: config.port,
            username: config.username.clone(),
            password: config.password.clone(),
            remote_dir: config.remote_dir.clone(),
        }
    }

    /// Absolute remote path for a file name
    pub fn remote_path(&self, file_name: &str) -> String {
        let dir = self.remote_dir.trim_matches('/');
        if dir.is_empty() {
            format!("/{}", file_name)
        } else {
            format!("/{}/{}", dir, file_name)
        }
    }

    /// `protocol://host:port/remote_dir/file_name`
    pub fn remote_url(&self, file_name: &str) -> String {
        format!(
            "{}://{}:{}{}",
            self.protocol,
            self.host,
            self.port,
            self.remote_path(file_name)
        )
    }

    /// `user@host:remote_dir`, for reports
    pub fn identity(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.remote_dir)
    }
}

/// Outcome of one transfer attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    pub success: bool,

    /// Exit status of the transfer process; `None` for in-process clients
    pub exit_code: Option<i32>,

    /// Combined client output, verbatim
    pub diagnostic_output: String,
}

impl TransferResult {
    pub fn succeeded(exit_code: Option<i32>, diagnostic_output: impl Into<String>) -> Self {
        Self {
            success: true,
            exit_code,
            diagnostic_output: diagnostic_output.into(),
        }
    }

    pub fn failed(exit_code: Option<i32>, diagnostic_output: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code,
            diagnostic_output: diagnostic_output.into(),
        }
    }

    pub fn exit_code_label(&self) -> String {
        self.exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "n/a".to_string())
    }
}

#[async_trait]
pub trait Transporter: Send + Sync {
    fn method(&self) -> TransferMethod;

    /// Push `local_path` to `destination`, creating remote directories as needed.
    /// Single attempt, no retries.
    async fn send(&self, local_path: &Path, destination: &Destination) -> TransferResult;
}

/// Build the transporter selected by `transfer.method`
pub fn build_transporter(config: &TransferConfig) -> Arc<dyn Transporter> {
    match config.method {
        TransferMethod::Sftp => Arc::new(SftpTransporter::new(Duration::from_secs(
            config.connect_timeout_secs,
        ))),
        TransferMethod::Curl => Arc::new(CurlTransporter::new(config.curl_path.clone())),
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
