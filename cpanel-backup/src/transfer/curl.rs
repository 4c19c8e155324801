//! Upload through an external `curl` process.
//!
//! Useful where libssh2 is unavailable or the destination speaks FTP/FTPS;
//! curl's `--ftp-create-dirs` also creates missing SFTP directories.

use super::{file_name_of, Destination, TransferResult, Transporter};
use crate::config::TransferMethod;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{error, info};

pub struct CurlTransporter {
    program: PathBuf,
}

impl CurlTransporter {
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }
}

#[async_trait]
impl Transporter for CurlTransporter {
    fn method(&self) -> TransferMethod {
        TransferMethod::Curl
    }

    async fn send(&self, local_path: &Path, destination: &Destination) -> TransferResult {
        let remote_url = destination.remote_url(&file_name_of(local_path));
        info!("Uploading to {} via cURL...", remote_url);

        // -k skips host key checks, matching the panel's own SCP destination behaviour
        let output = Command::new(&self.program)
            .arg("-sS")
            .arg("-k")
            .arg("--ftp-create-dirs")
            .arg("-u")
            .arg(format!("{}:{}", destination.username, destination.password))
            .arg("-T")
            .arg(local_path)
            .arg(&remote_url)
            .stdin(Stdio::null())
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                error!("Failed to start {}: {}", self.program.display(), e);
                return TransferResult::failed(
                    None,
                    format!("failed to start {}: {}", self.program.display(), e),
                );
            }
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        let exit_code = output.status.code();

        if output.status.success() {
            info!("[SUCCESS] Upload complete.");
            TransferResult::succeeded(exit_code, combined)
        } else {
            let result = TransferResult::failed(exit_code, combined);
            error!(
                "cURL Upload Failed (Exit Code: {}):\n{}",
                result.exit_code_label(),
                result.diagnostic_output
            );
            result
        }
    }
}
