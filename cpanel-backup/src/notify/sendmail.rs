//! Mail delivery through the local MTA's `sendmail` interface.

use super::message::{compose, encode_header, ReportContext};
use super::Notifier;
use crate::executor::RunResult;
use crate::utils::errors::{BackupError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::info;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub struct SendmailNotifier {
    sendmail_path: PathBuf,
    to: String,
    from: String,
    ctx: ReportContext,
    timeout: Duration,
}

impl SendmailNotifier {
    pub fn new(sendmail_path: PathBuf, to: String, from: String, ctx: ReportContext) -> Self {
        Self {
            sendmail_path,
            to,
            from,
            ctx,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Upper bound on the whole exchange with sendmail
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full RFC 5322 message for `sendmail -t`
    pub fn render(&self, result: &RunResult) -> String {
        let message = compose(result, &self.ctx, &chrono::Local::now());
        let headers = [
            format!("To: {}", self.to),
            format!("From: {}", self.from),
            format!("Subject: {}", encode_header(&message.subject)),
            "MIME-Version: 1.0".to_string(),
            "Content-Type: text/plain; charset=UTF-8".to_string(),
            "Content-Transfer-Encoding: 8bit".to_string(),
            format!("X-Mailer: cpanel-backup/{}", env!("CARGO_PKG_VERSION")),
        ];
        format!("{}\n\n{}", headers.join("\n"), message.body)
    }
}

#[async_trait]
impl Notifier for SendmailNotifier {
    async fn notify(&self, result: &RunResult) -> Result<()> {
        let rendered = self.render(result);

        let mut child = Command::new(&self.sendmail_path)
            .args(["-t", "-i"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                BackupError::Notification(format!(
                    "failed to start {}: {}",
                    self.sendmail_path.display(),
                    e
                ))
            })?;

        let stdin = child.stdin.take();
        let exchange = async move {
            // sendmail may exit before reading everything; still reap it for its status
            let written = match stdin {
                Some(mut stdin) => match stdin.write_all(rendered.as_bytes()).await {
                    Ok(()) => stdin.shutdown().await,
                    Err(e) => Err(e),
                },
                None => Ok(()),
            };
            let output = child.wait_with_output().await?;
            Ok::<_, std::io::Error>((written, output))
        };

        let (written, output) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                BackupError::Notification(format!(
                    "{} did not finish within {:?}",
                    self.sendmail_path.display(),
                    self.timeout
                ))
            })??;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(BackupError::Notification(format!(
                "sendmail exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        if let Err(e) = written {
            return Err(BackupError::Notification(format!(
                "failed to write message to sendmail: {} {}",
                e,
                stderr.trim()
            )));
        }

        info!("Notification sent to {}", self.to);
        Ok(())
    }
}
