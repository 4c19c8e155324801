//! Operator notification at the end of every run.
//!
//! Delivery is best effort: a failed notification is logged by the caller
//! and never changes the run's outcome.

pub mod message;
pub mod sendmail;

pub use message::ReportContext;
pub use sendmail::SendmailNotifier;

use crate::config::Config;
use crate::executor::RunResult;
use crate::transfer::Destination;
use crate::utils::errors::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, result: &RunResult) -> Result<()>;
}

/// Used when mail is disabled: the result only goes to the log
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, result: &RunResult) -> Result<()> {
        if result.success {
            info!("Notification (mail disabled): {}", result.detail);
        } else {
            error!(
                "Notification (mail disabled): {}\n{}",
                result.detail,
                result.diagnostic.as_deref().unwrap_or("N/A")
            );
        }
        Ok(())
    }
}

/// Build the notifier selected by `[notify]`
pub fn build_notifier(config: &Config) -> Arc<dyn Notifier> {
    if !config.notify.enabled {
        return Arc::new(LogNotifier);
    }

    let ctx = ReportContext::new(
        config.api.host.clone(),
        Destination::from_config(&config.transfer).identity(),
    );
    let from = config
        .notify
        .from
        .clone()
        .unwrap_or_else(|| format!("cPanel Backup <no-reply@{}>", config.api.host));

    Arc::new(
        SendmailNotifier::new(
            config.notify.sendmail_path.clone(),
            config.notify.address.clone(),
            from,
            ctx,
        )
        .with_timeout(Duration::from_secs(config.notify.timeout_secs)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        assert!(LogNotifier.notify(&RunResult::success("ok")).await.is_ok());
        assert!(LogNotifier
            .notify(&RunResult::failure("boom", Some("diag".to_string())))
            .await
            .is_ok());
    }
}
