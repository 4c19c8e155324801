//! Operator report formatting.

use crate::executor::RunResult;
use base64::Engine;
use chrono::{DateTime, TimeZone};

/// Fixed facts about the run printed in every report
#[derive(Debug, Clone)]
pub struct ReportContext {
    /// Control panel the backup was requested from
    pub server: String,

    /// `user@host:remote_dir` of the offsite store
    pub destination: String,

    /// Machine this runner executes on
    pub runner: String,
}

impl ReportContext {
    pub fn new(server: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            destination: destination.into(),
            runner: hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

pub fn status_label(success: bool) -> &'static str {
    if success {
        "SUCCESS ✅"
    } else {
        "FAILED ❌"
    }
}

/// Build subject and plain-text body for a run result
pub fn compose<Tz>(result: &RunResult, ctx: &ReportContext, at: &DateTime<Tz>) -> Message
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let status = status_label(result.success);
    let subject = format!("[cPanel Backup] {} - {}", status, at.format("%Y-%m-%d %H:%M:%S"));

    let detail = if result.success {
        result.detail.clone()
    } else {
        format!(
            "{}\n\nDebug Info:\n{}",
            result.detail,
            result.diagnostic.as_deref().unwrap_or("N/A")
        )
    };

    let mut body = String::new();
    body.push_str("cPanel Full Backup Notification\n");
    body.push_str("================================\n\n");
    body.push_str(&format!("Status  : {}\n", status));
    body.push_str(&format!("Server  : {}\n", ctx.server));
    body.push_str(&format!("SCP Dest: {}\n", ctx.destination));
    body.push_str(&format!("Runner  : {}\n", ctx.runner));
    body.push_str(&format!("Time    : {}\n\n", at.format("%Y-%m-%d %H:%M:%S %Z")));
    body.push_str(&format!("Detail  : {}\n", detail));

    Message { subject, body }
}

/// RFC 2047 encoded-word for non-ASCII header values
pub fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!(
            "=?UTF-8?B?{}?=",
            base64::engine::general_purpose::STANDARD.encode(value.as_bytes())
        )
    }
}
