//! Configuration management for the backup runner.
//!
//! Loads configuration from an optional TOML file with environment variable
//! overrides (`CPANEL_BACKUP_<SECTION>__<KEY>`). Every section falls back to
//! built-in defaults, so a partial file is enough.

use crate::utils::errors::{BackupError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "CPANEL_BACKUP";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub transfer: TransferConfig,
    pub watch: WatchConfig,
    pub notify: NotifyConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// cPanel server hostname
    pub host: String,

    /// 2083 = HTTPS, 2082 = HTTP
    pub port: u16,

    /// cPanel account name
    pub user: String,

    /// API token (Manage API Tokens in cPanel)
    pub token: String,

    pub scheme: String,

    /// UAPI module and function that start the backup
    pub module: String,
    pub function: String,

    pub timeout_secs: u64,

    /// Only for self-signed panel certificates
    pub accept_invalid_certs: bool,

    /// Treat a job-reported failure from the trigger call as fatal
    pub strict_status: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMethod {
    /// Native SFTP client
    Sftp,
    /// External curl process
    Curl,
}

impl std::fmt::Display for TransferMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferMethod::Sftp => write!(f, "SFTP"),
            TransferMethod::Curl => write!(f, "cURL"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    pub method: TransferMethod,

    /// URL scheme used to build the remote location
    pub protocol: String,

    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,

    /// Remote directory path (created if missing)
    pub remote_dir: String,

    pub connect_timeout_secs: u64,

    /// curl binary used by the `curl` method
    pub curl_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Directory the control panel writes the archive into
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_dir: Option<PathBuf>,

    /// File name glob with a single `*`
    pub pattern: String,

    pub poll_interval_secs: u64,
    pub overall_timeout_secs: u64,
    pub recency_window_secs: u64,
    pub extra_write_allowance_secs: u64,
    pub stability_checks: u32,
    pub min_size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Operator address, also passed to the control panel
    pub address: String,

    pub enabled: bool,

    pub sendmail_path: PathBuf,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    /// Limit on one sendmail invocation
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 2083,
            user: String::new(),
            token: String::new(),
            scheme: "https".to_string(),
            module: "Backup".to_string(),
            function: "fullbackup_to_homedir".to_string(),
            timeout_secs: 60,
            accept_invalid_certs: false,
            strict_status: false,
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            method: TransferMethod::Sftp,
            protocol: "sftp".to_string(),
            host: String::new(),
            port: 22,
            username: String::new(),
            password: String::new(),
            remote_dir: "/backups/cpanel".to_string(),
            connect_timeout_secs: 30,
            curl_path: PathBuf::from("curl"),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            search_dir: None,
            pattern: "backup-*.tar.gz".to_string(),
            poll_interval_secs: 5,
            overall_timeout_secs: 600,
            recency_window_secs: 120,
            extra_write_allowance_secs: 300,
            stability_checks: 6,
            min_size_bytes: 1024 * 1024, // 1MB
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            enabled: true,
            sendmail_path: PathBuf::from("/usr/sbin/sendmail"),
            from: None,
            timeout_secs: 60,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from defaults, an optional TOML file, `.env` and
    /// the process environment (in that order, later wins).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            if !path.exists() {
                return Err(BackupError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            builder = builder
                .add_source(::config::File::from(path).format(::config::FileFormat::Toml));
        }

        let config: Config = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Parse configuration from a TOML string (no environment layering)
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = ::config::Config::builder()
            .add_source(::config::File::from_str(content, ::config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Render a configuration as TOML (used for `--print-default-config`)
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| BackupError::Config(e.to_string()))
    }

    /// Reject configurations the runner cannot act on
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("api.host", &self.api.host),
            ("api.user", &self.api.user),
            ("api.token", &self.api.token),
            ("transfer.host", &self.transfer.host),
            ("transfer.username", &self.transfer.username),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(BackupError::Config(format!("{} must be set", key)));
            }
        }

        if self.notify.enabled && self.notify.address.trim().is_empty() {
            return Err(BackupError::Config(
                "notify.address must be set when notifications are enabled".to_string(),
            ));
        }
        if self.watch.stability_checks == 0 {
            return Err(BackupError::Config(
                "watch.stability_checks must be at least 1".to_string(),
            ));
        }
        if self.watch.poll_interval_secs == 0 {
            return Err(BackupError::Config(
                "watch.poll_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.watch.pattern.matches('*').count() != 1 {
            return Err(BackupError::Config(format!(
                "watch.pattern must contain exactly one '*': {}",
                self.watch.pattern
            )));
        }
        if self.transfer.method == TransferMethod::Sftp && self.transfer.protocol != "sftp" {
            return Err(BackupError::Config(format!(
                "transfer.method = sftp cannot push over '{}'",
                self.transfer.protocol
            )));
        }

        Ok(())
    }

    /// Directory polled for the backup archive
    pub fn search_dir(&self) -> PathBuf {
        if let Some(dir) = &self.watch.search_dir {
            return dir.clone();
        }
        std::env::var_os("HOME")
            .filter(|home| !home.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("/home/{}", self.api.user)))
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn valid_toml() -> &'static str {
        r#"
[api]
host = "cpanel.example.com"
user = "acme"
token = "TOKEN123"

[transfer]
host = "storage.example.com"
username = "remote_user"
password = "remote_password"

[notify]
address = "admin@example.com"
"#
    }

    #[test]
    fn test_defaults_match_runner_constants() {
        let config = Config::default();
        assert_eq!(config.api.port, 2083);
        assert_eq!(config.api.function, "fullbackup_to_homedir");
        assert_eq!(config.transfer.port, 22);
        assert_eq!(config.transfer.method, TransferMethod::Sftp);
        assert_eq!(config.watch.pattern, "backup-*.tar.gz");
        assert_eq!(config.watch.poll_interval_secs, 5);
        assert_eq!(config.watch.overall_timeout_secs, 600);
        assert_eq!(config.watch.recency_window_secs, 120);
        assert_eq!(config.watch.extra_write_allowance_secs, 300);
        assert_eq!(config.notify.timeout_secs, 60);
        assert_eq!(config.watch.stability_checks, 6);
        assert_eq!(config.watch.min_size_bytes, 1_048_576);
        assert!(!config.api.strict_status);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(valid_toml()).unwrap();
        assert_eq!(config.api.host, "cpanel.example.com");
        assert_eq!(config.api.port, 2083);
        assert_eq!(config.transfer.remote_dir, "/backups/cpanel");
        assert_eq!(config.log.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(valid_toml().as_bytes()).unwrap();
        file.write_all(b"\n[watch]\nstability_checks = 3\nsearch_dir = \"/home/acme\"\n")
            .unwrap();
        file.flush().unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.watch.stability_checks, 3);
        assert_eq!(config.search_dir(), PathBuf::from("/home/acme"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = Config::load(Some(Path::new("/nonexistent/cpanel-backup.toml"))).unwrap_err();
        assert!(matches!(err, BackupError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_missing_token() {
        let mut config = Config::from_toml(valid_toml()).unwrap();
        config.api.token = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("api.token"));
    }

    #[test]
    fn test_validate_rejects_bad_pattern() {
        let mut config = Config::from_toml(valid_toml()).unwrap();
        config.watch.pattern = "backup.tar.gz".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_sftp_over_ftp() {
        let mut config = Config::from_toml(valid_toml()).unwrap();
        config.transfer.protocol = "ftp".to_string();
        assert!(config.validate().is_err());

        config.transfer.method = TransferMethod::Curl;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_disabled_notifications_need_no_address() {
        let mut config = Config::from_toml(valid_toml()).unwrap();
        config.notify.address = String::new();
        assert!(config.validate().is_err());

        config.notify.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_renders_as_toml() {
        let rendered = Config::default().to_toml().unwrap();
        assert!(rendered.contains("[watch]"));
        assert!(rendered.contains("pattern = \"backup-*.tar.gz\""));
        assert!(rendered.contains("method = \"sftp\""));

        let reparsed = Config::from_toml(&rendered).unwrap();
        assert_eq!(reparsed.watch.stability_checks, 6);
    }
}
