//! `~/.restock/config.yaml`: document store credentials, report recipient,
//! SMTP relay and the public page bind address.
//!
//! Secrets may be supplied through the environment instead of the file:
//!
//! | variable                   | overrides               |
//! |----------------------------|-------------------------|
//! | `RESTOCK_REPORT_RECIPIENT` | `report.recipient`      |
//! | `RESTOCK_SMTP_PASSWORD`    | `smtp.password`         |
//! | `FIRESTORE_EMULATOR_HOST`  | `document_store.emulator_host` |

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{FixedOffset, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::registry::restock_root;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub document_store: DocumentStoreConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp: Option<SmtpConfig>,
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStoreConfig {
    pub project_id: String,
    #[serde(default = "default_database")]
    pub database: String,
    /// Service-account key JSON downloaded from the cloud console.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_path: Option<PathBuf>,
    /// `host:port` of a local emulator; disables authentication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emulator_host: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(default = "default_from")]
    pub from: String,
    /// Offset of the reporting day boundary from UTC, in hours.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Local time (`HH:MM`) the daemon sends the daily report.
    #[serde(default = "default_daily_at")]
    pub daily_at: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            recipient: None,
            from: default_from(),
            utc_offset_hours: default_utc_offset_hours(),
            cache_ttl_secs: default_cache_ttl_secs(),
            daily_at: default_daily_at(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        WebConfig {
            bind: default_bind(),
        }
    }
}

fn default_database() -> String {
    "(default)".to_string()
}
fn default_from() -> String {
    "restock@localhost".to_string()
}
fn default_utc_offset_hours() -> i32 {
    9
}
fn default_cache_ttl_secs() -> u64 {
    3600
}
fn default_daily_at() -> String {
    "18:00".to_string()
}
fn default_smtp_port() -> u16 {
    587
}
fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Config {
    /// A starter config written by `restock init`.
    pub fn template(project_id: &str) -> Self {
        Config {
            document_store: DocumentStoreConfig {
                project_id: project_id.to_string(),
                database: default_database(),
                credentials_path: None,
                emulator_host: None,
            },
            report: ReportConfig::default(),
            smtp: None,
            web: WebConfig::default(),
        }
    }

    /// Apply environment overrides. `lookup` is `std::env::var(..).ok()` in
    /// production and a fixed map in tests.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(recipient) = lookup("RESTOCK_REPORT_RECIPIENT") {
            self.report.recipient = Some(recipient);
        }
        if let Some(host) = lookup("FIRESTORE_EMULATOR_HOST") {
            self.document_store.emulator_host = Some(host);
        }
        if let (Some(password), Some(smtp)) = (lookup("RESTOCK_SMTP_PASSWORD"), self.smtp.as_mut())
        {
            smtp.password = Some(password);
        }
    }

    pub fn recipient(&self) -> Result<&str, ConfigError> {
        self.report
            .recipient
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .ok_or(ConfigError::Missing("report.recipient"))
    }

    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        let hours = self.report.utc_offset_hours;
        hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ConfigError::Invalid {
                field: "report.utc_offset_hours",
                reason: format!("{hours} is not a valid UTC offset"),
            })
    }

    pub fn daily_at(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::parse_from_str(&self.report.daily_at, "%H:%M").map_err(|e| {
            ConfigError::Invalid {
                field: "report.daily_at",
                reason: e.to_string(),
            }
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.report.cache_ttl_secs)
    }
}

// ---------------------------------------------------------------------------
// Load / write
// ---------------------------------------------------------------------------

/// `<home>/.restock/config.yaml`: pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    restock_root(home).join("config.yaml")
}

/// Load the config file and apply environment overrides.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    let mut config = read_at(home)?;
    config.apply_env(|key| std::env::var(key).ok());
    Ok(config)
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, ConfigError> {
    load_at(&home()?)
}

/// Load the config file as written, without environment overrides.
pub fn read_at(home: &Path) -> Result<Config, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Err(ConfigError::NotFound { path });
    }
    let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
}

/// Write `config` unless a config file already exists. Returns `true` if a
/// file was written.
pub fn write_if_absent_at(home: &Path, config: &Config) -> Result<bool, ConfigError> {
    let path = config_path_at(home);
    if path.exists() {
        return Ok(false);
    }
    let io = |source| ConfigError::Io {
        path: path.clone(),
        source,
    };
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(io)?;
    }
    let yaml = serde_yaml::to_string(config).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;
    std::fs::write(&path, yaml).map_err(io)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).map_err(io)?;
    }
    Ok(true)
}

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}
