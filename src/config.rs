use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::constants;
use crate::idle::IdleSourceKind;

/// Monitor settings, read from TOML with env var overrides.
/// The file is never written; `print-config` shows the effective values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Idle seconds after which new input counts as an intrusion
    pub idle_timeout_secs: f64,
    /// Seconds before the timeout at which the warning appears
    pub warning_lead_secs: f64,
    /// How long to wait for the dialog's token after activity during a warning
    pub ack_grace_ms: u64,
    /// Upper bound on waiting for the photo after locking
    pub photo_wait_secs: u64,
    pub startup_delay_secs: u64,
    pub poll_interval_ms: u64,
    pub idle_source: IdleSourceKind,
    /// Program and arguments run to lock the session
    pub lock_command: Vec<String>,
    /// Program and arguments for the camera; the photo path is appended
    pub photo_command: Vec<String>,
    /// Defaults to `idle-trap-photos` under the working directory
    pub photo_dir: Option<PathBuf>,
    /// Verbosity for idle-trap's own logs: error, warn, info, debug or trace
    pub log_level: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 60.0,
            warning_lead_secs: 5.0,
            ack_grace_ms: 1500,
            photo_wait_secs: 3,
            startup_delay_secs: 5,
            poll_interval_ms: 1000,
            idle_source: IdleSourceKind::Auto,
            lock_command: default_lock_command(),
            photo_command: default_photo_command(),
            photo_dir: None,
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(target_os = "macos")]
fn default_lock_command() -> Vec<String> {
    vec![
        "osascript".to_string(),
        "-e".to_string(),
        r#"tell application "System Events" to keystroke "q" using {control down, command down}"#.to_string(),
    ]
}

#[cfg(not(target_os = "macos"))]
fn default_lock_command() -> Vec<String> {
    vec!["loginctl".to_string(), "lock-session".to_string()]
}

#[cfg(target_os = "macos")]
fn default_photo_command() -> Vec<String> {
    vec!["imagesnap".to_string()]
}

#[cfg(not(target_os = "macos"))]
fn default_photo_command() -> Vec<String> {
    vec!["fswebcam".to_string(), "--no-banner".to_string()]
}

impl MonitorConfig {
    pub fn config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(constants::config::APP_DIR);
        path.push(constants::config::FILENAME);
        path
    }

    /// Load from the config file if present, then apply env overrides and clamp
    pub fn load() -> Self {
        let config_path = Self::config_path();
        let mut config = match Self::read_file(&config_path) {
            Ok(Some(config)) => {
                info!(path = %config_path.display(), "Loaded config file");
                config
            }
            Ok(None) => {
                info!(path = %config_path.display(), "No config file found, using defaults");
                Self::default()
            }
            Err(e) => {
                error!(path = %config_path.display(), error = %e, "Failed to parse config file, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides();
        config.validate_and_clamp();
        config
    }

    /// Log level from the config file and env, read before logging is set up
    pub fn configured_log_level() -> String {
        let mut config = Self::read_file(&Self::config_path())
            .ok()
            .flatten()
            .unwrap_or_default();
        config.apply_env_overrides();
        config.validate_and_clamp();
        config.log_level
    }

    fn read_file(path: &Path) -> Result<Option<Self>> {
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents).map(Some),
            Err(_) => Ok(None),
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("invalid idle-trap config")
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize config")
    }

    pub fn ack_grace(&self) -> Duration {
        Duration::from_millis(self.ack_grace_ms)
    }

    pub fn photo_wait(&self) -> Duration {
        Duration::from_secs(self.photo_wait_secs)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn photo_dir(&self) -> PathBuf {
        self.photo_dir.clone().unwrap_or_else(|| {
            env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(constants::monitor::PHOTO_DIR)
        })
    }

    fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, var: &str) -> Option<T>
    where
        <T as std::str::FromStr>::Err: std::fmt::Debug,
    {
        let value = lookup(var)?;
        value
            .trim()
            .parse::<T>()
            .inspect_err(|e| error!("failed to parse '{var}' err={e:?}"))
            .ok()
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|var| env::var(var).ok());
    }

    /// Apply `IDLE_TRAP_*` overrides; unparsable values are logged and ignored
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(timeout) = Self::parse_var(&lookup, "IDLE_TRAP_TIMEOUT") {
            self.idle_timeout_secs = timeout;
        }
        if let Some(lead) = Self::parse_var(&lookup, "IDLE_TRAP_LEAD") {
            self.warning_lead_secs = lead;
        }
        if let Some(source) = Self::parse_var(&lookup, "IDLE_TRAP_IDLE_SOURCE") {
            self.idle_source = source;
        }
        if let Some(dir) = lookup("IDLE_TRAP_PHOTO_DIR")
            && !dir.trim().is_empty()
        {
            self.photo_dir = Some(PathBuf::from(dir.trim()));
        }
        if let Some(level) = lookup("IDLE_TRAP_LOG_LEVEL")
            && !level.trim().is_empty()
        {
            self.log_level = level.trim().to_ascii_lowercase();
        }
    }

    /// Clamp values to sane ranges after loading or CLI overrides
    pub fn validate_and_clamp(&mut self) {
        use constants::validation::*;

        if !self.idle_timeout_secs.is_finite() || self.idle_timeout_secs < MIN_TIMEOUT_SECS {
            warn!(idle_timeout_secs = self.idle_timeout_secs, min = MIN_TIMEOUT_SECS, "idle_timeout_secs below minimum, clamping");
            self.idle_timeout_secs = MIN_TIMEOUT_SECS;
        } else if self.idle_timeout_secs > MAX_TIMEOUT_SECS {
            warn!(idle_timeout_secs = self.idle_timeout_secs, max = MAX_TIMEOUT_SECS, "idle_timeout_secs exceeds maximum, clamping");
            self.idle_timeout_secs = MAX_TIMEOUT_SECS;
        }

        if !self.warning_lead_secs.is_finite() || self.warning_lead_secs < 0.0 {
            warn!(warning_lead_secs = self.warning_lead_secs, "warning_lead_secs negative, disabling warning");
            self.warning_lead_secs = 0.0;
        } else if self.warning_lead_secs > self.idle_timeout_secs {
            warn!(warning_lead_secs = self.warning_lead_secs, max = self.idle_timeout_secs, "warning_lead_secs exceeds timeout, clamping");
            self.warning_lead_secs = self.idle_timeout_secs;
        }

        if self.ack_grace_ms > MAX_ACK_GRACE_MS {
            warn!(ack_grace_ms = self.ack_grace_ms, max = MAX_ACK_GRACE_MS, "ack_grace_ms exceeds maximum, clamping");
            self.ack_grace_ms = MAX_ACK_GRACE_MS;
        }

        self.poll_interval_ms = self.poll_interval_ms.clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS);

        if self.lock_command.is_empty() {
            warn!("lock_command is empty, using default");
            self.lock_command = default_lock_command();
        }
        if self.photo_command.is_empty() {
            warn!("photo_command is empty, using default");
            self.photo_command = default_photo_command();
        }

        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            warn!(log_level = %self.log_level, using = "info", "unknown log_level, using default");
            self.log_level = default_log_level();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = MonitorConfig::from_toml_str("").unwrap();
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = MonitorConfig::from_toml_str(
            "idle_timeout_secs = 120.0\nidle_source = \"ioreg\"\nphoto_dir = \"/tmp/shots\"\n",
        )
        .unwrap();
        assert_eq!(config.idle_timeout_secs, 120.0);
        assert_eq!(config.idle_source, IdleSourceKind::Ioreg);
        assert_eq!(config.photo_dir(), PathBuf::from("/tmp/shots"));
        assert_eq!(config.warning_lead_secs, 5.0);
        assert_eq!(config.ack_grace(), Duration::from_millis(1500));
    }

    #[test]
    fn test_invalid_file_is_error() {
        assert!(MonitorConfig::from_toml_str("idle_timeout_secs = \"soon\"").is_err());
    }

    #[test]
    fn test_serialized_defaults_parse_back() {
        let text = MonitorConfig::default().to_toml().unwrap();
        assert!(text.contains("idle_timeout_secs = 60.0"));
        assert_eq!(MonitorConfig::from_toml_str(&text).unwrap(), MonitorConfig::default());
    }

    #[test]
    fn test_clamp_lead_and_timeout() {
        let mut config = MonitorConfig {
            idle_timeout_secs: 0.0,
            warning_lead_secs: 30.0,
            poll_interval_ms: 5,
            lock_command: Vec::new(),
            ..MonitorConfig::default()
        };
        config.validate_and_clamp();
        assert_eq!(config.idle_timeout_secs, 1.0);
        assert_eq!(config.warning_lead_secs, 1.0);
        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.lock_command, default_lock_command());
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_env_overrides_applied() {
        let mut config = MonitorConfig::default();
        config.apply_overrides(vars(&[
            ("IDLE_TRAP_TIMEOUT", " 300 "),
            ("IDLE_TRAP_LEAD", "10.5"),
            ("IDLE_TRAP_IDLE_SOURCE", "IOREG"),
            ("IDLE_TRAP_PHOTO_DIR", "/var/tmp/trap"),
            ("IDLE_TRAP_LOG_LEVEL", "Debug"),
        ]));
        assert_eq!(config.idle_timeout_secs, 300.0);
        assert_eq!(config.warning_lead_secs, 10.5);
        assert_eq!(config.idle_source, IdleSourceKind::Ioreg);
        assert_eq!(config.photo_dir, Some(PathBuf::from("/var/tmp/trap")));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_env_overrides_ignore_bad_and_blank_values() {
        let mut config = MonitorConfig::default();
        config.apply_overrides(vars(&[
            ("IDLE_TRAP_TIMEOUT", "soon"),
            ("IDLE_TRAP_LEAD", ""),
            ("IDLE_TRAP_IDLE_SOURCE", "wayland"),
            ("IDLE_TRAP_PHOTO_DIR", "   "),
            ("IDLE_TRAP_LOG_LEVEL", ""),
        ]));
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn test_env_overrides_absent_keep_file_values() {
        let mut config = MonitorConfig::from_toml_str("idle_timeout_secs = 90.0\nlog_level = \"warn\"\n").unwrap();
        config.apply_overrides(vars(&[]));
        assert_eq!(config.idle_timeout_secs, 90.0);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_unknown_log_level_falls_back() {
        let mut config = MonitorConfig {
            log_level: "verbose".to_string(),
            ..MonitorConfig::default()
        };
        config.validate_and_clamp();
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_negative_lead_disables_warning() {
        let mut config = MonitorConfig {
            warning_lead_secs: -2.0,
            ..MonitorConfig::default()
        };
        config.validate_and_clamp();
        assert_eq!(config.warning_lead_secs, 0.0);
    }
}
