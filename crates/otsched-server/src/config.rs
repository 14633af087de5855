use std::path::PathBuf;

use otsched_core::RosterSeed;
use otsched_engine::{SchedulerSettings, ScoringPolicy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    /// Interruptibility scoring used when an emergency has to preempt
    #[serde(default)]
    pub preemption: ScoringPolicy,
    /// Roster created when the storage backend is empty
    #[serde(default)]
    pub roster: RosterSeed,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        // Storage validation
        if self.storage.backend == StorageBackend::File
            && self.storage.path.as_os_str().is_empty()
        {
            return Err("storage.path is required for the file backend".into());
        }
        self.scheduler.validate()?;
        self.preemption.validate()?;
        self.roster
            .validate()
            .map_err(|e| format!("roster: {e}"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Roster lives in process memory and is lost on restart
    #[default]
    Memory,
    /// Roster is kept in a JSON file
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Roster file for the file backend
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}
fn default_storage_path() -> PathBuf {
    PathBuf::from("data/roster.json")
}
impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::{Path, PathBuf};

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or("otsched.toml"));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., OTSCHED__SCHEDULER__MAX_RETRIES=5
        builder = builder.add_source(
            Environment::with_prefix("OTSCHED")
                .prefix_separator("__")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }

    pub fn load_config_with_default_path<P: AsRef<Path>>(
        path: Option<P>,
    ) -> Result<AppConfig, String> {
        let p = path
            .as_ref()
            .map(|p| p.as_ref().to_string_lossy().to_string());
        load_config(p.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.storage.backend, StorageBackend::Memory);
        assert_eq!(cfg.scheduler.sweep_interval_secs, 10);
        assert_eq!(cfg.roster.theatres, 10);
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let mut cfg = AppConfig::default();
        cfg.logging.level = "verbose".into();
        assert!(cfg.validate().unwrap_err().contains("logging.level"));
    }

    #[test]
    fn test_rejects_single_theatre_roster() {
        let mut cfg = AppConfig::default();
        cfg.roster.theatres = 1;
        assert!(cfg.validate().unwrap_err().starts_with("roster:"));
    }

    #[test]
    fn test_file_backend_needs_path() {
        let mut cfg = AppConfig::default();
        cfg.storage.backend = StorageBackend::File;
        cfg.storage.path = PathBuf::new();
        assert!(cfg.validate().is_err());
    }
}
