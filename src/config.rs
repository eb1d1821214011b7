//! Replication configuration (JSON file) + fluent overrides.
//!
//! File format (all values are strings):
//! {
//!   "main_fsname":     "tank",            // required: primary pool/root
//!   "backup_fsname":   "pool2",           // required: backup pool/root
//!   "backup_hostname": "backup.lan",      // required: ssh destination
//!   "weekly_tag":      "zfs-auto-snap_weekly",  // optional
//!   "commands_log":    "commands_output.txt",   // optional
//!   "zfs_bin":         "zfs",             // optional
//!   "ssh_bin":         "ssh"              // optional
//! }
//!
//! ENV:
//!   SNAPMIRROR_CONFIG: config path used when --config is not given (default ./config.json)
//!
//! The loaded config is immutable for the run; every component receives it by reference.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, REQUIRED_KEYS};

pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const DEFAULT_WEEKLY_TAG: &str = "zfs-auto-snap_weekly";
pub const DEFAULT_COMMANDS_LOG: &str = "commands_output.txt";
pub const CONFIG_ENV: &str = "SNAPMIRROR_CONFIG";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationConfig {
    /// Root of the primary namespace (pool name on the local host).
    pub main_fsname: String,

    /// Root of the backup namespace on the remote host.
    pub backup_fsname: String,

    /// ssh destination of the backup host.
    pub backup_hostname: String,

    /// Tag prefix of the weekly snapshots (date suffix is ignored).
    #[serde(default = "default_weekly_tag")]
    pub weekly_tag: String,

    /// Audit log: one issued command per line, truncated every run.
    #[serde(default = "default_commands_log")]
    pub commands_log: PathBuf,

    #[serde(default = "default_zfs_bin")]
    pub zfs_bin: String,

    #[serde(default = "default_ssh_bin")]
    pub ssh_bin: String,
}

fn default_weekly_tag() -> String {
    DEFAULT_WEEKLY_TAG.to_string()
}

fn default_commands_log() -> PathBuf {
    PathBuf::from(DEFAULT_COMMANDS_LOG)
}

fn default_zfs_bin() -> String {
    "zfs".to_string()
}

fn default_ssh_bin() -> String {
    "ssh".to_string()
}

impl ReplicationConfig {
    /// Config with the three required values and defaults for the rest.
    pub fn new<S: Into<String>>(main_fsname: S, backup_fsname: S, backup_hostname: S) -> Self {
        Self {
            main_fsname: main_fsname.into(),
            backup_fsname: backup_fsname.into(),
            backup_hostname: backup_hostname.into(),
            weekly_tag: default_weekly_tag(),
            commands_log: default_commands_log(),
            zfs_bin: default_zfs_bin(),
            ssh_bin: default_ssh_bin(),
        }
    }

    /// Path from the CLI flag, else $SNAPMIRROR_CONFIG, else ./config.json.
    pub fn resolve_path(flag: Option<PathBuf>) -> PathBuf {
        if let Some(p) = flag {
            return p;
        }
        if let Ok(v) = std::env::var(CONFIG_ENV) {
            let s = v.trim();
            if !s.is_empty() {
                return PathBuf::from(s);
            }
        }
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    /// Load and validate the config file.
    ///
    /// Each failure is a distinct [`ConfigError`]: missing file, unreadable file,
    /// bad JSON (or wrong value types), missing required keys, empty required values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.to_path_buf()))
            }
            Err(e) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };
        let cfg = Self::from_json_str(&text, path)?;
        debug!("config: loaded {} -> {}", path.display(), cfg);
        Ok(cfg)
    }

    /// Parse a config document; `origin` is only used in diagnostics.
    pub fn from_json_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        // Сначала как Value: отсутствующие ключи должны давать свою диагностику,
        // а не общую ошибку serde "missing field".
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| ConfigError::Malformed {
                path: origin.to_path_buf(),
                source: e,
            })?;
        let obj = value
            .as_object()
            .ok_or_else(|| ConfigError::NotAnObject(origin.to_path_buf()))?;

        let missing: Vec<&'static str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|k| !obj.contains_key(*k))
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingKeys {
                path: origin.to_path_buf(),
                missing,
            });
        }

        let cfg: ReplicationConfig =
            serde_json::from_value(value).map_err(|e| ConfigError::Malformed {
                path: origin.to_path_buf(),
                source: e,
            })?;

        for (key, v) in [
            ("main_fsname", &cfg.main_fsname),
            ("backup_fsname", &cfg.backup_fsname),
            ("backup_hostname", &cfg.backup_hostname),
        ] {
            if v.trim().is_empty() {
                return Err(ConfigError::EmptyValue {
                    path: origin.to_path_buf(),
                    key,
                });
            }
        }
        Ok(cfg)
    }

    pub fn with_weekly_tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.weekly_tag = tag.into();
        self
    }

    pub fn with_commands_log<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.commands_log = path.into();
        self
    }

    pub fn with_zfs_bin<S: Into<String>>(mut self, bin: S) -> Self {
        self.zfs_bin = bin.into();
        self
    }

    pub fn with_ssh_bin<S: Into<String>>(mut self, bin: S) -> Self {
        self.ssh_bin = bin.into();
        self
    }
}

impl fmt::Display for ReplicationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ReplicationConfig {{ \
             main_fsname: {}, \
             backup_fsname: {}, \
             backup_hostname: {}, \
             weekly_tag: {}, \
             commands_log: {}, \
             zfs_bin: {}, \
             ssh_bin: {} \
             }}",
            self.main_fsname,
            self.backup_fsname,
            self.backup_hostname,
            self.weekly_tag,
            self.commands_log.display(),
            self.zfs_bin,
            self.ssh_bin,
        )
    }
}
