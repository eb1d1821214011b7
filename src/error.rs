//! Typed errors the binary has to tell apart (exit codes) + exit_code() mapping.
//!
//! Всё остальное идёт через anyhow с контекстом; сюда попадают только
//! условия, на которые смотрит main():
//! - ConfigError    - exit 1, до любого обращения к хостам
//! - ExecError      - упавшая внешняя команда (send/receive/list), код + stderr
//! - TransferFailed - отправка тома; только она отдаёт код команды наружу
//! - NamespaceError - идентификатор вне настроенного корня
//!
//! Inventory failures carry an ExecError too but still exit 1.

use std::path::PathBuf;

use thiserror::Error;

/// Required configuration keys, in the order they are reported.
pub const REQUIRED_KEYS: [&str; 3] = ["main_fsname", "backup_fsname", "backup_hostname"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "config file {} not found: must provide a config file with three keys: main_fsname, backup_fsname, and backup_hostname",
        .0.display()
    )]
    NotFound(PathBuf),

    #[error("read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON file not formatted correctly ({}): {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON file not formatted correctly ({}): top-level value must be an object", .0.display())]
    NotAnObject(PathBuf),

    #[error(
        "one or more of the required keys not present in {}: missing {}; required keys: main_fsname, backup_fsname, and backup_hostname",
        .path.display(),
        .missing.join(", ")
    )]
    MissingKeys {
        path: PathBuf,
        missing: Vec<&'static str>,
    },

    #[error("key '{key}' in {} must not be empty", .path.display())]
    EmptyValue { path: PathBuf, key: &'static str },
}

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The command ran and reported failure. `code` is None when it was killed by a signal.
    #[error("'{command}' failed ({}){}", fmt_code(.code), fmt_stderr(.stderr))]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

impl ExecError {
    /// Exit code to propagate from the process (never 0).
    pub fn exit_code(&self) -> i32 {
        match self {
            ExecError::Failed { code: Some(c), .. } if *c != 0 => *c,
            _ => 1,
        }
    }
}

/// Context attached to a failed `send | receive` pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("transfer {volume} ({command})")]
pub struct TransferFailed {
    pub volume: String,
    pub command: String,
    /// Exit code of the side that failed (never 0).
    pub code: i32,
}

impl TransferFailed {
    /// Wrap a pipeline error; the code is taken from the ExecError in its chain, 1 otherwise.
    pub fn attach(err: anyhow::Error, volume: &str, command: &str) -> anyhow::Error {
        let code = err
            .chain()
            .find_map(|c| c.downcast_ref::<ExecError>())
            .map(ExecError::exit_code)
            .unwrap_or(1);
        err.context(TransferFailed {
            volume: volume.to_string(),
            command: command.to_string(),
            code,
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NamespaceError {
    #[error("'{id}' is outside namespace root '{root}'")]
    OutsideRoot { id: String, root: String },
}

fn fmt_code(code: &Option<i32>) -> String {
    match *code {
        Some(c) => format!("exit status {c}"),
        None => "killed by signal".to_string(),
    }
}

fn fmt_stderr(stderr: &str) -> String {
    let s = stderr.trim();
    if s.is_empty() {
        String::new()
    } else {
        format!(": {s}")
    }
}

/// Map an error to the process exit code.
///
/// A failed transfer gives the failing command's code; everything else
/// (config, inventory, lock, I/O) gives 1.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<TransferFailed>() {
        Some(t) => t.code,
        None => 1,
    }
}
