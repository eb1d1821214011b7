//! Transfer executor + audit log.
//!
//! Seed:        zfs send <snap> | ssh <host> zfs receive -u <target>
//! Incremental: zfs send -i <base> <snap> | ssh <host> zfs receive -u -F <target>
//!
//! -u: не монтировать принятую ФС (mountpoint бэкапа не конфликтует с основным).
//! -F: откатить цель к последнему общему снапшоту перед приёмом дельты.
//!
//! Audit log (commands_log): one rendered command per line, processing order,
//! file truncated when opened for a run. A line is written only after the
//! transfer succeeded. Failure aborts the run: no retry, no rollback of the
//! volumes already sent.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{error, info};

use crate::config::ReplicationConfig;
use crate::error::TransferFailed;
use crate::metrics::{
    record_audit_line, record_incremental_transfer, record_seed_transfer, record_transfer_failure,
};
use crate::reconcile::Action;
use crate::shell::{render, Shell};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferKind {
    Seed,
    Incremental,
}

/// One `send | ssh receive` pipeline, as argv vectors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferCommand {
    pub kind: TransferKind,
    pub volume: String,
    pub send: Vec<String>,
    pub receive: Vec<String>,
}

impl TransferCommand {
    /// Command for a transfer action; None for skips.
    pub fn for_action(cfg: &ReplicationConfig, action: &Action) -> Option<Self> {
        match action {
            Action::Seed {
                volume,
                snapshot,
                target,
            } => Some(Self {
                kind: TransferKind::Seed,
                volume: volume.clone(),
                send: vec![cfg.zfs_bin.clone(), "send".into(), snapshot.clone()],
                receive: receive_argv(cfg, target, false),
            }),
            Action::Incremental {
                volume,
                base,
                snapshot,
                target,
            } => Some(Self {
                kind: TransferKind::Incremental,
                volume: volume.clone(),
                send: vec![
                    cfg.zfs_bin.clone(),
                    "send".into(),
                    "-i".into(),
                    base.clone(),
                    snapshot.clone(),
                ],
                receive: receive_argv(cfg, target, true),
            }),
            Action::Skip { .. } => None,
        }
    }
}

fn receive_argv(cfg: &ReplicationConfig, target: &str, force: bool) -> Vec<String> {
    let mut argv = vec![
        cfg.ssh_bin.clone(),
        cfg.backup_hostname.clone(),
        cfg.zfs_bin.clone(),
        "receive".into(),
        "-u".into(),
    ];
    if force {
        argv.push("-F".into());
    }
    argv.push(target.to_string());
    argv
}

impl fmt::Display for TransferCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", render(&self.send), render(&self.receive))
    }
}

/// Append-only (within a run) audit log of issued commands.
pub struct TransferLog {
    path: PathBuf,
    out: BufWriter<File>,
    lines: u64,
}

impl TransferLog {
    /// Create or truncate the log.
    pub fn create(path: &Path) -> Result<Self> {
        let f = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(path)
            .with_context(|| format!("open commands log {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::new(f),
            lines: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Write one line and flush it: a crash later in the run must not lose it.
    pub fn append(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{}", line)
            .and_then(|_| self.out.flush())
            .with_context(|| format!("write commands log {}", self.path.display()))?;
        self.lines += 1;
        record_audit_line();
        Ok(())
    }
}

pub struct TransferExecutor<'a, S: Shell> {
    cfg: &'a ReplicationConfig,
    shell: &'a S,
}

impl<'a, S: Shell> TransferExecutor<'a, S> {
    pub fn new(cfg: &'a ReplicationConfig, shell: &'a S) -> Self {
        Self { cfg, shell }
    }

    /// Run one transfer and record it. Returns the audit line, or None for a skip.
    pub fn execute(&self, action: &Action, log: &mut TransferLog) -> Result<Option<String>> {
        let Some(cmd) = TransferCommand::for_action(self.cfg, action) else {
            return Ok(None);
        };
        let line = cmd.to_string();
        info!("transfer: {} ({:?}): {}", cmd.volume, cmd.kind, line);

        if let Err(e) = self.shell.pipe(&cmd.send, &cmd.receive) {
            record_transfer_failure();
            error!("transfer: {} failed, aborting run", cmd.volume);
            return Err(TransferFailed::attach(e, &cmd.volume, &line));
        }

        match cmd.kind {
            TransferKind::Seed => {
                record_seed_transfer();
                info!("transfer: created {} on {}", cmd.volume, self.cfg.backup_hostname);
            }
            TransferKind::Incremental => {
                record_incremental_transfer();
                info!("transfer: incremental backup of {} done", cmd.volume);
            }
        }
        log.append(&line)?;
        Ok(Some(line))
    }
}
