//! One replication run: inventory -> reconcile -> transfer, strictly sequential.
//!
//! Порядок:
//! 1) run-lock рядом с журналом команд;
//! 2) инвентарь основного (тома + снапшоты) и бэкапа (снапшоты) - один раз за прогон,
//!    любая ошибка здесь прерывает прогон до каких-либо решений;
//! 3) план по всем томам в порядке листинга;
//! 4) журнал команд создаётся заново, отправки идут по одной; первая ошибка - стоп.
//!
//! The backup inventory is not refreshed between volumes: transfers made
//! earlier in the run cannot change what later volumes are compared against.

use std::path::{Path, PathBuf};

use anyhow::Result;
use log::info;
use serde::Serialize;

use crate::config::ReplicationConfig;
use crate::inventory::{Inventory, InventoryReader};
use crate::lock::try_acquire_run_lock;
use crate::namespace::NameMapper;
use crate::reconcile::{Action, Reconciler, SkipReason};
use crate::shell::Shell;
use crate::transfer::{TransferCommand, TransferExecutor, TransferLog};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedVolume {
    pub volume: String,
    pub reason: SkipReason,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub seeded: u64,
    pub incremental: u64,
    pub skipped: Vec<SkippedVolume>,
    /// Issued command lines, same content and order as the audit log.
    pub commands: Vec<String>,
    pub commands_log: PathBuf,
}

/// Planned (not executed) action with its rendered command, for `plan` output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlannedAction {
    #[serde(flatten)]
    pub action: Action,
    pub command: Option<String>,
}

pub struct Replicator<'a, S: Shell> {
    cfg: &'a ReplicationConfig,
    shell: &'a S,
    mapper: NameMapper,
}

impl<'a, S: Shell> Replicator<'a, S> {
    pub fn new(cfg: &'a ReplicationConfig, shell: &'a S) -> Self {
        Self {
            cfg,
            shell,
            mapper: NameMapper::from_config(cfg),
        }
    }

    /// Primary and backup inventories; fatal on any query failure.
    pub fn gather(&self) -> Result<(Inventory, Inventory)> {
        InventoryReader::new(self.cfg, self.shell).gather()
    }

    /// Reconcile every primary volume against the backup inventory.
    pub fn decide(&self, primary: &Inventory, backup: &Inventory) -> Vec<Action> {
        Reconciler::new(&self.mapper, &self.cfg.weekly_tag).plan(primary, backup)
    }

    /// Dry run: inventory + decisions with the commands that `run` would issue.
    pub fn plan(&self) -> Result<Vec<PlannedAction>> {
        let (primary, backup) = self.gather()?;
        Ok(self
            .decide(&primary, &backup)
            .into_iter()
            .map(|action| {
                let command =
                    TransferCommand::for_action(self.cfg, &action).map(|c| c.to_string());
                PlannedAction { action, command }
            })
            .collect())
    }

    /// Full replication run.
    pub fn run(&self) -> Result<RunReport> {
        let _lock = try_acquire_run_lock(&self.cfg.commands_log)?;
        info!("run: start, {}", self.cfg);

        let (primary, backup) = self.gather()?;
        let actions = self.decide(&primary, &backup);

        let mut log = TransferLog::create(&self.cfg.commands_log)?;
        let report = self.execute(&actions, &mut log)?;

        info!(
            "run: done, seeded={} incremental={} skipped={} log={}",
            report.seeded,
            report.incremental,
            report.skipped.len(),
            log.path().display()
        );
        Ok(report)
    }

    /// Execute decided actions in order; stops at the first failed transfer.
    pub fn execute(&self, actions: &[Action], log: &mut TransferLog) -> Result<RunReport> {
        let executor = TransferExecutor::new(self.cfg, self.shell);
        let mut report = RunReport {
            commands_log: log.path().to_path_buf(),
            ..RunReport::default()
        };

        for action in actions {
            info!("run: volume {}", action.volume());
            match action {
                Action::Skip { volume, reason } => {
                    report.skipped.push(SkippedVolume {
                        volume: volume.clone(),
                        reason: *reason,
                    });
                }
                Action::Seed { .. } | Action::Incremental { .. } => {
                    if let Some(line) = executor.execute(action, log)? {
                        if matches!(action, Action::Seed { .. }) {
                            report.seeded += 1;
                        } else {
                            report.incremental += 1;
                        }
                        report.commands.push(line);
                    }
                }
            }
        }
        Ok(report)
    }
}

/// Load the config file, then run. Nothing touches a host if loading fails.
pub fn replicate_from_config_file<S: Shell>(path: &Path, shell: &S) -> Result<RunReport> {
    let cfg = ReplicationConfig::load(path)?;
    Replicator::new(&cfg, shell).run()
}
