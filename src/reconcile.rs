//! Reconciler: per-volume decision between seed, incremental and skip.
//!
//! Для тома V на основном хосте:
//! 1) main   = последний (по порядку листинга) снапшот V с weekly-маркером;
//!            нет такого -> Skip(NoWeeklySnapshot) + warn
//! 2) target = V в пространстве имён бэкапа (вне корня -> Skip(OutsideNamespace) + warn)
//! 3) backup = последний weekly-снапшот target на бэкапе
//! 4) backup нет  -> Seed { main -> target }
//!    backup есть -> base = backup в пространстве основного хоста,
//!                   Incremental { (base, main] -> target }
//!    base == main -> Skip(UpToDate)
//!
//! "Most recent" is strictly the last entry after filtering; no timestamps are parsed.

use std::fmt;

use log::{info, warn};
use serde::Serialize;

use crate::inventory::Inventory;
use crate::metrics::{record_volume_seen, record_volume_skipped};
use crate::namespace::NameMapper;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No snapshot of the volume carries the weekly marker.
    NoWeeklySnapshot,
    /// Volume is not under the primary root (another pool).
    OutsideNamespace,
    /// Backup already holds the primary's newest weekly snapshot.
    UpToDate,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::NoWeeklySnapshot => "no weekly snapshot",
            SkipReason::OutsideNamespace => "outside primary namespace",
            SkipReason::UpToDate => "up to date",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Backup has no copy: full send of `snapshot` into `target`.
    Seed {
        volume: String,
        snapshot: String,
        target: String,
    },
    /// Delta `(base, snapshot]` into `target`.
    Incremental {
        volume: String,
        base: String,
        snapshot: String,
        target: String,
    },
    Skip {
        volume: String,
        reason: SkipReason,
    },
}

impl Action {
    pub fn volume(&self) -> &str {
        match self {
            Action::Seed { volume, .. }
            | Action::Incremental { volume, .. }
            | Action::Skip { volume, .. } => volume,
        }
    }

    pub fn is_transfer(&self) -> bool {
        !matches!(self, Action::Skip { .. })
    }
}

pub struct Reconciler<'a> {
    mapper: &'a NameMapper,
    marker: &'a str,
}

impl<'a> Reconciler<'a> {
    pub fn new(mapper: &'a NameMapper, marker: &'a str) -> Self {
        Self { mapper, marker }
    }

    /// Decide the action for one primary volume.
    pub fn reconcile_volume(&self, volume: &str, primary: &Inventory, backup: &Inventory) -> Action {
        record_volume_seen();

        let main = match primary.latest_tagged(volume, self.marker) {
            Some(s) => s.name.clone(),
            None => {
                warn!(
                    "reconcile: {} has no '{}' snapshot, nothing to send this run",
                    volume, self.marker
                );
                return self.skip(volume, SkipReason::NoWeeklySnapshot);
            }
        };

        let target = match self.mapper.to_backup(volume) {
            Ok(t) => t,
            Err(e) => {
                warn!("reconcile: skip {}: {}", volume, e);
                return self.skip(volume, SkipReason::OutsideNamespace);
            }
        };

        let backup_snap = backup.latest_tagged(&target, self.marker);
        info!(
            "reconcile: {} main={} backup={}",
            volume,
            main,
            backup_snap.map(|s| s.name.as_str()).unwrap_or("(none)")
        );

        let Some(backup_snap) = backup_snap else {
            return Action::Seed {
                volume: volume.to_string(),
                snapshot: main,
                target,
            };
        };

        // backup_snap найден по target, значит префикс бэкапа у него всегда есть
        let base = match self.mapper.to_primary(&backup_snap.name) {
            Ok(b) => b,
            Err(e) => {
                warn!("reconcile: skip {}: {}", volume, e);
                return self.skip(volume, SkipReason::OutsideNamespace);
            }
        };

        if base == main {
            info!("reconcile: {} already at {}", volume, main);
            return self.skip(volume, SkipReason::UpToDate);
        }
        if !primary.contains_snapshot(&base) {
            warn!(
                "reconcile: base {} of {} is no longer on the primary; incremental send will fail",
                base, volume
            );
        }

        Action::Incremental {
            volume: volume.to_string(),
            base,
            snapshot: main,
            target,
        }
    }

    /// Decide every volume of the primary, in listing order.
    pub fn plan(&self, primary: &Inventory, backup: &Inventory) -> Vec<Action> {
        primary
            .volumes
            .iter()
            .map(|v| self.reconcile_volume(v, primary, backup))
            .collect()
    }

    fn skip(&self, volume: &str, reason: SkipReason) -> Action {
        record_volume_skipped();
        Action::Skip {
            volume: volume.to_string(),
            reason,
        }
    }
}
