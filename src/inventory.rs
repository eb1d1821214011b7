//! Snapshot inventory: volumes and snapshots of a host, in listing (creation) order.
//!
//! Источник - текстовый вывод `zfs list` / `zfs list -t snapshot`:
//!
//! NAME                              USED  AVAIL     REFER  MOUNTPOINT
//! tank                             31.6T  8.36T      222K  /tank
//! tank/archive                     17.5T  8.36T     7.73T  /tank/archive
//! tank/archive/aircheck            8.04T  8.36T      205K  /tank/archive/aircheck
//!
//! Контракт разбора:
//! - идентификатор - первый whitespace-токен строки;
//! - порядок строк = хронология (старые сначала);
//! - в списке томов первые две строки (заголовок и корневой том) служебные и отбрасываются;
//! - в списке снапшотов строки без '@' (заголовок) игнорируются.
//!
//! Everything past this module sees typed records only.

use anyhow::{Context, Result};
use log::{debug, info};
use serde::Serialize;

use crate::config::ReplicationConfig;
use crate::metrics::record_inventory_query;
use crate::shell::Shell;

/// Rows of `zfs list` that precede the real datasets: header + pool root.
pub const STRUCTURAL_ROWS: usize = 2;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Full identifier `<volume>@<tag>`.
    pub name: String,
    pub volume: String,
    pub tag: String,
}

impl Snapshot {
    /// Split `<volume>@<tag>`; None if there is no '@'.
    pub fn parse(name: &str) -> Option<Self> {
        let (volume, tag) = name.split_once('@')?;
        if volume.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            volume: volume.to_string(),
            tag: tag.to_string(),
        })
    }

    /// Tag carries the recurrence marker; any suffix (date) is ignored.
    pub fn has_marker(&self, marker: &str) -> bool {
        self.tag.starts_with(marker)
    }
}

/// Where an inventory query runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Host {
    Local,
    Remote(String),
}

impl Host {
    pub fn label(&self) -> &str {
        match self {
            Host::Local => "local",
            Host::Remote(h) => h.as_str(),
        }
    }
}

/// Ordered state of one host. Read once per run and not refreshed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Inventory {
    pub volumes: Vec<String>,
    pub snapshots: Vec<Snapshot>,
}

impl Inventory {
    pub fn snapshots_of<'a>(&'a self, volume: &'a str) -> impl Iterator<Item = &'a Snapshot> + 'a {
        self.snapshots.iter().filter(move |s| s.volume == volume)
    }

    /// Most recent snapshot of `volume` carrying `marker`: last match in listing order.
    pub fn latest_tagged(&self, volume: &str, marker: &str) -> Option<&Snapshot> {
        self.snapshots
            .iter()
            .filter(|s| s.volume == volume && s.has_marker(marker))
            .last()
    }

    pub fn contains_snapshot(&self, name: &str) -> bool {
        self.snapshots.iter().any(|s| s.name == name)
    }
}

/// First whitespace-delimited token of every non-blank row.
fn identifiers(text: &str) -> impl Iterator<Item = &str> {
    text.lines().filter_map(|l| l.split_whitespace().next())
}

/// `zfs list` output -> volumes, structural rows dropped.
pub fn parse_volume_listing(text: &str) -> Vec<String> {
    identifiers(text)
        .skip(STRUCTURAL_ROWS)
        .map(|s| s.to_string())
        .collect()
}

/// `zfs list -t snapshot` output -> snapshots in listing order.
pub fn parse_snapshot_listing(text: &str) -> Vec<Snapshot> {
    identifiers(text).filter_map(Snapshot::parse).collect()
}

/// Builds and runs the inventory queries for one configuration.
pub struct InventoryReader<'a, S: Shell> {
    cfg: &'a ReplicationConfig,
    shell: &'a S,
}

impl<'a, S: Shell> InventoryReader<'a, S> {
    pub fn new(cfg: &'a ReplicationConfig, shell: &'a S) -> Self {
        Self { cfg, shell }
    }

    fn argv(&self, host: &Host, zfs_args: &[&str]) -> Vec<String> {
        let mut argv = Vec::with_capacity(zfs_args.len() + 3);
        if let Host::Remote(h) = host {
            argv.push(self.cfg.ssh_bin.clone());
            argv.push(h.clone());
        }
        argv.push(self.cfg.zfs_bin.clone());
        argv.extend(zfs_args.iter().map(|s| s.to_string()));
        argv
    }

    pub fn volume_listing_argv(&self, host: &Host) -> Vec<String> {
        self.argv(host, &["list"])
    }

    pub fn snapshot_listing_argv(&self, host: &Host) -> Vec<String> {
        self.argv(host, &["list", "-t", "snapshot"])
    }

    pub fn volumes(&self, host: &Host) -> Result<Vec<String>> {
        let argv = self.volume_listing_argv(host);
        record_inventory_query();
        let text = self
            .shell
            .capture(&argv)
            .with_context(|| format!("list volumes on {}", host.label()))?;
        let vols = parse_volume_listing(&text);
        debug!("inventory: {} volume(s) on {}", vols.len(), host.label());
        Ok(vols)
    }

    pub fn snapshots(&self, host: &Host) -> Result<Vec<Snapshot>> {
        let argv = self.snapshot_listing_argv(host);
        record_inventory_query();
        let text = self
            .shell
            .capture(&argv)
            .with_context(|| format!("list snapshots on {}", host.label()))?;
        let snaps = parse_snapshot_listing(&text);
        debug!("inventory: {} snapshot(s) on {}", snaps.len(), host.label());
        Ok(snaps)
    }

    /// Full inventory of a host (volumes + snapshots).
    pub fn read(&self, host: &Host) -> Result<Inventory> {
        let volumes = self.volumes(host)?;
        let snapshots = self.snapshots(host)?;
        Ok(Inventory { volumes, snapshots })
    }

    /// Snapshot-only inventory (the backup side never needs volumes).
    pub fn read_snapshots(&self, host: &Host) -> Result<Inventory> {
        Ok(Inventory {
            volumes: Vec::new(),
            snapshots: self.snapshots(host)?,
        })
    }

    /// Primary (local, full) and backup (remote, snapshots) inventories.
    /// Any failure here aborts the run before a single decision is made.
    pub fn gather(&self) -> Result<(Inventory, Inventory)> {
        let primary = self.read(&Host::Local)?;
        let backup = self.read_snapshots(&Host::Remote(self.cfg.backup_hostname.clone()))?;
        info!(
            "inventory: primary {} volume(s) / {} snapshot(s), backup {} snapshot(s) on {}",
            primary.volumes.len(),
            primary.snapshots.len(),
            backup.snapshots.len(),
            self.cfg.backup_hostname
        );
        Ok((primary, backup))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOLS: &str = "\
NAME                              USED  AVAIL     REFER  MOUNTPOINT
tank                             31.6T  8.36T      222K  /tank
tank/archive                     17.5T  8.36T     7.73T  /tank/archive
tank/archive/aircheck            8.04T  8.36T      205K  /tank/archive/aircheck
tank/archive/aircheck/am         27.7M  8.36T     4.17M  /tank/archive/aircheck/am
";

    const SNAPS: &str = "\
NAME                                                    USED  AVAIL  REFER  MOUNTPOINT
tank/a@zfs-auto-snap_daily-2024-01-01-0000                0B      -   100K  -
tank/a@zfs-auto-snap_weekly-2024-01-01-0000               0B      -   100K  -
tank/a/b@zfs-auto-snap_weekly-2024-01-01-0000             0B      -   100K  -
tank/a@zfs-auto-snap_weekly-2024-01-08-0000               0B      -   100K  -
tank/a@zfs-auto-snap_daily-2024-01-09-0000                0B      -   100K  -
";

    #[test]
    fn volume_listing_drops_header_and_root() {
        assert_eq!(
            parse_volume_listing(VOLS),
            vec![
                "tank/archive",
                "tank/archive/aircheck",
                "tank/archive/aircheck/am"
            ]
        );
        assert!(parse_volume_listing("NAME USED\n").is_empty());
    }

    #[test]
    fn snapshot_listing_keeps_order_and_skips_header() {
        let s = parse_snapshot_listing(SNAPS);
        assert_eq!(s.len(), 5);
        assert_eq!(s[0].name, "tank/a@zfs-auto-snap_daily-2024-01-01-0000");
        assert_eq!(s[2].volume, "tank/a/b");
        assert_eq!(s[3].tag, "zfs-auto-snap_weekly-2024-01-08-0000");
    }

    #[test]
    fn latest_tagged_is_last_match_of_exact_volume() {
        let inv = Inventory {
            volumes: vec![],
            snapshots: parse_snapshot_listing(SNAPS),
        };
        let got = inv.latest_tagged("tank/a", "zfs-auto-snap_weekly").unwrap();
        assert_eq!(got.name, "tank/a@zfs-auto-snap_weekly-2024-01-08-0000");
        // child dataset snapshots do not leak into the parent
        let child = inv.latest_tagged("tank/a/b", "zfs-auto-snap_weekly").unwrap();
        assert_eq!(child.name, "tank/a/b@zfs-auto-snap_weekly-2024-01-01-0000");
        assert!(inv.latest_tagged("tank/c", "zfs-auto-snap_weekly").is_none());
        assert!(inv.latest_tagged("tank/a", "zfs-auto-snap_monthly").is_none());
        assert_eq!(inv.snapshots_of("tank/a").count(), 4);
        assert!(inv.contains_snapshot("tank/a/b@zfs-auto-snap_weekly-2024-01-01-0000"));
    }

    #[test]
    fn snapshot_parse_rejects_plain_names() {
        assert!(Snapshot::parse("NAME").is_none());
        assert!(Snapshot::parse("@tag").is_none());
        let s = Snapshot::parse("tank/a@").unwrap();
        assert_eq!(s.tag, "");
    }

    #[test]
    fn remote_queries_go_through_ssh() {
        let cfg = ReplicationConfig::new("tank", "pool2", "bk.lan");
        let shell = crate::shell::SystemShell;
        let r = InventoryReader::new(&cfg, &shell);
        assert_eq!(r.volume_listing_argv(&Host::Local), vec!["zfs", "list"]);
        assert_eq!(
            r.snapshot_listing_argv(&Host::Remote("bk.lan".into())),
            vec!["ssh", "bk.lan", "zfs", "list", "-t", "snapshot"]
        );
    }
}
