use anyhow::Result;
use std::path::PathBuf;

use snapmirror::config::ReplicationConfig;
use snapmirror::inventory::{Host, InventoryReader};
use snapmirror::shell::SystemShell;

pub fn exec(config: Option<PathBuf>, backup: bool, json: bool) -> Result<()> {
    let cfg = ReplicationConfig::load(&ReplicationConfig::resolve_path(config))?;
    let shell = SystemShell::new();
    let reader = InventoryReader::new(&cfg, &shell);

    let (host, inv) = if backup {
        let host = Host::Remote(cfg.backup_hostname.clone());
        let inv = reader.read_snapshots(&host)?;
        (host, inv)
    } else {
        let inv = reader.read(&Host::Local)?;
        (Host::Local, inv)
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&inv)?);
        return Ok(());
    }

    println!("Inventory of {}", host.label());
    if !backup {
        println!("  volumes ({}):", inv.volumes.len());
        for v in &inv.volumes {
            let weekly = inv
                .latest_tagged(v, &cfg.weekly_tag)
                .map(|s| s.name.as_str())
                .unwrap_or("-");
            println!("    {:<40} latest weekly: {}", v, weekly);
        }
    }
    println!("  snapshots: {}", inv.snapshots.len());
    Ok(())
}
