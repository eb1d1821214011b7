use anyhow::Result;
use std::path::PathBuf;

use snapmirror::config::ReplicationConfig;
use snapmirror::reconcile::Action;
use snapmirror::replicator::Replicator;
use snapmirror::shell::SystemShell;

pub fn exec(config: Option<PathBuf>, json: bool) -> Result<()> {
    let cfg = ReplicationConfig::load(&ReplicationConfig::resolve_path(config))?;
    let shell = SystemShell::new();
    let planned = Replicator::new(&cfg, &shell).plan()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&planned)?);
        return Ok(());
    }

    for p in &planned {
        // transfers always carry a command; skips carry a reason
        let (label, detail) = match &p.action {
            Action::Skip { reason, .. } => ("skip", reason.to_string()),
            Action::Seed { .. } => ("seed", p.command.clone().unwrap_or_default()),
            Action::Incremental { .. } => ("incr", p.command.clone().unwrap_or_default()),
        };
        println!("{}  {}: {}", label, p.action.volume(), detail);
    }
    let transfers = planned.iter().filter(|p| p.action.is_transfer()).count();
    println!("{} volume(s), {} transfer(s) planned", planned.len(), transfers);
    Ok(())
}
