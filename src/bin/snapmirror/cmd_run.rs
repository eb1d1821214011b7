use anyhow::Result;
use std::path::PathBuf;

use snapmirror::config::ReplicationConfig;
use snapmirror::metrics;
use snapmirror::replicator::replicate_from_config_file;
use snapmirror::shell::SystemShell;

pub fn exec(config: Option<PathBuf>, json: bool) -> Result<()> {
    let path = ReplicationConfig::resolve_path(config);
    let report = replicate_from_config_file(&path, &SystemShell::new())?;

    if json {
        let out = serde_json::json!({
            "report": report,
            "metrics": metrics::snapshot(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "Replicated: {} seeded, {} incremental, {} skipped",
        report.seeded,
        report.incremental,
        report.skipped.len()
    );
    for s in &report.skipped {
        println!("  skipped {:<40} {}", s.volume, s.reason);
    }
    println!("Commands log: {}", report.commands_log.display());
    Ok(())
}
