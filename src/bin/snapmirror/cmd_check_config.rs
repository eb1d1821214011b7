use anyhow::Result;
use std::path::PathBuf;

use snapmirror::config::ReplicationConfig;

pub fn exec(config: Option<PathBuf>) -> Result<()> {
    let path = ReplicationConfig::resolve_path(config);
    let cfg = ReplicationConfig::load(&path)?;
    println!("Config {} OK", path.display());
    println!("  main_fsname     = {}", cfg.main_fsname);
    println!("  backup_fsname   = {}", cfg.backup_fsname);
    println!("  backup_hostname = {}", cfg.backup_hostname);
    println!("  weekly_tag      = {}", cfg.weekly_tag);
    println!("  commands_log    = {}", cfg.commands_log.display());
    println!("  zfs_bin         = {}", cfg.zfs_bin);
    println!("  ssh_bin         = {}", cfg.ssh_bin);
    Ok(())
}
