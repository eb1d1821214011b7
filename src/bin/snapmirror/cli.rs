use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI snapmirror: инкрементальная репликация ZFS на бэкап-хост
#[derive(Parser, Debug)]
#[command(name = "snapmirror", version, about = "Incremental ZFS replication over ssh")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Replicate every volume: seed new ones, send weekly deltas for the rest
    ///
    /// Пример:
    ///   snapmirror run --config /etc/snapmirror/config.json
    ///
    /// Журнал команд (commands_log) перезаписывается каждый прогон.
    Run {
        /// Config file (default: $SNAPMIRROR_CONFIG or ./config.json)
        #[arg(long)]
        config: Option<PathBuf>,
        /// JSON output (run report)
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Dry run: print the decision and command for every volume, send nothing
    Plan {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print parsed volumes/snapshots of the primary (or the backup with --backup)
    Inventory {
        #[arg(long)]
        config: Option<PathBuf>,
        /// Query the backup host instead of the local one (snapshots only)
        #[arg(long, default_value_t = false)]
        backup: bool,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Load and validate the config file
    CheckConfig {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Cli as Parser>::parse()
    }
}
