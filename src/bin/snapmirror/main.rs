use anyhow::Result;
use env_logger::{Builder, Env};

use snapmirror::error::exit_code;

mod cli;
mod cmd_check_config;
mod cmd_inventory;
mod cmd_plan;
mod cmd_run;

fn init_logger() {
    // Уровень берём из RUST_LOG, иначе дефолт - info.
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(exit_code(&e));
    }
}

fn run() -> Result<()> {
    let cli = cli::Cli::parse();
    match cli.cmd {
        cli::Cmd::Run { config, json } =>
            cmd_run::exec(config, json),

        cli::Cmd::Plan { config, json } =>
            cmd_plan::exec(config, json),

        cli::Cmd::Inventory { config, backup, json } =>
            cmd_inventory::exec(config, backup, json),

        cli::Cmd::CheckConfig { config } =>
            cmd_check_config::exec(config),
    }
}
