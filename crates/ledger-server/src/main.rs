//! Ledger Server — headless daemon driving persona registration,
//! reconcile, and ballot casting against one operator.
//!
//! # Usage
//!
//! ```bash
//! ledger-server --config /path/to/ledger-server.toml
//! ledger-server --check    # Run one check cycle and exit
//! ledger-server --validate # Validate config and exit
//! ```

mod config;
mod daemon;

use anyhow::{Context, Result};
use std::path::PathBuf;

fn main() -> Result<()> {
    // Security hardening: disable core dumps so key_info_seed never
    // lands on disk via a crash.
    ledger_core::memory::disable_core_dumps();

    let args: Vec<String> = std::env::args().collect();

    let mut config_path = PathBuf::from("/config/ledger-server.toml");
    let mut one_shot = false;
    let mut validate_only = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
                if i < args.len() {
                    config_path = PathBuf::from(&args[i]);
                } else {
                    anyhow::bail!("--config requires a path argument");
                }
            }
            "--check" | "--once" => {
                one_shot = true;
            }
            "--validate" => {
                validate_only = true;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--version" | "-V" => {
                println!("ledger-server {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            other => {
                anyhow::bail!("Unknown argument: {}", other);
            }
        }
        i += 1;
    }

    let mut server_config = config::ServerConfig::from_file(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    server_config.apply_env_overrides();

    server_config
        .validate()
        .context("Configuration validation failed")?;

    std::env::set_var("RUST_LOG", &server_config.server.log_level);
    env_logger::init();

    if validate_only {
        println!("Configuration is valid.");
        println!("  Operator:     {}", server_config.operator.base_url);
        println!("  Data dir:     {}", server_config.server.data_dir.display());
        println!(
            "  Reconcile:    every {} secs",
            server_config.reconcile.interval_secs
        );
        println!(
            "  Ballot:       prepare every {}s, vote every {}s",
            server_config.ballot.prepare_interval_secs, server_config.ballot.vote_interval_secs
        );
        println!("  Auto-register: {}", server_config.wallet.auto_register);
        return Ok(());
    }

    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;

    if one_shot {
        log::info!("Running single check cycle…");
        rt.block_on(daemon::run_check_cycle(&server_config))?;
        log::info!("Done.");
    } else {
        let shutdown = rt.block_on(async {
            tokio::select! {
                result = daemon::run(server_config) => result,
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Received shutdown signal. Exiting…");
                    Ok(())
                }
            }
        });

        if let Err(e) = shutdown {
            log::error!("Server error: {:#}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_help() {
    println!(
        r#"Ledger Server — headless wallet/reconcile/ballot daemon

USAGE:
    ledger-server [OPTIONS]

OPTIONS:
    -c, --config <PATH>   Config file path (default: /config/ledger-server.toml)
    --check, --once       Run a single ballot-pipeline check and exit
    --validate            Validate config file and exit
    -h, --help            Show this help message
    -V, --version         Show version

ENVIRONMENT VARIABLES (override config file):
    LEDGER_DATA_DIR                 Data directory path
    LEDGER_LOG_LEVEL                Log level (error/warn/info/debug/trace)
    LEDGER_OPERATOR_BASE_URL        Operator base URL
    LEDGER_RECONCILE_INTERVAL       Reconcile interval in seconds
    LEDGER_BALLOT_PREPARE_INTERVAL  Ballot prepare interval in seconds
    LEDGER_BALLOT_VOTE_INTERVAL     Ballot vote interval in seconds

EXAMPLES:
    # Run as daemon with config file
    ledger-server --config /path/to/config.toml

    # Single check (useful for cron jobs)
    ledger-server --config config.toml --check

    # Validate configuration
    ledger-server --config config.toml --validate
"#
    );
}
