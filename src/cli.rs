use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use rustsstable::{RunOutcome, UpgradeConfig, run_upgrade};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "sstable-upgrade")]
#[command(about = "Offline migration of one table's sstables to the current format")]
struct Cli {
    /// Keyspace holding the table to upgrade
    keyspace: String,

    /// Table whose sstables should be upgraded
    table: String,

    /// Root of the data directory tree
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Peer to fetch table metadata from
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Schema RPC port on the peer
    #[arg(long, default_value_t = 9160)]
    port: u16,

    /// Keep the original files after a successful upgrade
    #[arg(short = 'k', long)]
    keep_source: bool,

    /// Emit verbose diagnostics
    #[arg(long)]
    debug: bool,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level))
        .try_init()
        .context("Failed to initialize logging")?;

    let config = UpgradeConfig::new(cli.keyspace.as_str(), cli.table.as_str())
        .with_data_root(&cli.data_dir)
        .with_peer(cli.host.as_str(), cli.port)
        .with_keep_source(cli.keep_source)
        .with_debug(cli.debug);

    let result = match run_upgrade(config).await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Upgrade of {}.{} failed: {}", cli.keyspace, cli.table, e);
            if cli.debug {
                eprintln!("{:?}", e);
            }
            process::exit(1);
        }
    };

    match result.outcome {
        RunOutcome::NothingToUpgrade => println!("Nothing to upgrade."),
        RunOutcome::Completed { succeeded, failed } => {
            println!("Upgraded {} sstables, {} failed.", succeeded, failed);
        }
    }
    Ok(())
}
