use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use cronagent_agent::{Agent, ProcessExecutor};
use cronagent_core::{init_tracing, AgentConfig, Paths};
use cronagent_store::etcd::EtcdStore;
use cronagent_store::Store;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "cronagent")]
#[command(about = "Distributed cron execution agent", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override the config/state directory (defaults to ~/.cronagent)
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register, load jobs, and watch the coordination store until interrupted
    Run,
    /// Print the effective configuration as JSON
    Config,
    /// Check connectivity to the coordination store
    Doctor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let paths = match cli.base_dir {
        Some(dir) => Paths::with_base(dir),
        None => Paths::new(),
    };
    let config = AgentConfig::load_or_default(&paths)?;

    match cli.command {
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Doctor => doctor(&config).await?,
        Commands::Run => run(config).await?,
    }
    Ok(())
}

async fn doctor(config: &AgentConfig) -> anyhow::Result<()> {
    info!(endpoints = ?config.store_endpoints, "checking coordination store connectivity");
    match EtcdStore::connect(&config.store_endpoints, None).await {
        Ok(_) => {
            println!("store reachable: {:?}", config.store_endpoints);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "store unreachable");
            Err(anyhow::anyhow!("store unreachable: {e}"))
        }
    }
}

async fn run(config: AgentConfig) -> anyhow::Result<()> {
    let store = EtcdStore::connect(&config.store_endpoints, None).await?;
    let store: Arc<dyn Store> = Arc::new(store);
    let executor = Arc::new(ProcessExecutor);
    let agent = Agent::new(&config, store, executor)?;
    agent.run().await?;
    info!(node_id = %agent.node_id(), "agent started, waiting for shutdown signal");

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    agent.stop().await;
    Ok(())
}
