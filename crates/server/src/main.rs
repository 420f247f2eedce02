use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cluster_insight_server::{
    config::Config,
    graph::Neo4jGraph,
    server::Server,
    tools::{Inspectors, ToolRegistry},
};

#[derive(Parser)]
#[command(author, version, about = "Cluster insight tools for incident-investigation agents", long_about = None)]
struct Cli {
    /// Log level (debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (the default)
    Serve {
        /// Listen address, overrides SERVER_ADDR
        #[arg(long)]
        addr: Option<String>,
    },

    /// List the available tools
    Tools,

    /// Run one tool and print its result
    Call {
        /// Tool name, e.g. get_cluster_overview
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },

    /// Manage the service graph database
    #[command(subcommand)]
    Graph(GraphCommands),
}

#[derive(Subcommand)]
enum GraphCommands {
    /// Run a `;`-separated Cypher file
    Load { file: PathBuf },

    /// Delete every node and relationship
    Drop {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load().context("Failed to load configuration")?;
    info!(
        "Loaded configuration: namespace={}, prometheus={}, jaeger={}, neo4j={}",
        config.kube.namespace, config.prometheus.url, config.jaeger.url, config.neo4j.uri
    );

    match cli.command.unwrap_or(Commands::Serve { addr: None }) {
        Commands::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| config.server.addr.clone());
            let registry = Arc::new(registry(&config).await?);
            info!(
                "Serving {} tools for namespace '{}'",
                registry.tools().len(),
                config.kube.namespace
            );
            Server::new(registry).start(&addr).await?;
        }
        Commands::Tools => {
            for tool in registry(&config).await?.tools() {
                println!("{:<24} {}", tool.name(), tool.description());
            }
        }
        Commands::Call { tool, args } => {
            let args: serde_json::Value =
                serde_json::from_str(&args).context("--args must be a JSON object")?;
            let output = registry(&config).await?.call(&tool, args).await?;
            println!("{}", output.to_text());
        }
        Commands::Graph(GraphCommands::Load { file }) => {
            let script = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let count = Neo4jGraph::new(config.neo4j.clone()).run_script(&script).await?;
            info!("Ran {} statements from {}", count, file.display());
        }
        Commands::Graph(GraphCommands::Drop { yes }) => {
            if !yes {
                bail!("Refusing to delete the service graph without --yes");
            }
            Neo4jGraph::new(config.neo4j.clone()).drop_all().await?;
            info!("Service graph deleted");
        }
    }

    Ok(())
}

async fn registry(config: &Config) -> Result<ToolRegistry> {
    let inspectors = Inspectors::connect(config)
        .await
        .context("Failed to connect to the cluster")?;
    Ok(ToolRegistry::new(&inspectors))
}
