//! altlb - Live node directory command line tool

use altlb_cluster::LiveNodes;
use altlb_core::{LiveNodesConfig, Scheme};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "altlb")]
#[command(about = "Client-side load balancing over live cluster nodes")]
struct Args {
    /// Bootstrap hosts, without scheme or port
    #[arg(long = "node", required = true, value_delimiter = ',')]
    nodes: Vec<String>,

    /// JSON configuration file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// http or https
    #[arg(long)]
    scheme: Option<Scheme>,

    /// Port every node listens on
    #[arg(long)]
    port: Option<u16>,

    /// Only target nodes from this rack
    #[arg(long)]
    rack: Option<String>,

    /// Only target nodes from this datacenter
    #[arg(long)]
    datacenter: Option<String>,

    /// Refresh period while requests are flowing (0 disables)
    #[arg(long)]
    update_period_secs: Option<u64>,

    /// Refresh period while idle (0 disables)
    #[arg(long)]
    idle_update_period_secs: Option<u64>,

    /// Accept invalid server certificates
    #[arg(long)]
    insecure: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Refresh the node list once and print it
    Nodes,

    /// Check rack/datacenter support and configuration
    Check,

    /// Print the node chosen for each of `count` requests
    Watch {
        #[arg(long, default_value = "10")]
        count: usize,

        #[arg(long, default_value = "1000")]
        interval_ms: u64,
    },
}

impl Args {
    fn load_config(&self) -> anyhow::Result<LiveNodesConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("invalid config file {}", path.display()))?
            }
            None => LiveNodesConfig::default(),
        };

        if let Some(scheme) = self.scheme {
            config.scheme = scheme;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(rack) = &self.rack {
            config.rack = Some(rack.clone());
        }
        if let Some(dc) = &self.datacenter {
            config.datacenter = Some(dc.clone());
        }
        if let Some(secs) = self.update_period_secs {
            config.update_period = Duration::from_secs(secs);
        }
        if let Some(secs) = self.idle_update_period_secs {
            config.idle_update_period = Duration::from_secs(secs);
        }
        if self.insecure {
            config.transport.ignore_server_certificate_error = true;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries command output
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = args.load_config()?;

    tracing::info!(
        nodes = ?args.nodes,
        scheme = %config.scheme,
        port = config.port,
        "Starting altlb"
    );

    let nodes = LiveNodes::new(&args.nodes, config)
        .context("failed to create live node directory")?;

    let result = match args.command {
        Command::Nodes => print_nodes(&nodes).await,
        Command::Check => check(&nodes).await,
        Command::Watch { count, interval_ms } => {
            watch(&nodes, count, Duration::from_millis(interval_ms)).await
        }
    };

    nodes.stop();
    result
}

async fn print_nodes(nodes: &LiveNodes) -> anyhow::Result<()> {
    let count = nodes
        .refresh_now()
        .await
        .context("failed to refresh node list")?;

    if count == 0 {
        tracing::warn!("Cluster returned no nodes, showing bootstrap list");
    }

    for node in nodes.live_nodes().iter() {
        println!("{}", node);
    }
    Ok(())
}

async fn check(nodes: &LiveNodes) -> anyhow::Result<()> {
    let supported = nodes
        .check_rack_datacenter_supported()
        .await
        .context("failed to probe rack/datacenter support")?;
    println!("rack/datacenter support: {}", if supported { "yes" } else { "no" });

    nodes
        .check_rack_datacenter_correct()
        .await
        .context("rack/datacenter check failed")?;
    println!("rack/datacenter configuration: ok");

    Ok(())
}

async fn watch(nodes: &LiveNodes, count: usize, interval: Duration) -> anyhow::Result<()> {
    nodes.start();

    for i in 0..count {
        if i > 0 {
            tokio::time::sleep(interval).await;
        }
        println!("{}", nodes.next_node());
    }

    tracing::info!(live = nodes.live_nodes().len(), "Finished watching");
    Ok(())
}
