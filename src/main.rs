use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use log::{info, warn};
use serde_json::{json, Value};
use tokio::time::sleep;
use tracing_log::LogTracer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use raftcell::raft::{Channel, RaftEvent};
use raftcell::storage::JsonCodec;
use raftcell::{
    Config, LocalCluster, MemoryPersistAgent, NodeId, PersistAgent, Peer, SledPersistAgent,
    StorageConfig,
};

fn init_logging() {
    let _ = LogTracer::init();

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}

#[derive(Parser)]
#[command(name = "raftcell")]
#[command(about = "A single value replicated by Raft-style leader election")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an in-process cluster and replicate a counter through it
    Demo {
        /// JSON config file; defaults are used when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of nodes when no config file names them
        #[arg(short, long, default_value_t = 4)]
        nodes: usize,

        /// Persist node state in this sled directory instead of memory
        #[arg(short, long)]
        data_dir: Option<String>,

        /// How long to run
        #[arg(long, default_value_t = 10)]
        duration_secs: u64,

        /// Crash the current leader every N seconds
        #[arg(long)]
        crash_every_secs: Option<u64>,
    },

    /// Print the persisted state of one node
    Inspect {
        /// Directory of the sled database
        #[arg(short, long, default_value = "data")]
        data_dir: String,

        /// Node id to look up
        #[arg(short, long)]
        id: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Command::Demo {
            config,
            nodes,
            data_dir,
            duration_secs,
            crash_every_secs,
        } => {
            let mut config = match config {
                Some(path) => Config::from_file(&path)
                    .with_context(|| format!("failed to load config {}", path.display()))?,
                None => Config {
                    nodes: Vec::new(),
                    ..Config::default()
                },
            };
            if let Some(data_dir) = data_dir {
                config.storage = StorageConfig::Sled { data_dir };
            }
            let mut peers = config.peers();
            if peers.is_empty() {
                peers = (1..=nodes).map(|i| Peer::new(format!("node{i}"))).collect();
            }

            run_demo(config, peers, Duration::from_secs(duration_secs), crash_every_secs).await?;
        }
        Command::Inspect { data_dir, id } => {
            let agent: SledPersistAgent<JsonCodec> = SledPersistAgent::open(&data_dir)?;
            let restored: Option<raftcell::raft::PersistentState<Value>> =
                agent.restore(&Peer::new(id.as_str())).await?;

            match restored {
                Some(state) => println!("{}", serde_json::to_string_pretty(&state)?),
                None => {
                    let known: Vec<String> = agent
                        .node_ids()?
                        .iter()
                        .map(NodeId::to_string)
                        .collect();
                    bail!(
                        "no record for node '{id}' in {} (stored: {})",
                        agent.path().display(),
                        known.join(", ")
                    );
                }
            }
        }
    }

    Ok(())
}

async fn run_demo(
    config: Config,
    peers: Vec<Peer>,
    duration: Duration,
    crash_every_secs: Option<u64>,
) -> anyhow::Result<()> {
    let persist: Arc<dyn PersistAgent<Value>> = match &config.storage {
        StorageConfig::Memory => Arc::new(MemoryPersistAgent::new()),
        StorageConfig::Sled { data_dir } => {
            Arc::new(SledPersistAgent::<JsonCodec>::open(data_dir)?)
        }
    };

    info!(
        "Starting demo with {} nodes ({:?} storage)",
        peers.len(),
        config.storage
    );
    let cluster = LocalCluster::new(config.raft.clone(), config.transport.clone(), persist);
    cluster.create_and_start(peers).await?;

    for raft in cluster.nodes() {
        let id = raft.id().map(|id| id.to_string()).unwrap_or_default();
        raft.subscribe(Channel::RoleChanged, move |event| {
            let id = id.clone();
            async move {
                if let RaftEvent::RoleChanged(role) = event {
                    println!("{id} is now {role}");
                }
            }
        });
    }

    let mut counter: u64 = 0;
    for second in 1..=duration.as_secs() {
        sleep(Duration::from_secs(1)).await;
        counter += 1;

        let leaders = cluster.leaders();
        if leaders.is_empty() {
            warn!("No leader at second {second}");
        }
        for leader in &leaders {
            if let Err(e) = leader.replicate(json!({ "counter": counter })) {
                warn!("Leader refused update: {e}");
            }
        }

        if crash_every_secs.is_some_and(|every| every > 0 && second % every == 0) {
            for leader in &leaders {
                if let Some(id) = leader.id() {
                    cluster.crash_node(&id, "scheduled crash").await?;
                }
            }
        }
    }

    // Let one more heartbeat round carry the last value.
    sleep(Duration::from_millis(config.raft.heartbeat_interval * 2)).await;

    for raft in cluster.nodes() {
        println!(
            "{:<10} {:<10} term={:<4} value={}",
            raft.id().map(|id| id.to_string()).unwrap_or_default(),
            raft.role().to_string(),
            raft.term(),
            raft.data()
        );
    }

    cluster.destroy().await?;
    Ok(())
}
