//! Operator CLI for the sidereal node. Full operator tooling (RPC
//! surfaces, wallet integration, block explorers) is out of scope per
//! the consensus core's own spec — this binary is a thin wrapper that
//! wires config, store, and chain actor together, plus the handful of
//! commands needed to stand up and inspect a devnet.

use std::path::PathBuf;
use std::sync::Arc;

use sidereal_consensus::{ChainState, CoinDiff, ConsensusParams, HeaderSummary, Mempool, ReferenceInterpreter};
use sidereal_crypto::dev::BlstProvider;
use sidereal_node::actor::{ChainActor, ChainHandle};
use sidereal_node::blockstore::MemoryBlockStore;
use sidereal_node::config::NodeConfig;
use sidereal_node::error::NodeError;
use sidereal_store::{Manifest, Store};
use tracing_subscriber::EnvFilter;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let result = match args.get(1).map(String::as_str) {
        Some("init") => cmd_init(&args[2..]),
        Some("run") => cmd_run(&args[2..]),
        Some("status") => cmd_status(&args[2..]),
        _ => {
            print_usage();
            return;
        }
    };
    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn print_usage() {
    eprintln!("usage:");
    eprintln!("  sidereal-node init --data-dir <dir>");
    eprintln!("  sidereal-node run --config <path>");
    eprintln!("  sidereal-node status --data-dir <dir>");
}

fn flag_value(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn cmd_init(args: &[String]) -> Result<(), NodeError> {
    let data_dir = flag_value(args, "--data-dir").unwrap_or_else(|| "./sidereal-data".to_string());
    let data_dir = PathBuf::from(data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let config = NodeConfig {
        data_dir: data_dir.clone(),
        ..NodeConfig::default()
    };
    let config_path = data_dir.join("config.toml");
    config.save(&config_path)?;
    println!("wrote {}", config_path.display());
    Ok(())
}

fn cmd_status(args: &[String]) -> Result<(), NodeError> {
    let data_dir = flag_value(args, "--data-dir").unwrap_or_else(|| "./sidereal-data".to_string());
    let manifest_path = Manifest::path_in(std::path::Path::new(&data_dir));
    let manifest = Manifest::load(&manifest_path)?;
    println!("schema_version: {}", manifest.schema_version);
    println!("genesis_hash:   {}", hex::encode(manifest.genesis_hash));
    println!("lca_hash:       {}", hex::encode(manifest.lca_hash));
    println!("lca_height:     {}", manifest.lca_height);
    Ok(())
}

/// Runs a node against the genesis in `config`, then drains NDJSON
/// block/spend-bundle submissions from stdin. Each line is either
/// `{"block": <FullBlock JSON>}` or `{"spend_bundle": <SpendBundle JSON>}`;
/// this is a demonstration harness for the actor's external interface,
/// not a transport protocol (P2P gossip is out of scope of this core).
fn cmd_run(args: &[String]) -> Result<(), NodeError> {
    let config_path = flag_value(args, "--config")
        .ok_or_else(|| NodeError::Config("--config <path> is required".to_string()))?;
    let config = NodeConfig::load(std::path::Path::new(&config_path))?;

    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    std::fs::create_dir_all(&config.data_dir)?;
    let store = Store::open(&config.data_dir, config.genesis_hash)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_time()
        .build()?;
    runtime.block_on(run_async(config.consensus, config.genesis_hash, store))
}

async fn run_async(
    params: ConsensusParams,
    genesis_hash: sidereal_consensus::Hash32,
    mut store: Store,
) -> Result<(), NodeError> {
    let genesis_diff = CoinDiff {
        header_hash: genesis_hash,
        height: 0,
        additions: vec![],
        removals: vec![],
        coinbase: None,
    };
    let genesis_summary = HeaderSummary {
        header_hash: genesis_hash,
        prev_header_hash: genesis_hash,
        height: 0,
        weight: 0,
        total_iters: 0,
        timestamp: 0,
        challenge_digest: genesis_hash,
        proof_of_space_hash: genesis_hash,
    };

    let chain = ChainState::with_capacity(
        genesis_summary,
        genesis_diff,
        params.number_of_heads,
        &mut store,
    )?;
    let mempool = Mempool::new(params.clone());

    let actor = ChainActor::new(
        chain,
        mempool,
        Box::new(MemoryBlockStore::new()),
        Box::new(store),
        Arc::new(BlstProvider),
        Arc::new(ReferenceInterpreter),
        params,
    );
    let handle = actor.spawn(64);

    tracing::info!("node running, reading NDJSON submissions from stdin");
    use std::io::BufRead;
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if let Err(e) = dispatch_line(&handle, &line).await {
            tracing::warn!(error = %e, "submission rejected");
        }
    }
    Ok(())
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum Submission {
    Block {
        block: sidereal_consensus::FullBlock,
    },
    SpendBundle {
        spend_bundle: sidereal_consensus::SpendBundle,
    },
}

async fn dispatch_line(handle: &ChainHandle, line: &str) -> Result<(), NodeError> {
    let submission: Submission =
        serde_json::from_str(line).map_err(|e| NodeError::Config(format!("bad submission: {e}")))?;
    match submission {
        Submission::Block { block } => {
            let result = handle.submit_block(block).await?;
            println!("{result:?}");
        }
        Submission::SpendBundle { spend_bundle } => {
            handle.submit_spend_bundle(spend_bundle).await?;
            println!("accepted");
        }
    }
    Ok(())
}
