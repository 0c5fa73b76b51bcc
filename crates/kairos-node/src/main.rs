//! kairos-node — the staking-ledger service binary.
//!
//! Startup sequence:
//!   1. Open (or initialise) the ledger database
//!   2. Write the founding parameters if the DB is fresh
//!   3. Start the JSON-RPC 2.0 server
//!   4. Wait for shutdown, then flush the DB
//!
//! Collaborator systems drive the ledger entirely over RPC: stake changes,
//! reward deposits, accrual, claims and catch-up all arrive as `kairos_*`
//! method calls.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use kairos_core::constants::DEFAULT_EPOCH_SIZE_SECS;
use kairos_core::types::AccountId;
use kairos_ledger::{init_ledger, InitParams, LedgerDb, LedgerEngine};
use kairos_rpc::{RpcServer, RpcServerState};

#[derive(Parser, Debug)]
#[command(
    name = "kairos-node",
    version,
    about = "Kairos — epoch-indexed staking ledger with pro-rata reward distribution"
)]
struct Args {
    /// Directory for the persistent ledger database.
    #[arg(long, default_value = "~/.kairos/data")]
    data_dir: PathBuf,

    /// JSON-RPC listen address.
    #[arg(long, default_value = "127.0.0.1:8580")]
    rpc_addr: SocketAddr,

    /// Path to init params JSON (only required on first run).
    #[arg(long)]
    init_params: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,kairos=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    info!("Kairos node starting");

    // ── Ledger database ───────────────────────────────────────────────────────
    let data_dir = expand_tilde(&args.data_dir);
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;

    let db = Arc::new(LedgerDb::open(&data_dir).context("opening ledger database")?);

    // ── Founding parameters if fresh ──────────────────────────────────────────
    if db.get_params().context("reading init params")?.is_none() {
        info!("fresh database — writing founding parameters");
        let params = load_or_generate_params(args.init_params.as_deref())?;
        init_ledger(&db, &params).context("initializing ledger")?;
    } else {
        info!("existing database found — skipping initialization");
    }

    // ── Engine ────────────────────────────────────────────────────────────────
    let engine = Arc::new(LedgerEngine::open(Arc::clone(&db)).context("opening ledger engine")?);
    info!(
        init_timestamp = engine.params().init_timestamp,
        epoch_size_secs = engine.params().epoch_size_secs,
        current_epoch = engine.clock().epoch_of(chrono::Utc::now().timestamp()),
        "ledger engine ready"
    );

    // ── RPC server ────────────────────────────────────────────────────────────
    let rpc_state = Arc::new(RpcServerState {
        engine: Arc::clone(&engine),
    });
    let _rpc_handle = RpcServer::new(rpc_state)
        .start(args.rpc_addr)
        .await
        .context("starting RPC server")?;

    info!("node ready");
    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;

    info!("shutting down — flushing ledger database");
    db.flush().context("flushing ledger database")?;
    Ok(())
}

/// Load init params from a JSON file, or generate ephemeral dev params.
///
/// # Warning
/// Generated params use a random rewards-setter identity and the current
/// time as epoch origin. They are **not reproducible**. Only use this for
/// local development and testing.
fn load_or_generate_params(path: Option<&Path>) -> anyhow::Result<InitParams> {
    if let Some(p) = path {
        let json = std::fs::read_to_string(p)
            .with_context(|| format!("reading init params from {}", p.display()))?;
        return serde_json::from_str(&json).context("parsing init params JSON");
    }
    warn!("No --init-params provided. Generating ephemeral dev params — DO NOT USE IN PRODUCTION.");
    let setter = AccountId::from_bytes(rand::random::<[u8; 32]>());
    info!(rewards_setter = %setter, "ephemeral rewards-setter identity");
    Ok(InitParams {
        init_timestamp: chrono::Utc::now().timestamp(),
        epoch_size_secs: DEFAULT_EPOCH_SIZE_SECS,
        rewards_setter: setter,
        delegated_claimers: Vec::new(),
    })
}

/// Expand a leading `~` to the user's home directory (`HOME` or `USERPROFILE`).
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
