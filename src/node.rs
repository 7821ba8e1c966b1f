//! Node orchestration: configuration, logging, persistence and the API server.

use crate::blockchain::{Blockchain, ChainEngine};
use crate::config::Config;
use crate::error::ChainError;
use crate::persistence::{Database, InMemoryPersistence, Persistence};
use std::fs;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber. `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A subscriber may already be installed (tests, embedding); that is fine.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub struct Node {
    pub config: Config,
    pub engine: ChainEngine,
}

impl Node {
    pub fn init(config: Config) -> Result<Self, ChainError> {
        info!(
            difficulty = config.chain.difficulty,
            database = %config.database.path,
            "starting GasChain node"
        );

        let persistence = open_persistence(&config.database.path);
        let blockchain =
            Blockchain::with_options(config.chain.difficulty, config.chain.genesis_transaction)?;
        let genesis = blockchain.chain_snapshot();
        if let Some(genesis) = genesis.first() {
            info!(hash = %genesis.hash, "genesis block created");
        }

        let engine = ChainEngine::with_persistence(blockchain, persistence);
        Ok(Self { config, engine })
    }

    #[cfg(feature = "api")]
    pub async fn start(self) -> Result<(), ChainError> {
        let api_node = crate::api::Node::new(self.engine.clone(), &self.config.api);
        crate::api::run_api_server(Arc::new(api_node), self.config.api.port).await
    }
}

/// Opens the SQLite store at `path`, falling back to in-memory persistence.
fn open_persistence(path: &str) -> Arc<dyn Persistence> {
    let db_path = std::path::Path::new(path);
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!(path = %parent.display(), error = %e, "failed to create data directory");
            }
        }
    }

    match Database::open(path) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            warn!(
                path = %path,
                error = %e,
                "failed to open database, falling back to in-memory persistence"
            );
            Arc::new(InMemoryPersistence::new())
        }
    }
}
