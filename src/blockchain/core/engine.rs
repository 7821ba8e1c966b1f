use crate::blockchain::core::block::{Block, BlockSummary};
use crate::blockchain::core::chain::Blockchain;
use crate::error::ChainError;
use crate::miner::MiningCancel;
use crate::persistence::{InMemoryPersistence, Persistence};
use crate::transaction::Transaction;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard, RwLock, RwLockWriteGuard};
use tracing::{info, warn};

/// Shared handle to a single-writer chain.
///
/// Readers take the chain's read lock and always see a fully formed state.
/// Sealing is serialized by `seal_lock`; the nonce search runs on a blocking
/// worker without holding the chain lock, and the append plus pool cleanup
/// happen together under one write lock.
#[derive(Clone)]
pub struct ChainEngine {
    chain: Arc<RwLock<Blockchain>>,
    seal_lock: Arc<Mutex<()>>,
    persistence: Arc<dyn Persistence>,
}

impl ChainEngine {
    /// Engine backed by in-memory block reference persistence.
    pub fn new(blockchain: Blockchain) -> Self {
        Self::with_persistence(blockchain, Arc::new(InMemoryPersistence::new()))
    }

    pub fn with_persistence(blockchain: Blockchain, persistence: Arc<dyn Persistence>) -> Self {
        Self {
            chain: Arc::new(RwLock::new(blockchain)),
            seal_lock: Arc::new(Mutex::new(())),
            persistence,
        }
    }

    pub fn persistence(&self) -> &Arc<dyn Persistence> {
        &self.persistence
    }

    /// Enqueue a transaction for the next block.
    pub async fn submit(&self, tx: Transaction) {
        let mut chain = self.chain.write().await;
        tracing::debug!(tx = %tx.hash_str(), sender = %tx.sender, "transaction submitted");
        chain.append_transaction(tx);
    }

    /// Mine and append the pending pool. Fails with `EmptyPool` when nothing is pending.
    pub async fn seal(&self) -> Result<Block, ChainError> {
        self.seal_cancellable(MiningCancel::new()).await
    }

    /// Like [`ChainEngine::seal`], giving up with `MiningAborted` after `timeout`.
    pub async fn seal_with_timeout(&self, timeout: Duration) -> Result<Block, ChainError> {
        let cancel = MiningCancel::new();
        match tokio::time::timeout(timeout, self.seal_cancellable(cancel.clone())).await {
            Ok(result) => result,
            Err(_) => {
                cancel.cancel();
                warn!(timeout_ms = timeout.as_millis() as u64, "seal timed out");
                Err(ChainError::MiningAborted)
            }
        }
    }

    /// Seals the pending pool unless `cancel` is raised first.
    ///
    /// Dropping the returned future also cancels the search. On any failure the
    /// chain and pending pool are left exactly as they were.
    pub async fn seal_cancellable(&self, cancel: MiningCancel) -> Result<Block, ChainError> {
        let _seal = self.seal_lock.lock().await;

        let (mut block, difficulty) = {
            let chain = self.chain.read().await;
            (chain.prepare_block()?, chain.difficulty)
        };
        let index = block.index;

        let guard = cancel.guard();
        let worker_cancel = cancel.clone();
        let started = Instant::now();
        let mined = tokio::task::spawn_blocking(move || {
            block.mine_cancellable(difficulty, &worker_cancel).map(|_| block)
        })
        .await
        .map_err(|e| {
            warn!(index, error = %e, "mining worker failed");
            ChainError::MiningAborted
        })
        .and_then(|result| result);
        guard.disarm();

        let block = match mined {
            Ok(block) => block,
            Err(e) => {
                info!(index, elapsed_ms = started.elapsed().as_millis() as u64, "mining aborted");
                return Err(e);
            }
        };

        self.chain.write().await.commit_block(block.clone())?;

        info!(
            index = block.index,
            hash = %block.hash(),
            nonce = block.nonce,
            transactions = block.transactions.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "block sealed"
        );

        if let Err(e) = self.persistence.record_block_hash(block.index, block.hash()) {
            warn!(index = block.index, error = %e, "failed to persist block reference");
        }

        Ok(block)
    }

    pub async fn lookup(&self, hash: &str) -> Option<Block> {
        self.chain.read().await.get_block_by_hash(hash).cloned()
    }

    /// Most recent block holding a transaction with this hash.
    pub async fn find_block_containing(&self, tx_hash: &str) -> Option<Block> {
        self.chain
            .read()
            .await
            .blocks
            .iter()
            .rev()
            .find(|block| block.transactions.iter().any(|tx| tx.hash_str() == tx_hash))
            .cloned()
    }

    pub async fn validate(&self) -> bool {
        self.chain.read().await.is_chain_valid()
    }

    pub async fn verify_transaction_signatures(&self) -> bool {
        self.chain.read().await.verify_transaction_signatures()
    }

    pub async fn chain_snapshot(&self) -> Vec<BlockSummary> {
        self.chain.read().await.chain_snapshot()
    }

    pub async fn height(&self) -> usize {
        self.chain.read().await.len()
    }

    pub async fn latest_block(&self) -> Option<Block> {
        self.chain.read().await.latest_block().cloned()
    }

    pub async fn pending_transactions(&self) -> Vec<Transaction> {
        self.chain.read().await.mempool.get_all_transactions()
    }

    pub async fn difficulty(&self) -> u32 {
        self.chain.read().await.difficulty
    }

    /// Direct write access to the chain for maintenance tooling and tamper
    /// tests. Waits for any in-flight seal and blocks new ones until dropped.
    pub async fn write_state(&self) -> StateGuard<'_> {
        let seal = self.seal_lock.lock().await;
        let chain = self.chain.write().await;
        StateGuard { chain, _seal: seal }
    }
}

/// Exclusive chain access returned by [`ChainEngine::write_state`].
pub struct StateGuard<'a> {
    chain: RwLockWriteGuard<'a, Blockchain>,
    _seal: MutexGuard<'a, ()>,
}

impl Deref for StateGuard<'_> {
    type Target = Blockchain;

    fn deref(&self) -> &Blockchain {
        &self.chain
    }
}

impl DerefMut for StateGuard<'_> {
    fn deref_mut(&mut self) -> &mut Blockchain {
        &mut self.chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mempool::Mempool;
    use crate::miner::MAX_DIFFICULTY;
    use crate::persistence::BlockReference;

    fn reading() -> Transaction {
        Transaction::new("A", "B", 10.0, 5000.0, 4900.0, 100.0)
    }

    #[tokio::test]
    async fn test_seal_records_block_reference() {
        let persistence = Arc::new(InMemoryPersistence::new());
        let engine = ChainEngine::with_persistence(Blockchain::new(1).unwrap(), persistence.clone());

        engine.submit(reading()).await;
        let block = engine.seal().await.unwrap();

        let refs = persistence.list_block_refs().unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].block_hash, block.hash());
        assert_eq!(refs[0].block_index, 1);
    }

    #[tokio::test]
    async fn test_empty_pool_is_rejected() {
        let engine = ChainEngine::new(Blockchain::new(1).unwrap());
        assert_eq!(engine.seal().await, Err(ChainError::EmptyPool));
        assert_eq!(engine.height().await, 1);
    }

    #[tokio::test]
    async fn test_cancelled_seal_rolls_back() {
        let engine = ChainEngine::new(Blockchain::new(MAX_DIFFICULTY).unwrap());
        engine.submit(reading()).await;

        let cancel = MiningCancel::new();
        cancel.cancel();
        assert_eq!(
            engine.seal_cancellable(cancel).await,
            Err(ChainError::MiningAborted)
        );
        assert_eq!(engine.height().await, 1);
        assert_eq!(engine.pending_transactions().await.len(), 1);
        assert!(engine.persistence().list_block_refs().unwrap().is_empty());
    }

    struct FailingPersistence;

    impl Persistence for FailingPersistence {
        fn record_block_hash(&self, _: u64, _: &str) -> Result<BlockReference, ChainError> {
            Err(ChainError::DatabaseError("disk full".to_string()))
        }

        fn list_block_refs(&self) -> Result<Vec<BlockReference>, ChainError> {
            Ok(Vec::new())
        }

        fn find_block_ref(&self, _: &str) -> Result<Option<BlockReference>, ChainError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_does_not_undo_seal() {
        let engine =
            ChainEngine::with_persistence(Blockchain::new(1).unwrap(), Arc::new(FailingPersistence));
        engine.submit(reading()).await;

        let block = engine.seal().await.unwrap();
        assert_eq!(engine.height().await, 2);
        assert!(engine.lookup(block.hash()).await.is_some());
        assert!(engine.pending_transactions().await.is_empty());
    }

    #[tokio::test]
    async fn test_readers_proceed_while_mining() {
        let engine = ChainEngine::new(Blockchain::new(MAX_DIFFICULTY).unwrap());
        engine.submit(reading()).await;

        let cancel = MiningCancel::new();
        let sealing = {
            let engine = engine.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { engine.seal_cancellable(cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(engine.validate().await);
        assert_eq!(engine.chain_snapshot().await.len(), 1);
        engine.submit(reading()).await;

        cancel.cancel();
        assert_eq!(sealing.await.unwrap(), Err(ChainError::MiningAborted));
        assert_eq!(engine.height().await, 1);
        assert_eq!(engine.pending_transactions().await.len(), 2);
    }

    #[tokio::test]
    async fn test_write_state_waits_for_in_flight_seal() {
        let engine = ChainEngine::new(Blockchain::new(MAX_DIFFICULTY).unwrap());
        engine.submit(Transaction::new("A", "first", 1.0, 0.0, 0.0, 0.0)).await;

        let cancel = MiningCancel::new();
        let sealing = {
            let engine = engine.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { engine.seal_cancellable(cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let rewrite = {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine.write_state().await.mempool = Mempool::new();
                engine.submit(Transaction::new("A", "late", 1.0, 0.0, 0.0, 0.0)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!rewrite.is_finished());

        cancel.cancel();
        assert_eq!(sealing.await.unwrap(), Err(ChainError::MiningAborted));
        rewrite.await.unwrap();

        let pending = engine.pending_transactions().await;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].receiver, "late");
    }
}
