use crate::blockchain::core::block::{Block, BlockSummary, GENESIS_PREVIOUS_HASH, GENESIS_TIMESTAMP};
use crate::error::ChainError;
use crate::mempool::Mempool;
use crate::miner::{meets_difficulty, MiningCancel, MAX_DIFFICULTY};
use crate::transaction::Transaction;

/// The chain itself: an ordered block sequence anchored by genesis, plus the
/// pool of transactions waiting for the next block.
///
/// `Blockchain` is a plain single-owner value. Shared, concurrent access goes
/// through [`ChainEngine`](crate::blockchain::ChainEngine).
#[derive(Debug, Clone)]
pub struct Blockchain {
    pub blocks: Vec<Block>,
    pub difficulty: u32,
    pub mempool: Mempool,
}

impl Blockchain {
    /// Creates a chain whose genesis block carries the sentinel transaction.
    pub fn new(difficulty: u32) -> Result<Self, ChainError> {
        Self::with_options(difficulty, true)
    }

    pub fn with_options(difficulty: u32, genesis_transaction: bool) -> Result<Self, ChainError> {
        if difficulty > MAX_DIFFICULTY {
            return Err(ChainError::ConfigError(format!(
                "Difficulty {} exceeds the {} hex digits of a SHA-256 digest",
                difficulty, MAX_DIFFICULTY
            )));
        }

        Ok(Blockchain {
            blocks: vec![Self::create_genesis_block(genesis_transaction)],
            difficulty,
            mempool: Mempool::new(),
        })
    }

    /// The fixed first block. It is never mined.
    pub fn create_genesis_block(genesis_transaction: bool) -> Block {
        let transactions = if genesis_transaction {
            vec![Transaction::genesis()]
        } else {
            Vec::new()
        };
        Block::with_timestamp(
            0,
            GENESIS_PREVIOUS_HASH.to_string(),
            GENESIS_TIMESTAMP,
            transactions,
        )
    }

    pub fn latest_block(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.mempool.len()
    }

    /// Queues a transaction for the next block. Signatures are not checked here.
    pub fn append_transaction(&mut self, tx: Transaction) {
        self.mempool.add_transaction(tx);
    }

    /// Builds the next, not yet mined, block from a copy of the pending pool.
    pub fn prepare_block(&self) -> Result<Block, ChainError> {
        if self.mempool.is_empty() {
            return Err(ChainError::EmptyPool);
        }
        let latest = self.latest_block().ok_or_else(|| ChainError::ChainIntegrityViolation {
            index: 0,
            reason: "Chain has no genesis block".to_string(),
        })?;

        Ok(Block::new(
            latest.index + 1,
            latest.hash().to_string(),
            self.mempool.get_all_transactions(),
        ))
    }

    /// Appends a mined block and drops the transactions it sealed from the pool.
    pub fn commit_block(&mut self, block: Block) -> Result<(), ChainError> {
        let latest = self.latest_block().ok_or_else(|| ChainError::ChainIntegrityViolation {
            index: 0,
            reason: "Chain has no genesis block".to_string(),
        })?;

        if block.index != latest.index + 1 {
            return Err(ChainError::ChainIntegrityViolation {
                index: block.index,
                reason: format!(
                    "Invalid block index. Expected {}, but got {}.",
                    latest.index + 1,
                    block.index
                ),
            });
        }
        if block.previous_hash != latest.hash() {
            return Err(ChainError::ChainIntegrityViolation {
                index: block.index,
                reason: format!(
                    "Invalid previous block hash. Expected {}, but got {}.",
                    latest.hash(),
                    block.previous_hash
                ),
            });
        }
        if !block.has_valid_hash() {
            return Err(ChainError::ChainIntegrityViolation {
                index: block.index,
                reason: "Stored hash does not match block contents".to_string(),
            });
        }
        if !meets_difficulty(block.hash(), self.difficulty) {
            return Err(ChainError::ChainIntegrityViolation {
                index: block.index,
                reason: "Block hash does not meet the difficulty target".to_string(),
            });
        }

        self.mempool.remove_sealed(&block.transactions);
        self.blocks.push(block);
        Ok(())
    }

    /// Snapshots the pool, mines the next block and appends it.
    pub fn seal_block(&mut self) -> Result<Block, ChainError> {
        let mut block = self.prepare_block()?;
        block.mine(self.difficulty);
        self.commit_block(block.clone())?;
        Ok(block)
    }

    /// Like [`Blockchain::seal_block`], but gives up with `MiningAborted` once
    /// `cancel` is raised, leaving the chain and pool untouched.
    pub fn seal_block_cancellable(&mut self, cancel: &MiningCancel) -> Result<Block, ChainError> {
        let mut block = self.prepare_block()?;
        block.mine_cancellable(self.difficulty, cancel)?;
        self.commit_block(block.clone())?;
        Ok(block)
    }

    pub fn get_block_by_hash(&self, hash: &str) -> Option<&Block> {
        self.blocks.iter().find(|block| block.hash() == hash)
    }

    pub fn chain_snapshot(&self) -> Vec<BlockSummary> {
        self.blocks.iter().map(Block::summary).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(receiver: &str) -> Transaction {
        Transaction::new("A", receiver, 10.0, 5000.0, 4900.0, 100.0)
    }

    #[test]
    fn test_genesis_block_is_fixed() {
        let a = Blockchain::new(2).unwrap();
        let b = Blockchain::new(2).unwrap();
        let genesis = &a.blocks[0];
        assert_eq!(genesis.index, 0);
        assert_eq!(genesis.previous_hash, "0");
        assert_eq!(genesis.nonce, 0);
        assert_eq!(genesis.transactions, vec![Transaction::genesis()]);
        assert_eq!(genesis.hash(), b.blocks[0].hash());
    }

    #[test]
    fn test_genesis_without_transaction() {
        let chain = Blockchain::with_options(1, false).unwrap();
        assert!(chain.blocks[0].transactions.is_empty());
    }

    #[test]
    fn test_rejects_unsatisfiable_difficulty() {
        assert!(matches!(
            Blockchain::new(MAX_DIFFICULTY + 1),
            Err(ChainError::ConfigError(_))
        ));
    }

    #[test]
    fn test_seal_block_appends_and_clears_pool() {
        let mut chain = Blockchain::new(2).unwrap();
        chain.append_transaction(reading("B"));

        let block = chain.seal_block().unwrap();
        assert_eq!(block.index, 1);
        assert_eq!(block.previous_hash, chain.blocks[0].hash());
        assert!(block.hash().starts_with("00"));
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.pending_len(), 0);
        assert_eq!(chain.blocks[1], block);
    }

    #[test]
    fn test_seal_empty_pool_fails() {
        let mut chain = Blockchain::new(2).unwrap();
        assert_eq!(chain.seal_block(), Err(ChainError::EmptyPool));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_sealed_block_preserves_transaction_order() {
        let mut chain = Blockchain::new(1).unwrap();
        for receiver in ["B", "C", "D"] {
            chain.append_transaction(reading(receiver));
        }
        let block = chain.seal_block().unwrap();
        let receivers: Vec<_> = block.transactions.iter().map(|t| t.receiver.as_str()).collect();
        assert_eq!(receivers, vec!["B", "C", "D"]);
    }

    #[test]
    fn test_aborted_seal_leaves_state_untouched() {
        let mut chain = Blockchain::new(MAX_DIFFICULTY).unwrap();
        chain.append_transaction(reading("B"));
        let cancel = MiningCancel::new();
        cancel.cancel();

        assert_eq!(
            chain.seal_block_cancellable(&cancel),
            Err(ChainError::MiningAborted)
        );
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.pending_len(), 1);
    }

    #[test]
    fn test_transactions_submitted_during_mining_stay_pending() {
        let mut chain = Blockchain::new(1).unwrap();
        chain.append_transaction(reading("B"));
        let mut block = chain.prepare_block().unwrap();

        chain.append_transaction(reading("C"));
        block.mine(1);
        chain.commit_block(block).unwrap();

        assert_eq!(chain.blocks[1].transactions.len(), 1);
        assert_eq!(chain.pending_len(), 1);
        assert_eq!(chain.mempool.transactions()[0].receiver, "C");
    }

    #[test]
    fn test_rewritten_pool_keeps_late_transactions() {
        let mut chain = Blockchain::new(1).unwrap();
        chain.append_transaction(reading("first"));
        let mut block = chain.prepare_block().unwrap();

        chain.mempool = Mempool::new();
        chain.append_transaction(reading("late"));
        block.mine(1);
        chain.commit_block(block).unwrap();

        assert_eq!(chain.blocks[1].transactions[0].receiver, "first");
        assert_eq!(chain.pending_len(), 1);
        assert_eq!(chain.mempool.transactions()[0].receiver, "late");
    }

    #[test]
    fn test_commit_rejects_stale_block() {
        let mut chain = Blockchain::new(1).unwrap();
        chain.append_transaction(reading("B"));
        let mut stale = chain.prepare_block().unwrap();
        stale.mine(1);
        chain.seal_block().unwrap();

        let err = chain.commit_block(stale).unwrap_err();
        assert!(matches!(err, ChainError::ChainIntegrityViolation { index: 1, .. }));
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_commit_rejects_unmined_block() {
        // No hash has 64 leading zero digits without mining.
        let mut chain = Blockchain::new(MAX_DIFFICULTY).unwrap();
        chain.append_transaction(reading("B"));
        let block = chain.prepare_block().unwrap();

        let err = chain.commit_block(block).unwrap_err();
        match err {
            ChainError::ChainIntegrityViolation { index, reason } => {
                assert_eq!(index, 1);
                assert!(reason.contains("difficulty"));
            }
            other => panic!("unexpected error: {}", other),
        }
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.pending_len(), 1);
    }

    #[test]
    fn test_get_block_by_hash() {
        let mut chain = Blockchain::new(1).unwrap();
        chain.append_transaction(reading("B"));
        let block = chain.seal_block().unwrap();

        assert_eq!(chain.get_block_by_hash(block.hash()), Some(&block));
        assert!(chain.get_block_by_hash("ffff").is_none());
    }

    #[test]
    fn test_chain_snapshot() {
        let mut chain = Blockchain::new(1).unwrap();
        chain.append_transaction(reading("B"));
        chain.seal_block().unwrap();

        let snapshot = chain.chain_snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1].previous_hash, snapshot[0].hash);
        assert_eq!(snapshot[1].index, 1);
    }
}
