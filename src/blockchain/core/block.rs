use crate::error::ChainError;
use crate::miner::{meets_difficulty, MiningCancel};
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Fixed genesis timestamp (2023-01-01T00:00:00Z, milliseconds).
pub const GENESIS_TIMESTAMP: u64 = 1672531200000;

/// A sealed or in-progress block.
///
/// `hash` is derived from `(index, previous_hash, timestamp, nonce)` only; the
/// transaction list is not part of the digest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub index: u64,
    pub previous_hash: String,
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    pub nonce: u64,
    hash: String,
}

/// Header-only view of a block, as returned by chain snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub index: u64,
    pub hash: String,
    pub previous_hash: String,
    pub timestamp: u64,
}

impl Block {
    pub fn new(index: u64, previous_hash: String, transactions: Vec<Transaction>) -> Self {
        let timestamp = chrono::Utc::now().timestamp_millis() as u64;
        Self::with_timestamp(index, previous_hash, timestamp, transactions)
    }

    pub fn with_timestamp(
        index: u64,
        previous_hash: String,
        timestamp: u64,
        transactions: Vec<Transaction>,
    ) -> Self {
        let mut block = Block {
            index,
            previous_hash,
            timestamp,
            transactions,
            nonce: 0,
            hash: String::new(),
        };
        block.hash = block.calculate_hash();
        block
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Recomputes the digest from the header fields.
    ///
    /// Every field is written in a fixed order with fixed-width little-endian
    /// integers and a length prefix on the string, so the encoding is canonical.
    pub fn calculate_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.index.to_le_bytes());
        hasher.update((self.previous_hash.len() as u64).to_le_bytes());
        hasher.update(self.previous_hash.as_bytes());
        hasher.update(self.timestamp.to_le_bytes());
        hasher.update(self.nonce.to_le_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn has_valid_hash(&self) -> bool {
        self.hash == self.calculate_hash()
    }

    /// Searches nonces upward from the current one until the hash has at least
    /// `difficulty` leading zero hex digits. Does not return for unsatisfiable
    /// difficulties; use [`Block::mine_cancellable`] when the caller needs a way out.
    pub fn mine(&mut self, difficulty: u32) {
        while !meets_difficulty(&self.hash, difficulty) {
            self.nonce = self.nonce.wrapping_add(1);
            self.hash = self.calculate_hash();
        }
    }

    /// Same search as [`Block::mine`], checking `cancel` before every attempt.
    pub fn mine_cancellable(
        &mut self,
        difficulty: u32,
        cancel: &MiningCancel,
    ) -> Result<(), ChainError> {
        while !meets_difficulty(&self.hash, difficulty) {
            if cancel.is_cancelled() {
                return Err(ChainError::MiningAborted);
            }
            self.nonce = self.nonce.wrapping_add(1);
            self.hash = self.calculate_hash();
        }
        Ok(())
    }

    pub fn summary(&self) -> BlockSummary {
        BlockSummary {
            index: self.index,
            hash: self.hash.clone(),
            previous_hash: self.previous_hash.clone(),
            timestamp: self.timestamp,
        }
    }

    /// Overwrites the stored digest without recomputing it.
    #[cfg(test)]
    pub(crate) fn set_hash_unchecked(&mut self, hash: String) {
        self.hash = hash;
    }
}
