use crate::blockchain::core::chain::Blockchain;
use crate::error::ChainError;

impl Blockchain {
    /// Walks the chain from index 1, checking each stored hash against a
    /// recomputation and each `previous_hash` against its predecessor. Stops at
    /// the first mismatch. Genesis is only the anchor and is not rechecked.
    pub fn validate_chain(&self) -> Result<(), ChainError> {
        for pair in self.blocks.windows(2) {
            let (previous, current) = (&pair[0], &pair[1]);

            if current.hash() != current.calculate_hash() {
                return Err(ChainError::ChainIntegrityViolation {
                    index: current.index,
                    reason: format!(
                        "Stored hash {} does not match recomputed {}",
                        current.hash(),
                        current.calculate_hash()
                    ),
                });
            }

            if current.previous_hash != previous.hash() {
                return Err(ChainError::ChainIntegrityViolation {
                    index: current.index,
                    reason: format!(
                        "previous_hash {} does not match block {} hash {}",
                        current.previous_hash,
                        previous.index,
                        previous.hash()
                    ),
                });
            }
        }
        Ok(())
    }

    pub fn is_chain_valid(&self) -> bool {
        match self.validate_chain() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "chain validation failed");
                false
            }
        }
    }

    /// Checks transaction signatures across every block.
    ///
    /// Block digests do not cover transactions, so this is the only check that
    /// notices edited transaction contents.
    pub fn verify_transaction_signatures(&self) -> bool {
        self.blocks
            .iter()
            .flat_map(|block| block.transactions.iter())
            .all(|tx| tx.is_valid())
    }
}
