//! Pending transaction pool
//!
//! Transactions wait here, in submission order, until a block seals them.

use crate::transaction::Transaction;

#[derive(Debug, Clone, Default)]
pub struct Mempool {
    transactions: Vec<Transaction>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts a transaction. No validation happens here.
    pub fn add_transaction(&mut self, tx: Transaction) {
        self.transactions.push(tx);
    }

    /// Owned copy of the pool, in submission order.
    pub fn get_all_transactions(&self) -> Vec<Transaction> {
        self.transactions.clone()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Removes the transactions a block sealed.
    ///
    /// They are normally the oldest entries. If the pool was rewritten while the
    /// block was mined, each sealed transaction is removed by hash instead, so
    /// later submissions are never lost.
    pub fn remove_sealed(&mut self, sealed: &[Transaction]) {
        if self.transactions.starts_with(sealed) {
            self.transactions.drain(..sealed.len());
            return;
        }

        for tx in sealed {
            let hash = tx.hash();
            if let Some(pos) = self.transactions.iter().position(|pending| pending.hash() == hash) {
                self.transactions.remove(pos);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(receiver: &str) -> Transaction {
        Transaction::new("A", receiver, 1.0, 0.0, 0.0, 0.0)
    }

    #[test]
    fn test_preserves_submission_order() {
        let mut pool = Mempool::new();
        pool.add_transaction(tx("B"));
        pool.add_transaction(tx("C"));
        let receivers: Vec<_> = pool
            .get_all_transactions()
            .into_iter()
            .map(|t| t.receiver)
            .collect();
        assert_eq!(receivers, vec!["B", "C"]);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut pool = Mempool::new();
        pool.add_transaction(tx("B"));
        let snapshot = pool.get_all_transactions();
        pool.add_transaction(tx("C"));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_remove_sealed_keeps_newer_transactions() {
        let mut pool = Mempool::new();
        pool.add_transaction(tx("B"));
        pool.add_transaction(tx("C"));
        pool.add_transaction(tx("D"));
        pool.remove_sealed(&[tx("B"), tx("C")]);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.transactions()[0].receiver, "D");
    }

    #[test]
    fn test_remove_sealed_after_pool_rewrite() {
        let mut pool = Mempool::new();
        pool.add_transaction(tx("late"));
        pool.add_transaction(tx("B"));

        pool.remove_sealed(&[tx("first"), tx("B")]);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.transactions()[0].receiver, "late");
    }
}
