//! Hook for an external anomaly classifier.
//!
//! The chain only carries the verdict; classification happens elsewhere.

use crate::transaction::Transaction;

pub trait AnomalyOracle: Send + Sync {
    fn is_anomalous(&self, tx: &Transaction) -> bool;
}

/// Flags nothing. Used when no classifier is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAnomalyOracle;

impl AnomalyOracle for NoAnomalyOracle {
    fn is_anomalous(&self, _tx: &Transaction) -> bool {
        false
    }
}

impl<F> AnomalyOracle for F
where
    F: Fn(&Transaction) -> bool + Send + Sync,
{
    fn is_anomalous(&self, tx: &Transaction) -> bool {
        self(tx)
    }
}
