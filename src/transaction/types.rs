/// Transaction types for GasChain
use crate::crypto::KeyPair;
use crate::error::ChainError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Maximum transaction size in bytes (100KB) to prevent DoS
pub const MAX_TRANSACTION_SIZE: usize = 100_000;

/// Sender reserved for the chain itself. Transactions from it need no signature.
pub const GENESIS_SENDER: &str = "genesis";

/// A metered gas-flow event reported by a distribution station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub receiver: String,
    pub amount: f64,
    pub input_gas: f64,
    pub output_gas: f64,
    pub self_consumption: f64,
    #[serde(default)]
    pub signature: Option<String>,
}

impl Transaction {
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: f64,
        input_gas: f64,
        output_gas: f64,
        self_consumption: f64,
    ) -> Self {
        Transaction {
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
            input_gas,
            output_gas,
            self_consumption,
            signature: None,
        }
    }

    /// The sentinel transaction carried by the genesis block.
    pub fn genesis() -> Self {
        Transaction::new(GENESIS_SENDER, "network", 0.0, 0.0, 0.0, 0.0)
    }

    pub fn is_genesis(&self) -> bool {
        self.sender == GENESIS_SENDER
    }

    /// Canonical bytes covered by the signature: `(sender, receiver, amount)`.
    ///
    /// Strings are length-prefixed so that `("ab", "c")` and `("a", "bc")` never
    /// collide.
    pub fn signable_message(&self) -> Vec<u8> {
        let mut message = Vec::new();
        message.extend_from_slice("GASTX:".as_bytes());
        message.extend_from_slice(&(self.sender.len() as u64).to_le_bytes());
        message.extend_from_slice(self.sender.as_bytes());
        message.extend_from_slice(&(self.receiver.len() as u64).to_le_bytes());
        message.extend_from_slice(self.receiver.as_bytes());
        message.extend_from_slice(&self.amount.to_le_bytes());
        message
    }

    /// Signs the canonical message, replacing any earlier signature.
    pub fn sign(&mut self, keypair: &KeyPair) -> Result<(), ChainError> {
        let signature = keypair.sign(&self.signable_message())?;
        self.signature = Some(hex::encode(signature));
        Ok(())
    }

    /// Stable identifier for logs and API responses.
    pub fn hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.signable_message());
        hasher.update(self.input_gas.to_le_bytes());
        hasher.update(self.output_gas.to_le_bytes());
        hasher.update(self.self_consumption.to_le_bytes());
        if let Some(signature) = &self.signature {
            hasher.update(signature.as_bytes());
        }
        hasher.finalize().into()
    }

    pub fn hash_str(&self) -> String {
        hex::encode(self.hash())
    }
}
