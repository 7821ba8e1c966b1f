/// Validation logic for transactions separated from type definitions
use crate::crypto::{public_key_from_identity, verify_signature};
use crate::error::ChainError;
use crate::transaction::types::{Transaction, MAX_TRANSACTION_SIZE};

impl Transaction {
    /// Signature validity as a pure predicate. Genesis transactions are always valid.
    pub fn is_valid(&self) -> bool {
        self.verify_signature().is_ok()
    }

    /// Explains why [`Transaction::is_valid`] would return false.
    pub fn verify_signature(&self) -> Result<(), ChainError> {
        if self.is_genesis() {
            return Ok(());
        }

        let signature = self.signature.as_deref().ok_or_else(|| {
            ChainError::InvalidSignatureEncoding("Transaction not signed".to_string())
        })?;
        let public_key = public_key_from_identity(&self.sender)?;

        verify_signature(&public_key, &self.signable_message(), signature)
    }

    /// Metered quantities must be finite and non-negative.
    pub fn validate_amounts(&self) -> Result<(), ChainError> {
        let fields = [
            ("amount", self.amount),
            ("input_gas", self.input_gas),
            ("output_gas", self.output_gas),
            ("self_consumption", self.self_consumption),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(ChainError::InvalidTransaction(format!(
                    "{} must be a finite number",
                    name
                )));
            }
            if value < 0.0 {
                return Err(ChainError::InvalidTransaction(format!(
                    "{} must be non-negative, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Validate transaction size to prevent DoS attacks
    pub fn validate_size(&self) -> Result<(), ChainError> {
        let serialized = bincode::serialize(self)
            .map_err(|e| ChainError::InvalidTransaction(format!("Serialization failed: {}", e)))?;

        if serialized.len() > MAX_TRANSACTION_SIZE {
            return Err(ChainError::InvalidTransaction(format!(
                "Transaction too large: {} bytes (max: {})",
                serialized.len(),
                MAX_TRANSACTION_SIZE
            )));
        }
        Ok(())
    }
}
