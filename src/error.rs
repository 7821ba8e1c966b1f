//! Error types for GasChain

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    /// Sealing was requested while no transactions were pending.
    #[error("Pending pool is empty: nothing to seal")]
    EmptyPool,
    #[error("Invalid signature encoding: {0}")]
    InvalidSignatureEncoding(String),
    #[error("Chain integrity violation at block {index}: {reason}")]
    ChainIntegrityViolation { index: u64, reason: String },
    /// Mining was cancelled before a valid nonce was found.
    #[error("Mining aborted")]
    MiningAborted,
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("Cryptographic error: {0}")]
    CryptoError(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Bincode error: {0}")]
    BincodeError(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for ChainError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        ChainError::BincodeError(err.to_string())
    }
}

impl From<rusqlite::Error> for ChainError {
    fn from(err: rusqlite::Error) -> Self {
        ChainError::DatabaseError(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::ConfigError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ChainError::EmptyPool.to_string(),
            "Pending pool is empty: nothing to seal"
        );
        let err = ChainError::ChainIntegrityViolation {
            index: 3,
            reason: "hash mismatch".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Chain integrity violation at block 3: hash mismatch"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ChainError = io.into();
        assert!(matches!(err, ChainError::IoError(msg) if msg.contains("missing")));
    }
}
