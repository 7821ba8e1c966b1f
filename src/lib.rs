//! GasChain - a proof-of-work sealed ledger for gas station metering
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Blockchain
//! - [`transaction`] - Gas-flow transactions, signing and signature checks
//! - [`blockchain`] - Blocks, the chain, validation and the concurrent engine
//! - [`mempool`] - Pending transaction pool
//!
//! ## Consensus
//! - [`miner`] - Proof-of-work predicate and mining cancellation
//!
//! ## Cryptography
//! - [`crypto`] - secp256k1 signatures and station identities
//!
//! ## Integration
//! - [`persistence`] - Block hash references (SQLite)
//! - [`anomaly`] - Hook for an external anomaly classifier
//! - [`api`] - HTTP API
//! - [`node`] - Node orchestration
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Blockchain
// ============================================================================
pub mod blockchain;
pub mod mempool;
pub mod transaction;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod miner;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Integration
// ============================================================================
pub mod anomaly;
#[cfg(feature = "api")]
pub mod api;
pub mod node;
pub mod persistence;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;

pub use blockchain::{Block, BlockSummary, Blockchain, ChainEngine};
pub use error::{ChainError, Result};
pub use miner::MiningCancel;
pub use transaction::{Transaction, GENESIS_SENDER};
