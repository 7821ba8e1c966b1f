//! Block reference persistence for GasChain
//!
//! Only the hash of each sealed block is stored, keyed by insertion order.
//! Full block contents live in memory with the chain engine.

use crate::error::ChainError;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A persisted pointer to a sealed block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockReference {
    /// Insertion order, starting at 1.
    pub id: i64,
    pub block_index: u64,
    pub block_hash: String,
    /// RFC 3339 time the reference was recorded.
    pub recorded_at: String,
}

/// Abstraction for persistence backends.
pub trait Persistence: Send + Sync {
    fn record_block_hash(&self, block_index: u64, block_hash: &str)
        -> Result<BlockReference, ChainError>;
    fn list_block_refs(&self) -> Result<Vec<BlockReference>, ChainError>;
    fn find_block_ref(&self, block_hash: &str) -> Result<Option<BlockReference>, ChainError>;
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &str) -> Result<Self, ChainError> {
        let conn = Connection::open(path)
            .map_err(|e| ChainError::DatabaseError(format!("Failed to open database: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS blocks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                block_index INTEGER NOT NULL,
                block_hash TEXT NOT NULL UNIQUE,
                recorded_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| ChainError::DatabaseError(format!("Failed to create blocks table: {}", e)))?;

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    fn row_to_reference(row: &Row<'_>) -> rusqlite::Result<BlockReference> {
        Ok(BlockReference {
            id: row.get(0)?,
            block_index: row.get::<_, i64>(1)? as u64,
            block_hash: row.get(2)?,
            recorded_at: row.get(3)?,
        })
    }
}

impl Persistence for Database {
    fn record_block_hash(
        &self,
        block_index: u64,
        block_hash: &str,
    ) -> Result<BlockReference, ChainError> {
        let recorded_at = chrono::Utc::now().to_rfc3339();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO blocks (block_index, block_hash, recorded_at) VALUES (?1, ?2, ?3)",
            params![block_index as i64, block_hash, recorded_at],
        )
        .map_err(|e| ChainError::DatabaseError(format!("Failed to record block hash: {}", e)))?;

        Ok(BlockReference {
            id: conn.last_insert_rowid(),
            block_index,
            block_hash: block_hash.to_string(),
            recorded_at,
        })
    }

    fn list_block_refs(&self) -> Result<Vec<BlockReference>, ChainError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, block_index, block_hash, recorded_at FROM blocks ORDER BY id ASC",
        )?;
        let refs = stmt
            .query_map([], Self::row_to_reference)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(refs)
    }

    fn find_block_ref(&self, block_hash: &str) -> Result<Option<BlockReference>, ChainError> {
        let conn = self.conn.lock();
        let found = conn
            .query_row(
                "SELECT id, block_index, block_hash, recorded_at FROM blocks WHERE block_hash = ?1",
                params![block_hash],
                Self::row_to_reference,
            )
            .optional()?;
        Ok(found)
    }
}

/// Simple in-memory persistence implementation useful for tests and ephemeral runs.
#[derive(Clone, Default)]
pub struct InMemoryPersistence {
    refs: Arc<Mutex<Vec<BlockReference>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persistence for InMemoryPersistence {
    fn record_block_hash(
        &self,
        block_index: u64,
        block_hash: &str,
    ) -> Result<BlockReference, ChainError> {
        let mut refs = self.refs.lock();
        if refs.iter().any(|r| r.block_hash == block_hash) {
            return Err(ChainError::DatabaseError(format!(
                "Block hash {} already recorded",
                block_hash
            )));
        }
        let reference = BlockReference {
            id: refs.len() as i64 + 1,
            block_index,
            block_hash: block_hash.to_string(),
            recorded_at: chrono::Utc::now().to_rfc3339(),
        };
        refs.push(reference.clone());
        Ok(reference)
    }

    fn list_block_refs(&self) -> Result<Vec<BlockReference>, ChainError> {
        Ok(self.refs.lock().clone())
    }

    fn find_block_ref(&self, block_hash: &str) -> Result<Option<BlockReference>, ChainError> {
        Ok(self
            .refs
            .lock()
            .iter()
            .find(|r| r.block_hash == block_hash)
            .cloned())
    }
}
