//! Proof-of-work predicate and mining cancellation
//!
//! A block is mined by searching for a nonce whose block hash starts with
//! `difficulty` hexadecimal zeros. The search itself lives on
//! [`Block`](crate::blockchain::Block); this module holds the pieces shared with
//! the chain engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Largest satisfiable difficulty: a SHA-256 hex digest has 64 digits.
pub const MAX_DIFFICULTY: u32 = 64;

/// True when `hash` starts with at least `difficulty` `'0'` hex digits.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let required = difficulty as usize;
    hash.len() >= required && hash.bytes().take(required).all(|b| b == b'0')
}

/// Number of leading `'0'` hex digits in `hash`.
pub fn leading_zeros(hash: &str) -> u32 {
    hash.bytes().take_while(|b| *b == b'0').count() as u32
}

/// Shared flag used to stop an in-flight nonce search.
///
/// Clones observe the same flag, so one clone can be handed to the mining
/// worker while another stays with whoever may need to abort it.
#[derive(Debug, Clone, Default)]
pub struct MiningCancel {
    cancelled: Arc<AtomicBool>,
}

impl MiningCancel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Returns a guard that cancels this handle when dropped unless disarmed.
    pub fn guard(&self) -> CancelOnDrop {
        CancelOnDrop {
            cancel: self.clone(),
            armed: true,
        }
    }
}

/// Cancels the wrapped search when dropped. Used so that dropping a `seal`
/// future also stops its blocking mining worker.
#[derive(Debug)]
pub struct CancelOnDrop {
    cancel: MiningCancel,
    armed: bool,
}

impl CancelOnDrop {
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if self.armed {
            self.cancel.cancel();
        }
    }
}
