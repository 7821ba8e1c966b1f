// Thin re-export module: implementation is in `blockchain/core.rs`, split into
// block structure, chain management, the concurrent engine and validation.

pub mod core;
pub use core::*;
