//! # Memory Management
//!
//! Bit-level bookkeeping shared by the storage layers.
//!
//! Storage is index-based throughout: blocks live in vectors and are found
//! through bitsets, never through raw pointers.

mod bit_indexer;

pub use bit_indexer::BitIndexer;
pub(crate) use bit_indexer::SetBits;
