//! Transaction pool.
//!
//! Two insertion-ordered, hash-indexed sets share transactions:
//! - `all`: every transaction seen, bounded; the oldest is evicted first
//! - `pending`: transactions waiting for the next block
//!
//! Order is arrival order and is used for eviction only; there is no fee
//! priority.

pub mod pool;
pub mod sorted_map;

pub use pool::{TxPool, DEFAULT_POOL_CAPACITY};
pub use sorted_map::TxSortedMap;
