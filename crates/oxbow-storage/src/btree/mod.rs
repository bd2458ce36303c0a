//! Concurrent B+ tree index built on the buffer pool.
//!
//! Nodes live inside buffer-pool frames and are interpreted in place;
//! `page` defines the layouts, `index` the tree-level operations and
//! the latch-crabbing protocol, `iterator` the forward range scan, and
//! `transaction` the per-descent scratchpad of held latches and
//! deferred page deletions.
//!
//! Node layout (fixed-size entries, 16 bytes each):
//!
//! ```text
//! +------------------+ 0
//! | header           | 16  (type, size, max_size, page id, parent)
//! | next leaf id     | 24  (leaf only)
//! +------------------+
//! | key_0  | value_0 |     sorted entries; internal slot 0 holds a
//! | key_1  | value_1 |     sentinel key that is never compared
//! | ...              |
//! +------------------+
//! ```

pub mod constants;
pub mod index;
pub mod iterator;
pub mod page;
pub mod transaction;

pub use constants::{INTERNAL_DEFAULT_MAX_SIZE, LEAF_DEFAULT_MAX_SIZE};
pub use index::BTreeIndex;
pub use iterator::BTreeIterator;
pub use page::{InternalMut, InternalRef, LeafMut, LeafRef, NodeRef, NodeType};
pub use transaction::Transaction;
