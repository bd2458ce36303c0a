//! OxbowDB storage layer.
//!
//! This crate provides the disk-facing half of the storage engine:
//! - Disk manager for page-level file I/O
//! - Directory page recording index roots
//! - Concurrent B+ tree index built on the buffer pool

pub mod btree;
pub mod disk;
pub mod header;

pub use btree::{BTreeIndex, BTreeIterator};
pub use disk::{DiskManager, DiskManagerConfig};
pub use header::{HeaderMut, HeaderRef};
