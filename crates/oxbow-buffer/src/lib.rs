//! Buffer pool management for OxbowDB.
//!
//! This crate provides in-memory page caching with:
//! - Fixed-size buffer pool with configurable frame count
//! - LRU eviction policy for cache management
//! - Pin counting for concurrent access
//! - Dirty page tracking with write-back through the disk layer
//! - RAII page guards coupling the frame latch to the pin

mod disk;
mod frame;
mod pool;
mod replacer;

pub use disk::DiskIo;
pub use frame::{BufferFrame, FrameId};
pub use pool::{BufferPool, BufferPoolConfig, BufferPoolStats, PageReadGuard, PageWriteGuard};
pub use replacer::{LruReplacer, Replacer};
