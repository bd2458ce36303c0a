//! Forward range scan over the leaf level.

use super::page::LeafRef;
use log::warn;
use oxbow_buffer::{BufferPool, PageReadGuard};
use oxbow_common::types::RecordId;

/// Cursor over the leaf chain, yielding entries in ascending key order.
///
/// Holds exactly one leaf pinned and read-latched at a time. When a
/// leaf is exhausted, the next leaf is latched before the current one
/// is released, so the chain cannot be unlinked between the two.
pub struct BTreeIterator<'a> {
    pool: &'a BufferPool,
    guard: Option<PageReadGuard<'a>>,
    index: usize,
}

impl<'a> BTreeIterator<'a> {
    pub(crate) fn new(pool: &'a BufferPool, guard: Option<PageReadGuard<'a>>, index: usize) -> Self {
        Self { pool, guard, index }
    }
}

impl Iterator for BTreeIterator<'_> {
    type Item = (u64, RecordId);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let next_id = {
                let guard = self.guard.as_ref()?;
                let leaf = LeafRef::new(guard.data());
                if self.index < leaf.size() {
                    let entry = (leaf.key_at(self.index), leaf.value_at(self.index));
                    self.index += 1;
                    return Some(entry);
                }
                leaf.next_page_id()
            };

            if !next_id.is_valid() {
                self.guard = None;
                return None;
            }
            match self.pool.read_page(next_id) {
                Ok(next_guard) => {
                    // The old guard is dropped only after the new leaf
                    // is latched.
                    self.guard = Some(next_guard);
                    self.index = 0;
                }
                Err(e) => {
                    warn!("range scan ended early: {e}");
                    self.guard = None;
                    return None;
                }
            }
        }
    }
}
