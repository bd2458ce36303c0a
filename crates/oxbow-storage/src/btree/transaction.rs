//! Per-operation scratchpad for a tree descent.

use oxbow_buffer::PageWriteGuard;
use oxbow_common::page::PageId;

/// Holds the write-latched ancestors of the current descent frontier
/// plus the page ids queued for deletion once the operation finishes.
///
/// Dropping a guard releases its latch and then its pin, so clearing
/// the ancestor list is how the crabbing protocol lets go of the path
/// above a safe node.
pub struct Transaction<'a> {
    latched: Vec<PageWriteGuard<'a>>,
    deleted: Vec<PageId>,
}

impl<'a> Transaction<'a> {
    /// Creates an empty scratchpad.
    pub fn new() -> Self {
        Self {
            latched: Vec::new(),
            deleted: Vec::new(),
        }
    }

    /// Appends a latched ancestor. Guards are kept in descent order.
    pub fn push_latched(&mut self, guard: PageWriteGuard<'a>) {
        self.latched.push(guard);
    }

    /// Removes and returns the deepest latched ancestor.
    pub fn pop_latched(&mut self) -> Option<PageWriteGuard<'a>> {
        self.latched.pop()
    }

    /// Releases every latched ancestor, shallowest first.
    pub fn release_all(&mut self) {
        self.latched.clear();
    }

    /// Queues a page for deletion after the operation completes.
    pub fn defer_delete(&mut self, page_id: PageId) {
        self.deleted.push(page_id);
    }

    /// Takes the queued deletions.
    pub fn take_deleted(&mut self) -> Vec<PageId> {
        std::mem::take(&mut self.deleted)
    }
}

impl Default for Transaction<'_> {
    fn default() -> Self {
        Self::new()
    }
}
