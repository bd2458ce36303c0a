//! Interface to the disk layer that materializes pages.

use oxbow_common::page::PageId;
use oxbow_common::Result;

/// Byte-level page reader/writer backing the buffer pool.
///
/// The pool calls this on a miss (read), when evicting a dirty frame
/// (write), on explicit flush, and when creating or deleting pages.
/// Implementations must be internally serializable; the pool adds no
/// locking around these calls.
pub trait DiskIo: Send + Sync {
    /// Copies the on-disk contents of `page_id` into `buf` (page-sized).
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<()>;

    /// Persists `buf` as the content of `page_id`.
    fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<()>;

    /// Reserves and returns a fresh page id.
    fn allocate_page(&self) -> Result<PageId>;

    /// Releases a page id.
    fn deallocate_page(&self, page_id: PageId);
}
