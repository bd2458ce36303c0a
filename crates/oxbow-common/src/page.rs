//! Page identifiers and constants for OxbowDB storage.

use serde::{Deserialize, Serialize};

/// Default page size in bytes (16 KB).
pub const PAGE_SIZE: usize = 16 * 1024;

/// Page id of the directory (header) page that records index roots.
pub const HEADER_PAGE_ID: PageId = PageId(0);

/// Unique identifier for a page in the backing file.
///
/// Page ids are signed 32-bit values; negative ids are reserved for the
/// invalid sentinel. Page 0 is the directory page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId(pub i32);

impl PageId {
    /// Sentinel meaning "no page".
    pub const INVALID: PageId = PageId(-1);

    /// Returns true if this is a valid page id.
    pub fn is_valid(&self) -> bool {
        self.0 >= 0
    }

    /// Returns the byte offset of this page in the backing file.
    pub fn offset(&self) -> u64 {
        (self.0 as u64) * (PAGE_SIZE as u64)
    }
}

impl std::fmt::Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "page:{}", self.0)
        } else {
            write!(f, "page:invalid")
        }
    }
}
