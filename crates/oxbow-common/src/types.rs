//! Shared value types for OxbowDB storage.

use crate::page::PageId;
use serde::{Deserialize, Serialize};

/// Location of a record: the page that holds it plus its slot number.
///
/// This is the fixed-size value stored in index leaves. It packs into
/// 8 bytes for page-resident storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId {
    /// Page holding the record.
    pub page_id: PageId,
    /// Slot number within the page.
    pub slot_num: u32,
}

impl RecordId {
    /// Creates a new RecordId.
    pub fn new(page_id: PageId, slot_num: u32) -> Self {
        Self { page_id, slot_num }
    }

    /// Returns the RecordId packed as a single u64 for compact storage.
    /// Layout: upper 32 bits = page id, lower 32 bits = slot number.
    pub fn as_u64(&self) -> u64 {
        ((self.page_id.0 as u32 as u64) << 32) | (self.slot_num as u64)
    }

    /// Unpacks a RecordId from its u64 representation.
    pub fn from_u64(value: u64) -> Self {
        Self {
            page_id: PageId((value >> 32) as u32 as i32),
            slot_num: value as u32,
        }
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.page_id, self.slot_num)
    }
}
