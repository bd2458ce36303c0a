//! Buffer pool manager.

use crate::disk::DiskIo;
use crate::frame::{BufferFrame, FrameId};
use crate::replacer::{LruReplacer, Replacer};
use log::{debug, warn};
use oxbow_common::page::{PageId, PAGE_SIZE};
use oxbow_common::{OxbowError, Result};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use sysinfo::System;

/// Configuration for the buffer pool.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Number of frames in the pool.
    pub num_frames: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self { num_frames: 1024 }
    }
}

/// Metadata protected by the pool mutex.
struct PoolInner {
    /// Page ID to frame ID mapping.
    page_table: HashMap<PageId, FrameId>,
    /// Frames not holding any page. Preferred over eviction.
    free_list: VecDeque<FrameId>,
}

/// Buffer pool manager.
///
/// Manages a fixed-size pool of page frames with:
/// - Page ID to frame ID mapping and a free frame list, both behind a
///   single mutex
/// - LRU replacement for eviction when the free list is empty
/// - Pin counting for concurrent access
/// - Dirty page write-back through the disk layer
///
/// Callers obtain frames by page id, read or write the bytes under the
/// frame's own latch, then unpin. The pool is agnostic to page contents.
pub struct BufferPool {
    /// Configuration.
    config: BufferPoolConfig,
    /// Array of buffer frames.
    frames: Vec<BufferFrame>,
    /// Page table and free list.
    inner: Mutex<PoolInner>,
    /// Page replacement policy.
    replacer: LruReplacer,
    /// Backing store for pages.
    disk: Arc<dyn DiskIo>,
}

impl BufferPool {
    /// Creates a new buffer pool.
    pub fn new(config: BufferPoolConfig, disk: Arc<dyn DiskIo>) -> Self {
        let num_frames = config.num_frames;

        let frames: Vec<_> = (0..num_frames)
            .map(|i| BufferFrame::new(FrameId(i as u32)))
            .collect();

        // All frames start in the free list, lowest id first.
        let free_list: VecDeque<_> = (0..num_frames).map(|i| FrameId(i as u32)).collect();

        Self {
            config,
            frames,
            inner: Mutex::new(PoolInner {
                page_table: HashMap::with_capacity(num_frames),
                free_list,
            }),
            replacer: LruReplacer::new(num_frames),
            disk,
        }
    }

    /// Creates a buffer pool sized to 25% of available system RAM,
    /// with a floor of 1,000 frames.
    pub fn auto_sized(disk: Arc<dyn DiskIo>) -> Self {
        let mut sys = System::new_all();
        sys.refresh_memory();

        let available_bytes = sys.available_memory() as usize;
        let target_bytes = available_bytes / 4;
        let num_frames = (target_bytes / PAGE_SIZE).max(1_000);

        Self::new(BufferPoolConfig { num_frames }, disk)
    }

    /// Returns the number of frames in the pool.
    pub fn num_frames(&self) -> usize {
        self.config.num_frames
    }

    /// Returns the number of free frames.
    pub fn free_count(&self) -> usize {
        self.inner.lock().free_list.len()
    }

    /// Returns the number of pages currently in the pool.
    pub fn page_count(&self) -> usize {
        self.inner.lock().page_table.len()
    }

    /// Checks if a page is resident in the buffer pool.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.inner.lock().page_table.contains_key(&page_id)
    }

    /// Takes a frame to install a page into: the free list is preferred;
    /// otherwise the LRU victim is evicted, writing its contents back if
    /// dirty. The returned frame is empty and in neither the free list
    /// nor the replacer.
    fn take_victim_frame(&self, inner: &mut PoolInner) -> Result<FrameId> {
        if let Some(frame_id) = inner.free_list.pop_front() {
            // Free frames are always empty, nothing to evict.
            return Ok(frame_id);
        }

        // Frames pinned while their latch is taken (an in-flight flush)
        // are passed over in place rather than removed.
        let frame_id = self
            .replacer
            .victim_if(|frame_id| self.frames[frame_id.0 as usize].pin_count() == 0)
            .ok_or(OxbowError::BufferPoolFull)?;
        let frame = &self.frames[frame_id.0 as usize];
        let old_page_id = frame.page_id();
        if old_page_id.is_valid() {
            if frame.is_dirty() {
                // The victim is unpinned, so its latch is uncontended.
                let data = frame.read_data();
                if let Err(e) = self.disk.write_page(old_page_id, &**data) {
                    drop(data);
                    self.replacer.unpin(frame_id);
                    return Err(e);
                }
                debug!("wrote back dirty {} from {}", old_page_id, frame_id);
            }
            inner.page_table.remove(&old_page_id);
        }
        frame.reset();
        Ok(frame_id)
    }

    /// Fetches a page, reading it from disk on a miss.
    ///
    /// The returned frame is pinned; the caller must pair this with
    /// exactly one `unpin_page`. Fails with `BufferPoolFull` when every
    /// frame is pinned.
    pub fn fetch_page(&self, page_id: PageId) -> Result<&BufferFrame> {
        if !page_id.is_valid() {
            return Err(OxbowError::PageNotFound(page_id.0));
        }

        let mut inner = self.inner.lock();

        if let Some(&frame_id) = inner.page_table.get(&page_id) {
            let frame = &self.frames[frame_id.0 as usize];
            self.replacer.pin(frame_id);
            frame.pin();
            return Ok(frame);
        }

        let frame_id = self.take_victim_frame(&mut inner)?;
        let frame = &self.frames[frame_id.0 as usize];
        {
            let mut data = frame.write_data();
            if let Err(e) = self.disk.read_page(page_id, &mut **data) {
                drop(data);
                frame.reset();
                inner.free_list.push_front(frame_id);
                return Err(e);
            }
        }
        frame.set_page_id(page_id);
        inner.page_table.insert(page_id, frame_id);
        self.replacer.pin(frame_id);
        frame.set_pin_count(1);
        Ok(frame)
    }

    /// Creates a new page, allocating an id from the disk layer.
    ///
    /// The frame's bytes are zeroed rather than read from disk. The
    /// returned frame is pinned.
    pub fn new_page(&self) -> Result<(PageId, &BufferFrame)> {
        let mut inner = self.inner.lock();

        let frame_id = self.take_victim_frame(&mut inner)?;
        let frame = &self.frames[frame_id.0 as usize];

        let page_id = match self.disk.allocate_page() {
            Ok(page_id) => page_id,
            Err(e) => {
                inner.free_list.push_front(frame_id);
                return Err(e);
            }
        };

        frame.set_page_id(page_id);
        inner.page_table.insert(page_id, frame_id);
        self.replacer.pin(frame_id);
        frame.set_pin_count(1);
        Ok((page_id, frame))
    }

    /// Releases one pin on a page.
    ///
    /// When the pin count reaches zero the frame becomes evictable. The
    /// dirty argument is merged into the frame's dirty flag; unpinning
    /// never clears it. Returns false if the page is not resident or was
    /// not pinned.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let inner = self.inner.lock();

        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return false;
        };
        let frame = &self.frames[frame_id.0 as usize];
        if frame.pin_count() == 0 {
            warn!("unpin of {} with zero pin count", page_id);
            return false;
        }
        if is_dirty {
            frame.set_dirty(true);
        }
        if frame.unpin() == 0 {
            self.replacer.unpin(frame_id);
        }
        true
    }

    /// Writes a page's bytes to disk and clears its dirty flag.
    ///
    /// Returns Ok(false) if the page id is invalid or not resident.
    /// The caller-visible pin count is unchanged and the frame's
    /// replacer entry, if any, keeps its place in the eviction order:
    /// flushing an idle page does not make it look recently used.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        if !page_id.is_valid() {
            return Ok(false);
        }

        let (frame, frame_id) = {
            let inner = self.inner.lock();
            let Some(&frame_id) = inner.page_table.get(&page_id) else {
                return Ok(false);
            };
            let frame = &self.frames[frame_id.0 as usize];
            // Victim selection passes over pinned frames, so raising the
            // pin is enough to keep the frame ours while the pool mutex
            // is released to wait for the latch; the replacer entry is
            // left alone.
            frame.pin();
            (frame, frame_id)
        };

        let result = {
            let data = frame.read_data();
            self.disk.write_page(page_id, &**data)
        };
        if result.is_ok() {
            frame.set_dirty(false);
        }

        {
            let _inner = self.inner.lock();
            if frame.unpin() == 0 {
                // No-op while the entry is still tracked, so an idle
                // frame keeps its position; a frame fetched during the
                // write re-enters at the front like any other unpin.
                self.replacer.unpin(frame_id);
            }
        }
        result.map(|_| true)
    }

    /// Flushes every resident page. Returns the number flushed.
    pub fn flush_all(&self) -> Result<usize> {
        let page_ids: Vec<PageId> = {
            let inner = self.inner.lock();
            inner.page_table.keys().copied().collect()
        };

        let mut flushed = 0;
        for page_id in page_ids {
            if self.flush_page(page_id)? {
                flushed += 1;
            }
        }
        Ok(flushed)
    }

    /// Deletes a page from the pool and deallocates its id.
    ///
    /// Returns true if the page was deleted or was already absent;
    /// false if the page is pinned.
    pub fn delete_page(&self, page_id: PageId) -> bool {
        let mut inner = self.inner.lock();

        let Some(&frame_id) = inner.page_table.get(&page_id) else {
            return true;
        };
        let frame = &self.frames[frame_id.0 as usize];
        if frame.pin_count() > 0 {
            return false;
        }

        self.disk.deallocate_page(page_id);
        self.replacer.pin(frame_id);
        frame.reset();
        inner.page_table.remove(&page_id);
        inner.free_list.push_back(frame_id);
        true
    }

    /// Fetches a page and acquires its latch in shared mode.
    pub fn read_page(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let frame = self.fetch_page(page_id)?;
        Ok(PageReadGuard {
            data: frame.read_data(),
            unpinner: Unpinner {
                pool: self,
                page_id,
                dirty: false,
            },
        })
    }

    /// Fetches a page and acquires its latch in exclusive mode.
    pub fn write_page(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let frame = self.fetch_page(page_id)?;
        Ok(PageWriteGuard {
            data: frame.write_data(),
            unpinner: Unpinner {
                pool: self,
                page_id,
                dirty: false,
            },
        })
    }

    /// Creates a new page and acquires its latch in exclusive mode.
    pub fn new_page_write(&self) -> Result<PageWriteGuard<'_>> {
        let (page_id, frame) = self.new_page()?;
        Ok(PageWriteGuard {
            data: frame.write_data(),
            unpinner: Unpinner {
                pool: self,
                page_id,
                dirty: false,
            },
        })
    }

    /// Returns statistics about the buffer pool.
    pub fn stats(&self) -> BufferPoolStats {
        let inner = self.inner.lock();

        let mut pinned_frames = 0;
        let mut dirty_frames = 0;
        for &frame_id in inner.page_table.values() {
            let frame = &self.frames[frame_id.0 as usize];
            if frame.is_pinned() {
                pinned_frames += 1;
            }
            if frame.is_dirty() {
                dirty_frames += 1;
            }
        }

        BufferPoolStats {
            total_frames: self.config.num_frames,
            free_frames: inner.free_list.len(),
            used_frames: inner.page_table.len(),
            pinned_frames,
            dirty_frames,
        }
    }
}

/// Statistics about the buffer pool.
#[derive(Debug, Clone)]
pub struct BufferPoolStats {
    /// Total number of frames.
    pub total_frames: usize,
    /// Number of free frames.
    pub free_frames: usize,
    /// Number of frames with pages.
    pub used_frames: usize,
    /// Number of pinned frames.
    pub pinned_frames: usize,
    /// Number of dirty frames.
    pub dirty_frames: usize,
}

/// Drops after the latch guard and releases the pin. Field order in the
/// guard structs makes the latch release happen first.
struct Unpinner<'a> {
    pool: &'a BufferPool,
    page_id: PageId,
    dirty: bool,
}

impl Drop for Unpinner<'_> {
    fn drop(&mut self) {
        self.pool.unpin_page(self.page_id, self.dirty);
    }
}

/// RAII guard holding one pin and the shared frame latch.
pub struct PageReadGuard<'a> {
    data: parking_lot::RwLockReadGuard<'a, Box<[u8; PAGE_SIZE]>>,
    unpinner: Unpinner<'a>,
}

impl PageReadGuard<'_> {
    /// Returns the page ID.
    pub fn page_id(&self) -> PageId {
        self.unpinner.page_id
    }

    /// Returns the page bytes.
    pub fn data(&self) -> &[u8] {
        &self.data[..]
    }
}

/// RAII guard holding one pin and the exclusive frame latch.
///
/// Taking a mutable view of the bytes marks the page dirty; the dirty
/// flag is handed to the pool when the guard drops.
pub struct PageWriteGuard<'a> {
    data: parking_lot::RwLockWriteGuard<'a, Box<[u8; PAGE_SIZE]>>,
    unpinner: Unpinner<'a>,
}

impl PageWriteGuard<'_> {
    /// Returns the page ID.
    pub fn page_id(&self) -> PageId {
        self.unpinner.page_id
    }

    /// Returns the page bytes.
    pub fn data(&self) -> &[u8] {
        &self.data[..]
    }

    /// Returns the page bytes for writing and marks the page dirty.
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.unpinner.dirty = true;
        &mut self.data[..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;
    use std::sync::atomic::{AtomicI32, Ordering};

    /// In-memory page store for pool tests.
    struct MemDisk {
        pages: PlMutex<HashMap<PageId, Box<[u8; PAGE_SIZE]>>>,
        next_page_id: AtomicI32,
    }

    impl MemDisk {
        fn new() -> Self {
            Self {
                pages: PlMutex::new(HashMap::new()),
                next_page_id: AtomicI32::new(0),
            }
        }
    }

    impl DiskIo for MemDisk {
        fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
            let pages = self.pages.lock();
            match pages.get(&page_id) {
                Some(data) => buf.copy_from_slice(&data[..]),
                None => buf.fill(0),
            }
            Ok(())
        }

        fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<()> {
            let mut data = Box::new([0u8; PAGE_SIZE]);
            data.copy_from_slice(buf);
            self.pages.lock().insert(page_id, data);
            Ok(())
        }

        fn allocate_page(&self) -> Result<PageId> {
            Ok(PageId(self.next_page_id.fetch_add(1, Ordering::SeqCst)))
        }

        fn deallocate_page(&self, page_id: PageId) {
            self.pages.lock().remove(&page_id);
        }
    }

    fn create_test_pool(num_frames: usize) -> BufferPool {
        BufferPool::new(
            BufferPoolConfig { num_frames },
            Arc::new(MemDisk::new()),
        )
    }

    #[test]
    fn test_buffer_pool_new() {
        let pool = create_test_pool(10);

        assert_eq!(pool.num_frames(), 10);
        assert_eq!(pool.free_count(), 10);
        assert_eq!(pool.page_count(), 0);
    }

    #[test]
    fn test_buffer_pool_new_page() {
        let pool = create_test_pool(10);

        let (page_id, frame) = pool.new_page().unwrap();

        assert_eq!(page_id, PageId(0));
        assert_eq!(frame.page_id(), page_id);
        assert!(frame.is_pinned());
        assert_eq!(pool.free_count(), 9);
        assert_eq!(pool.page_count(), 1);
        assert!(pool.contains(page_id));
    }

    #[test]
    fn test_buffer_pool_reuses_free_frames_in_order() {
        let pool = create_test_pool(4);

        // A fresh pool hands out frames 0, 1, 2, ... in order.
        for i in 0..4 {
            let (_, frame) = pool.new_page().unwrap();
            assert_eq!(frame.frame_id(), FrameId(i));
        }
    }

    #[test]
    fn test_buffer_pool_fetch_existing() {
        let pool = create_test_pool(10);

        let (page_id, _) = pool.new_page().unwrap();
        pool.unpin_page(page_id, false);

        let frame = pool.fetch_page(page_id).unwrap();
        assert_eq!(frame.page_id(), page_id);
        assert!(frame.is_pinned());
    }

    #[test]
    fn test_buffer_pool_fetch_invalid() {
        let pool = create_test_pool(10);
        assert!(pool.fetch_page(PageId::INVALID).is_err());
    }

    #[test]
    fn test_buffer_pool_unpin() {
        let pool = create_test_pool(10);

        let (page_id, frame) = pool.new_page().unwrap();
        assert!(frame.is_pinned());

        assert!(pool.unpin_page(page_id, false));
        assert!(!frame.is_pinned());

        // A second unpin is a caller error.
        assert!(!pool.unpin_page(page_id, false));
    }

    #[test]
    fn test_buffer_pool_unpin_absent() {
        let pool = create_test_pool(10);
        assert!(!pool.unpin_page(PageId(99), false));
    }

    #[test]
    fn test_buffer_pool_dirty_tracking() {
        let pool = create_test_pool(10);

        let (page_id, _) = pool.new_page().unwrap();
        pool.unpin_page(page_id, true);

        let frame = pool.fetch_page(page_id).unwrap();
        assert!(frame.is_dirty());

        // Unpinning clean never clears the dirty flag.
        pool.unpin_page(page_id, false);
        assert!(frame.is_dirty());
    }

    #[test]
    fn test_buffer_pool_eviction_writes_back_dirty() {
        let pool = create_test_pool(1);

        let (page_id1, frame) = pool.new_page().unwrap();
        frame.write_data()[0] = 0xAB;
        pool.unpin_page(page_id1, true);

        // Creating another page evicts the dirty page.
        let (page_id2, _) = pool.new_page().unwrap();
        assert!(!pool.contains(page_id1));
        assert!(pool.contains(page_id2));
        pool.unpin_page(page_id2, false);

        // The evicted bytes must come back from disk.
        let frame = pool.fetch_page(page_id1).unwrap();
        assert_eq!(frame.read_data()[0], 0xAB);
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_buffer_pool_full_all_pinned() {
        let pool = create_test_pool(2);

        pool.new_page().unwrap();
        pool.new_page().unwrap();

        let result = pool.new_page();
        assert!(matches!(result, Err(OxbowError::BufferPoolFull)));
    }

    #[test]
    fn test_buffer_pool_stress_fill_and_evict() {
        // Fill a 10-frame pool with pinned pages, unpin half, create
        // five more, then verify the evicted pages survived.
        let pool = create_test_pool(10);

        let mut page_ids = Vec::new();
        for i in 0..10 {
            let (page_id, frame) = pool.new_page().unwrap();
            frame.write_data()[0] = i as u8;
            page_ids.push(page_id);
        }

        assert!(matches!(pool.new_page(), Err(OxbowError::BufferPoolFull)));

        for &page_id in &page_ids[..5] {
            pool.unpin_page(page_id, true);
        }

        for _ in 0..5 {
            let (page_id, _) = pool.new_page().unwrap();
            pool.unpin_page(page_id, false);
        }

        // Page 0 was evicted; write-back must have preserved its bytes.
        let frame = pool.fetch_page(page_ids[0]).unwrap();
        assert_eq!(frame.read_data()[0], 0);
        pool.unpin_page(page_ids[0], false);
    }

    #[test]
    fn test_buffer_pool_delete_page() {
        let pool = create_test_pool(10);

        let (page_id, _) = pool.new_page().unwrap();
        pool.unpin_page(page_id, false);

        assert!(pool.contains(page_id));
        assert!(pool.delete_page(page_id));
        assert!(!pool.contains(page_id));
        assert_eq!(pool.free_count(), 10);
    }

    #[test]
    fn test_buffer_pool_delete_pinned_page() {
        let pool = create_test_pool(10);

        let (page_id, _) = pool.new_page().unwrap();
        // Don't unpin

        assert!(!pool.delete_page(page_id));
        assert!(pool.contains(page_id));
    }

    #[test]
    fn test_buffer_pool_delete_absent_page() {
        let pool = create_test_pool(10);
        assert!(pool.delete_page(PageId(42)));
    }

    #[test]
    fn test_buffer_pool_flush_page() {
        let pool = create_test_pool(10);

        let (page_id, frame) = pool.new_page().unwrap();
        frame.write_data()[7] = 0x77;
        pool.unpin_page(page_id, true);

        assert!(pool.flush_page(page_id).unwrap());

        let frame = pool.fetch_page(page_id).unwrap();
        assert!(!frame.is_dirty());
        assert_eq!(frame.pin_count(), 1);
        pool.unpin_page(page_id, false);

        // Absent and invalid pages flush as false.
        assert!(!pool.flush_page(PageId(999)).unwrap());
        assert!(!pool.flush_page(PageId::INVALID).unwrap());
    }

    #[test]
    fn test_buffer_pool_flush_roundtrip() {
        // unpin(dirty) + flush + evict + fetch returns the same bytes.
        let disk = Arc::new(MemDisk::new());
        let pool = BufferPool::new(BufferPoolConfig { num_frames: 1 }, disk);

        let (page_id1, frame) = pool.new_page().unwrap();
        frame.write_data()[100] = 0x42;
        pool.unpin_page(page_id1, true);
        assert!(pool.flush_page(page_id1).unwrap());

        // Evict by creating another page in the single frame.
        let (page_id2, _) = pool.new_page().unwrap();
        pool.unpin_page(page_id2, false);

        let frame = pool.fetch_page(page_id1).unwrap();
        assert_eq!(frame.read_data()[100], 0x42);
    }

    #[test]
    fn test_buffer_pool_flush_keeps_eviction_order() {
        let pool = create_test_pool(3);

        let mut page_ids = Vec::new();
        for _ in 0..3 {
            let (page_id, _) = pool.new_page().unwrap();
            page_ids.push(page_id);
        }
        for &page_id in &page_ids {
            pool.unpin_page(page_id, true);
        }

        // The first page unpinned is the LRU victim. Flushing it must
        // not refresh its position in the eviction order.
        assert!(pool.flush_page(page_ids[0]).unwrap());

        let (_, frame) = pool.new_page().unwrap();
        assert_eq!(frame.frame_id(), FrameId(0));
        assert!(!pool.contains(page_ids[0]));
        assert!(pool.contains(page_ids[1]));
        assert!(pool.contains(page_ids[2]));
    }

    #[test]
    fn test_buffer_pool_flush_pinned_page_stays_pinned() {
        let pool = create_test_pool(4);

        let (page_id, frame) = pool.new_page().unwrap();
        frame.write_data()[0] = 0x5A;
        frame.set_dirty(true);

        // Flushing a page someone still holds neither drops their pin
        // nor makes the frame evictable.
        assert!(pool.flush_page(page_id).unwrap());
        assert_eq!(frame.pin_count(), 1);
        assert!(!frame.is_dirty());
        assert_eq!(pool.stats().pinned_frames, 1);

        pool.unpin_page(page_id, false);
    }

    #[test]
    fn test_buffer_pool_flush_all() {
        let pool = create_test_pool(10);

        for _ in 0..5 {
            let (page_id, _) = pool.new_page().unwrap();
            pool.unpin_page(page_id, true);
        }

        assert_eq!(pool.flush_all().unwrap(), 5);
        assert_eq!(pool.stats().dirty_frames, 0);
    }

    #[test]
    fn test_buffer_pool_read_guard() {
        let pool = create_test_pool(10);

        let (page_id, _) = pool.new_page().unwrap();
        pool.unpin_page(page_id, false);

        {
            let guard = pool.read_page(page_id).unwrap();
            assert_eq!(guard.page_id(), page_id);
            assert_eq!(guard.data().len(), PAGE_SIZE);
        }

        // Guard released its pin; fetch adds a fresh one.
        let frame = pool.fetch_page(page_id).unwrap();
        assert_eq!(frame.pin_count(), 1);
    }

    #[test]
    fn test_buffer_pool_write_guard_marks_dirty() {
        let pool = create_test_pool(10);

        let (page_id, _) = pool.new_page().unwrap();
        pool.unpin_page(page_id, false);

        {
            let mut guard = pool.write_page(page_id).unwrap();
            guard.data_mut()[0] = 0xFF;
        }

        let frame = pool.fetch_page(page_id).unwrap();
        assert!(frame.is_dirty());
        assert_eq!(frame.read_data()[0], 0xFF);
    }

    #[test]
    fn test_buffer_pool_write_guard_clean_without_writes() {
        let pool = create_test_pool(10);

        let (page_id, _) = pool.new_page().unwrap();
        pool.unpin_page(page_id, false);

        {
            let guard = pool.write_page(page_id).unwrap();
            let _ = guard.data();
        }

        let frame = pool.fetch_page(page_id).unwrap();
        assert!(!frame.is_dirty());
    }

    #[test]
    fn test_buffer_pool_new_page_write_guard() {
        let pool = create_test_pool(10);

        let page_id = {
            let mut guard = pool.new_page_write().unwrap();
            guard.data_mut()[3] = 9;
            guard.page_id()
        };

        let frame = pool.fetch_page(page_id).unwrap();
        assert_eq!(frame.read_data()[3], 9);
    }

    #[test]
    fn test_buffer_pool_stats() {
        let pool = create_test_pool(10);

        let mut page_ids = Vec::new();
        for _ in 0..5 {
            let (page_id, _) = pool.new_page().unwrap();
            page_ids.push(page_id);
        }
        for &page_id in &page_ids[..3] {
            pool.unpin_page(page_id, true);
        }

        let stats = pool.stats();
        assert_eq!(stats.total_frames, 10);
        assert_eq!(stats.free_frames, 5);
        assert_eq!(stats.used_frames, 5);
        assert_eq!(stats.pinned_frames, 2);
        assert_eq!(stats.dirty_frames, 3);
    }

    #[test]
    fn test_buffer_pool_page_table_injective() {
        // No two frames hold the same page id.
        let pool = create_test_pool(3);

        let mut page_ids = Vec::new();
        for _ in 0..3 {
            let (page_id, _) = pool.new_page().unwrap();
            page_ids.push(page_id);
        }
        for &page_id in &page_ids {
            pool.unpin_page(page_id, false);
        }

        // Re-fetch each page twice; each must resolve to one frame.
        for &page_id in &page_ids {
            let f1 = pool.fetch_page(page_id).unwrap().frame_id();
            let f2 = pool.fetch_page(page_id).unwrap().frame_id();
            assert_eq!(f1, f2);
            pool.unpin_page(page_id, false);
            pool.unpin_page(page_id, false);
        }
    }

    #[test]
    fn test_buffer_pool_concurrent_fetch_unpin() {
        use std::thread;

        let pool = Arc::new(create_test_pool(16));
        let mut page_ids = Vec::new();
        for _ in 0..8 {
            let (page_id, _) = pool.new_page().unwrap();
            pool.unpin_page(page_id, false);
            page_ids.push(page_id);
        }

        let mut handles = Vec::new();
        for t in 0..4 {
            let pool = Arc::clone(&pool);
            let page_ids = page_ids.clone();
            handles.push(thread::spawn(move || {
                for round in 0..200 {
                    let page_id = page_ids[(t + round) % page_ids.len()];
                    let frame = pool.fetch_page(page_id).unwrap();
                    assert_eq!(frame.page_id(), page_id);
                    pool.unpin_page(page_id, false);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // All pins released.
        assert_eq!(pool.stats().pinned_frames, 0);
    }
}
