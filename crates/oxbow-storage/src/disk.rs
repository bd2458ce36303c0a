//! Disk manager for page-level file I/O.

use oxbow_buffer::DiskIo;
use oxbow_common::page::{PageId, PAGE_SIZE};
use oxbow_common::Result;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI32, Ordering};

/// Configuration for the disk manager.
#[derive(Debug, Clone)]
pub struct DiskManagerConfig {
    /// Path of the backing database file.
    pub path: PathBuf,
    /// Enable fsync after writes.
    pub fsync_enabled: bool,
}

impl Default for DiskManagerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./oxbow.db"),
            fsync_enabled: true,
        }
    }
}

/// Manages reading and writing pages in a single backing file.
///
/// Pages live at offset `page_id * PAGE_SIZE`. Ids are handed out
/// sequentially; deallocated ids are not recycled. Reads past the
/// current end of file return zeroed bytes, which covers pages that
/// were allocated but never flushed.
pub struct DiskManager {
    /// Configuration.
    config: DiskManagerConfig,
    /// The backing file.
    file: Mutex<File>,
    /// Next page id to hand out.
    next_page_id: AtomicI32,
}

impl DiskManager {
    /// Opens or creates the backing file.
    pub fn new(config: DiskManagerConfig) -> Result<Self> {
        if let Some(dir) = config.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&config.path)?;

        let file_size = file.metadata()?.len();
        let num_pages = (file_size / PAGE_SIZE as u64) as i32;

        Ok(Self {
            config,
            file: Mutex::new(file),
            // Page 0 is reserved for the directory page and is never
            // handed out by the allocator.
            next_page_id: AtomicI32::new(num_pages.max(1)),
        })
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Returns the number of page ids handed out so far.
    pub fn num_pages(&self) -> i32 {
        self.next_page_id.load(Ordering::Acquire)
    }

    /// Flushes all pending writes to disk.
    pub fn sync(&self) -> Result<()> {
        self.file.lock().sync_all()?;
        Ok(())
    }
}

impl DiskIo for DiskManager {
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        let mut file = self.file.lock();
        let file_size = file.metadata()?.len();
        let offset = page_id.offset();

        if offset >= file_size {
            // Allocated but never written; reads as zeroes.
            buf.fill(0);
            return Ok(());
        }

        file.seek(SeekFrom::Start(offset))?;
        let available = (file_size - offset).min(PAGE_SIZE as u64) as usize;
        file.read_exact(&mut buf[..available])?;
        buf[available..].fill(0);
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<()> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(page_id.offset()))?;
        file.write_all(buf)?;

        if self.config.fsync_enabled {
            file.sync_all()?;
        }
        Ok(())
    }

    fn allocate_page(&self) -> Result<PageId> {
        Ok(PageId(self.next_page_id.fetch_add(1, Ordering::AcqRel)))
    }

    fn deallocate_page(&self, _page_id: PageId) {
        // Ids are not recycled; the page's bytes stay in place until
        // the id is never referenced again.
    }
}
