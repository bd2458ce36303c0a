//! Page-based concurrent B+Tree index.
//!
//! Every node is a page fetched through the buffer pool; every latch on
//! a node is the reader/writer latch of its frame. A single descent
//! helper drives lookup, insert and delete with latch crabbing: a
//! child's latch is always acquired before the parent's is released,
//! and on write descents the ancestor path stays latched until a node
//! that cannot overflow (insert) or underflow (delete) is reached.

use super::constants::{INTERNAL_DEFAULT_MAX_SIZE, LEAF_DEFAULT_MAX_SIZE};
use super::iterator::BTreeIterator;
use super::page::{self, InternalMut, InternalRef, LeafMut, LeafRef, NodeRef};
use super::transaction::Transaction;
use crate::header::HeaderMut;
use log::{debug, warn};
use oxbow_buffer::{BufferPool, PageReadGuard, PageWriteGuard};
use oxbow_common::page::{PageId, HEADER_PAGE_ID};
use oxbow_common::types::RecordId;
use oxbow_common::{OxbowError, Result};
use parking_lot::{Mutex, MutexGuard};
use std::ops::Range;
use std::sync::Arc;

/// Write operations with distinct crabbing safety rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Insert,
    Delete,
}

/// Returns true if a local mutation of this node cannot propagate a
/// structural change to its parent, which licenses releasing every
/// ancestor latch. The root uses a stricter delete bound so collapses
/// are only handled under the root latch.
fn is_write_safe(data: &[u8], op: Operation) -> Result<bool> {
    let node = NodeRef::parse(data)?;
    let is_root = node.is_root();
    Ok(match op {
        Operation::Insert => match &node {
            NodeRef::Leaf(leaf) => leaf.size() + 1 < leaf.max_size(),
            NodeRef::Internal(internal) => internal.size() + 1 < internal.max_size(),
        },
        Operation::Delete => {
            if is_root {
                node.size() > 2
            } else {
                match &node {
                    NodeRef::Leaf(leaf) => leaf.size() > leaf.min_size(),
                    NodeRef::Internal(internal) => internal.size() > internal.min_size(),
                }
            }
        }
    })
}

/// Concurrent B+Tree index with unique keys.
pub struct BTreeIndex {
    /// Name under which the root page id is recorded in the directory.
    name: String,
    /// Buffer pool backing every node page.
    pool: Arc<BufferPool>,
    /// Current root page id, INVALID while the tree is empty. The mutex
    /// is the root latch: every descent starts by acquiring it.
    root_page_id: Mutex<PageId>,
    /// Maximum leaf entry count.
    leaf_max_size: usize,
    /// Maximum internal child count.
    internal_max_size: usize,
}

impl BTreeIndex {
    /// Creates an empty index with fan-outs derived from the page size.
    pub fn new(name: impl Into<String>, pool: Arc<BufferPool>) -> Self {
        Self::with_max_sizes(name, pool, LEAF_DEFAULT_MAX_SIZE, INTERNAL_DEFAULT_MAX_SIZE)
    }

    /// Creates an empty index with explicit fan-outs, clamped to what a
    /// page can hold.
    pub fn with_max_sizes(
        name: impl Into<String>,
        pool: Arc<BufferPool>,
        leaf_max_size: usize,
        internal_max_size: usize,
    ) -> Self {
        Self {
            name: name.into(),
            pool,
            root_page_id: Mutex::new(PageId::INVALID),
            leaf_max_size: leaf_max_size.clamp(3, LEAF_DEFAULT_MAX_SIZE),
            internal_max_size: internal_max_size.clamp(3, INTERNAL_DEFAULT_MAX_SIZE),
        }
    }

    /// Returns true if the tree holds no entries.
    pub fn is_empty(&self) -> bool {
        !self.root_page_id.lock().is_valid()
    }

    /// Returns the current root page id.
    pub fn root_page_id(&self) -> PageId {
        *self.root_page_id.lock()
    }

    /// Point lookup.
    pub fn get(&self, key: u64) -> Result<Option<RecordId>> {
        let Some(guard) = self.find_leaf_read(Some(key))? else {
            return Ok(None);
        };
        Ok(LeafRef::new(guard.data()).lookup(key))
    }

    /// Inserts a unique key. Returns false if the key is already
    /// present.
    pub fn insert(&self, key: u64, record: RecordId) -> Result<bool> {
        let root_latch = self.root_page_id.lock();
        if !root_latch.is_valid() {
            let mut root_latch = root_latch;
            self.start_new_tree(key, record, &mut root_latch)?;
            return Ok(true);
        }

        let mut txn = Transaction::new();
        let (mut leaf_guard, mut root_latch) =
            self.find_leaf_write(key, Operation::Insert, &mut txn, root_latch)?;

        if LeafRef::new(leaf_guard.data()).lookup(key).is_some() {
            return Ok(false);
        }

        let new_size = {
            let mut leaf = LeafMut::new(leaf_guard.data_mut());
            leaf.insert(key, record)
        };
        if new_size < self.leaf_max_size {
            return Ok(true);
        }

        // The leaf filled up: split it and push the separator upward.
        debug!("splitting leaf {}", leaf_guard.page_id());
        let mut new_guard = self.pool.new_page_write()?;
        let new_page_id = new_guard.page_id();
        {
            let old_parent = page::parent_of(leaf_guard.data());
            let old_next = LeafRef::new(leaf_guard.data()).next_page_id();
            let mut leaf = LeafMut::new(leaf_guard.data_mut());
            let mut new_leaf = LeafMut::init(new_guard.data_mut(), new_page_id, self.leaf_max_size);
            leaf.move_half_to(&mut new_leaf);
            new_leaf.set_next_page_id(old_next);
            new_leaf.set_parent_page_id(old_parent);
            leaf.set_next_page_id(new_page_id);
        }
        let separator = LeafRef::new(new_guard.data()).key_at(0);
        self.insert_into_parent(&mut leaf_guard, separator, &mut new_guard, &mut txn, &mut root_latch)?;
        Ok(true)
    }

    /// Removes a key. Absent keys are a silent no-op.
    pub fn remove(&self, key: u64) -> Result<()> {
        let root_latch = self.root_page_id.lock();
        if !root_latch.is_valid() {
            return Ok(());
        }

        let mut txn = Transaction::new();
        let (mut leaf_guard, mut root_latch) =
            self.find_leaf_write(key, Operation::Delete, &mut txn, root_latch)?;

        if LeafRef::new(leaf_guard.data()).lookup(key).is_none() {
            return Ok(());
        }
        {
            let mut leaf = LeafMut::new(leaf_guard.data_mut());
            leaf.remove(key);
        }
        self.coalesce_or_redistribute(leaf_guard, &mut txn, &mut root_latch)?;

        // Deferred deletions run after every latch is released.
        drop(root_latch);
        txn.release_all();
        for page_id in txn.take_deleted() {
            if !self.pool.delete_page(page_id) {
                warn!("deferred delete of {page_id} failed");
            }
        }
        Ok(())
    }

    /// Forward iterator over the whole tree.
    pub fn iter(&self) -> Result<BTreeIterator<'_>> {
        let guard = self.find_leaf_read(None)?;
        Ok(BTreeIterator::new(&self.pool, guard, 0))
    }

    /// Forward iterator positioned at the first key >= `key`.
    pub fn iter_from(&self, key: u64) -> Result<BTreeIterator<'_>> {
        let guard = self.find_leaf_read(Some(key))?;
        let index = guard
            .as_ref()
            .map(|g| LeafRef::new(g.data()).key_index(key))
            .unwrap_or(0);
        Ok(BTreeIterator::new(&self.pool, guard, index))
    }

    // =========================================================================
    // Descent
    // =========================================================================

    /// Read descent to the leaf for `key`, or the leftmost leaf when no
    /// key is given. Each parent's read latch is released immediately
    /// after the child's is acquired. Returns None for an empty tree.
    fn find_leaf_read(&self, target: Option<u64>) -> Result<Option<PageReadGuard<'_>>> {
        let root_latch = self.root_page_id.lock();
        if !root_latch.is_valid() {
            return Ok(None);
        }
        let mut guard = self.pool.read_page(*root_latch)?;
        drop(root_latch);

        loop {
            let child_id = match NodeRef::parse(guard.data())? {
                NodeRef::Leaf(_) => None,
                NodeRef::Internal(node) => Some(match target {
                    Some(key) => node.child_for_key(key),
                    None => node.child_at(0),
                }),
            };
            match child_id {
                None => return Ok(Some(guard)),
                // Latch the child before the parent guard is replaced.
                Some(child_id) => guard = self.pool.read_page(child_id)?,
            }
        }
    }

    /// Write descent to the leaf for `key`. Ancestors stay write-latched
    /// in the scratchpad until a safe child proves no structural change
    /// can reach them; the root latch is returned still held if no node
    /// on the path was safe.
    fn find_leaf_write<'a>(
        &'a self,
        key: u64,
        op: Operation,
        txn: &mut Transaction<'a>,
        root_latch: MutexGuard<'a, PageId>,
    ) -> Result<(PageWriteGuard<'a>, Option<MutexGuard<'a, PageId>>)> {
        let root_id = *root_latch;
        let mut root_latch = Some(root_latch);
        let mut guard = self.pool.write_page(root_id)?;
        if is_write_safe(guard.data(), op)? {
            root_latch = None;
        }

        loop {
            let child_id = match NodeRef::parse(guard.data())? {
                NodeRef::Leaf(_) => None,
                NodeRef::Internal(node) => Some(node.child_for_key(key)),
            };
            let Some(child_id) = child_id else {
                return Ok((guard, root_latch));
            };

            let child = self.pool.write_page(child_id)?;
            let child_safe = is_write_safe(child.data(), op)?;
            txn.push_latched(guard);
            if child_safe {
                txn.release_all();
                root_latch = None;
            }
            guard = child;
        }
    }

    // =========================================================================
    // Insert path
    // =========================================================================

    /// Builds a one-leaf tree holding `(key, record)`. Caller holds the
    /// root latch and the tree is empty.
    fn start_new_tree(
        &self,
        key: u64,
        record: RecordId,
        root_latch: &mut MutexGuard<'_, PageId>,
    ) -> Result<()> {
        let mut guard = self.pool.new_page_write()?;
        let page_id = guard.page_id();
        {
            let mut leaf = LeafMut::init(guard.data_mut(), page_id, self.leaf_max_size);
            leaf.insert(key, record);
        }
        drop(guard);
        **root_latch = page_id;
        self.update_root_record(page_id)?;
        debug!("started new tree with root {page_id}");
        Ok(())
    }

    /// Links a freshly split-off node into the tree: `old` kept its
    /// lower half, `new` is its right sibling, `key` separates them.
    /// Splits the parent recursively if the extra child overflows it.
    fn insert_into_parent<'a>(
        &'a self,
        old: &mut PageWriteGuard<'a>,
        key: u64,
        new: &mut PageWriteGuard<'a>,
        txn: &mut Transaction<'a>,
        root_latch: &mut Option<MutexGuard<'a, PageId>>,
    ) -> Result<()> {
        let parent_id = page::parent_of(old.data());
        if !parent_id.is_valid() {
            // The split reached the root: grow the tree by one level.
            let mut new_root = self.pool.new_page_write()?;
            let new_root_id = new_root.page_id();
            {
                let mut root =
                    InternalMut::init(new_root.data_mut(), new_root_id, self.internal_max_size);
                root.populate_new_root(old.page_id(), key, new.page_id());
            }
            page::set_parent(old.data_mut(), new_root_id);
            page::set_parent(new.data_mut(), new_root_id);
            drop(new_root);

            let latch = root_latch.as_mut().ok_or_else(|| {
                OxbowError::Corrupted("root split without the root latch".into())
            })?;
            **latch = new_root_id;
            self.update_root_record(new_root_id)?;
            *root_latch = None;
            txn.release_all();
            debug!("grew new root {new_root_id}");
            return Ok(());
        }

        let mut parent_guard = txn.pop_latched().ok_or_else(|| {
            OxbowError::Corrupted("split propagated past a released ancestor".into())
        })?;
        page::set_parent(new.data_mut(), parent_id);
        let new_size = {
            let mut parent = InternalMut::new(parent_guard.data_mut());
            parent.insert_after(old.page_id(), key, new.page_id())
        };
        if new_size <= self.internal_max_size {
            // Absorbed without overflow; nothing above can change.
            drop(parent_guard);
            txn.release_all();
            *root_latch = None;
            return Ok(());
        }

        // The parent overflowed: split it and continue upward.
        debug!("splitting internal {}", parent_guard.page_id());
        let mut new_parent = self.pool.new_page_write()?;
        let new_parent_id = new_parent.page_id();
        let moved = {
            let grandparent = page::parent_of(parent_guard.data());
            let mut parent = InternalMut::new(parent_guard.data_mut());
            let mut right =
                InternalMut::init(new_parent.data_mut(), new_parent_id, self.internal_max_size);
            right.set_parent_page_id(grandparent);
            parent.move_half_to(&mut right)
        };
        let separator = InternalRef::new(new_parent.data()).key_at(0);
        {
            let mut held = [&mut *old, &mut *new];
            self.reparent_children(&new_parent, 0..moved, &mut held)?;
        }
        self.insert_into_parent(&mut parent_guard, separator, &mut new_parent, txn, root_latch)
    }

    /// Points the children of `node_guard` in `range` at it. Children
    /// whose guards this operation already holds are updated through
    /// those guards; the rest are latched individually.
    fn reparent_children(
        &self,
        node_guard: &PageWriteGuard<'_>,
        range: Range<usize>,
        held: &mut [&mut PageWriteGuard<'_>],
    ) -> Result<()> {
        let parent_id = node_guard.page_id();
        for index in range {
            let child_id = InternalRef::new(node_guard.data()).child_at(index);
            if let Some(held_guard) = held.iter_mut().find(|g| g.page_id() == child_id) {
                page::set_parent(held_guard.data_mut(), parent_id);
            } else {
                let mut child = self.pool.write_page(child_id)?;
                page::set_parent(child.data_mut(), parent_id);
            }
        }
        Ok(())
    }

    // =========================================================================
    // Delete path
    // =========================================================================

    /// Restores the size invariant of a node that may have underflowed,
    /// merging with or borrowing from a sibling and recursing into the
    /// parent when a merge removes one of its slots.
    fn coalesce_or_redistribute<'a>(
        &'a self,
        mut node_guard: PageWriteGuard<'a>,
        txn: &mut Transaction<'a>,
        root_latch: &mut Option<MutexGuard<'a, PageId>>,
    ) -> Result<()> {
        let (is_root, is_leaf, size, min_size, node_id) = {
            match NodeRef::parse(node_guard.data())? {
                NodeRef::Leaf(leaf) => (
                    !leaf.parent_page_id().is_valid(),
                    true,
                    leaf.size(),
                    leaf.min_size(),
                    leaf.page_id(),
                ),
                NodeRef::Internal(node) => (
                    !node.parent_page_id().is_valid(),
                    false,
                    node.size(),
                    node.min_size(),
                    node.page_id(),
                ),
            }
        };

        if is_root {
            return self.adjust_root(node_guard, txn, root_latch);
        }
        if size >= min_size {
            return Ok(());
        }

        let mut parent_guard = txn.pop_latched().ok_or_else(|| {
            OxbowError::Corrupted("underflow propagated past a released ancestor".into())
        })?;
        let (index, sibling_id) = {
            let parent = InternalRef::new(parent_guard.data());
            let index = parent
                .child_index(node_id)
                .ok_or_else(|| OxbowError::Corrupted(format!("{node_id} missing from parent")))?;
            // Prefer the left sibling; the leftmost child borrows right.
            let sibling_index = if index == 0 { 1 } else { index - 1 };
            (index, parent.child_at(sibling_index))
        };
        let mut sibling_guard = self.pool.write_page(sibling_id)?;
        let sibling_size = NodeRef::parse(sibling_guard.data())?.size();
        let max_size = if is_leaf {
            self.leaf_max_size
        } else {
            self.internal_max_size
        };

        if size + sibling_size >= max_size {
            return self.redistribute(&mut sibling_guard, &mut node_guard, &mut parent_guard, index);
        }

        // Coalesce: the right node always merges into the left one.
        let (mut left, mut right, right_index) = if index == 0 {
            (node_guard, sibling_guard, 1)
        } else {
            (sibling_guard, node_guard, index)
        };
        debug!("coalescing {} into {}", right.page_id(), left.page_id());
        if is_leaf {
            let mut left_leaf = LeafMut::new(left.data_mut());
            let mut right_leaf = LeafMut::new(right.data_mut());
            right_leaf.move_all_to(&mut left_leaf);
        } else {
            let middle_key = InternalRef::new(parent_guard.data()).key_at(right_index);
            let moved_start = InternalRef::new(left.data()).size();
            {
                let mut left_node = InternalMut::new(left.data_mut());
                let mut right_node = InternalMut::new(right.data_mut());
                right_node.move_all_to(&mut left_node, middle_key);
            }
            let moved_end = InternalRef::new(left.data()).size();
            self.reparent_children(&left, moved_start..moved_end, &mut [])?;
        }
        {
            let mut parent = InternalMut::new(parent_guard.data_mut());
            parent.remove_at(right_index);
        }
        txn.defer_delete(right.page_id());
        drop(left);
        drop(right);
        self.coalesce_or_redistribute(parent_guard, txn, root_latch)
    }

    /// Moves one entry from the sibling into the underfull node and
    /// fixes the separator between them in the parent.
    fn redistribute(
        &self,
        sibling: &mut PageWriteGuard<'_>,
        node: &mut PageWriteGuard<'_>,
        parent: &mut PageWriteGuard<'_>,
        index: usize,
    ) -> Result<()> {
        let is_leaf = matches!(NodeRef::parse(node.data())?, NodeRef::Leaf(_));
        if is_leaf {
            if index == 0 {
                // Sibling is the right neighbor: take its first entry.
                {
                    let mut sibling_leaf = LeafMut::new(sibling.data_mut());
                    let mut node_leaf = LeafMut::new(node.data_mut());
                    sibling_leaf.move_first_to_end_of(&mut node_leaf);
                }
                let new_separator = LeafRef::new(sibling.data()).key_at(0);
                InternalMut::new(parent.data_mut()).set_key_at(1, new_separator);
            } else {
                // Sibling is the left neighbor: take its last entry.
                {
                    let mut sibling_leaf = LeafMut::new(sibling.data_mut());
                    let mut node_leaf = LeafMut::new(node.data_mut());
                    sibling_leaf.move_last_to_front_of(&mut node_leaf);
                }
                let new_separator = LeafRef::new(node.data()).key_at(0);
                InternalMut::new(parent.data_mut()).set_key_at(index, new_separator);
            }
        } else if index == 0 {
            let middle_key = InternalRef::new(parent.data()).key_at(1);
            let up_key = {
                let mut sibling_node = InternalMut::new(sibling.data_mut());
                let mut node_node = InternalMut::new(node.data_mut());
                sibling_node.move_first_to_end_of(&mut node_node, middle_key)
            };
            let moved_index = InternalRef::new(node.data()).size() - 1;
            self.reparent_children(node, moved_index..moved_index + 1, &mut [])?;
            InternalMut::new(parent.data_mut()).set_key_at(1, up_key);
        } else {
            let middle_key = InternalRef::new(parent.data()).key_at(index);
            let up_key = {
                let mut sibling_node = InternalMut::new(sibling.data_mut());
                let mut node_node = InternalMut::new(node.data_mut());
                sibling_node.move_last_to_front_of(&mut node_node, middle_key)
            };
            self.reparent_children(node, 0..1, &mut [])?;
            InternalMut::new(parent.data_mut()).set_key_at(index, up_key);
        }
        Ok(())
    }

    /// Handles the root's exemption from the size invariant: an internal
    /// root with a single child is replaced by that child, and an empty
    /// leaf root empties the tree.
    fn adjust_root<'a>(
        &'a self,
        root_guard: PageWriteGuard<'a>,
        txn: &mut Transaction<'a>,
        root_latch: &mut Option<MutexGuard<'a, PageId>>,
    ) -> Result<()> {
        enum RootFate {
            Promote(PageId),
            Empty,
            Keep,
        }
        let fate = match NodeRef::parse(root_guard.data())? {
            NodeRef::Internal(node) if node.size() == 1 => RootFate::Promote(node.only_child()),
            NodeRef::Leaf(leaf) if leaf.size() == 0 => RootFate::Empty,
            _ => RootFate::Keep,
        };
        match fate {
            RootFate::Promote(child_id) => {
                let old_root_id = root_guard.page_id();
                drop(root_guard);
                {
                    let mut child = self.pool.write_page(child_id)?;
                    page::set_parent(child.data_mut(), PageId::INVALID);
                }
                let latch = root_latch.as_mut().ok_or_else(|| {
                    OxbowError::Corrupted("root collapse without the root latch".into())
                })?;
                **latch = child_id;
                self.update_root_record(child_id)?;
                txn.defer_delete(old_root_id);
                debug!("promoted {child_id} to root");
                Ok(())
            }
            RootFate::Empty => {
                let old_root_id = root_guard.page_id();
                drop(root_guard);
                let latch = root_latch.as_mut().ok_or_else(|| {
                    OxbowError::Corrupted("root collapse without the root latch".into())
                })?;
                **latch = PageId::INVALID;
                self.update_root_record(PageId::INVALID)?;
                txn.defer_delete(old_root_id);
                debug!("tree emptied");
                Ok(())
            }
            RootFate::Keep => Ok(()),
        }
    }

    // =========================================================================
    // Directory page
    // =========================================================================

    /// Records the current root under this index's name in the
    /// directory page. Called on every root change.
    fn update_root_record(&self, root_id: PageId) -> Result<()> {
        let mut guard = self.pool.write_page(HEADER_PAGE_ID)?;
        let mut header = HeaderMut::new(guard.data_mut());
        if !header.update_record(&self.name, root_id) && !header.insert_record(&self.name, root_id)
        {
            return Err(OxbowError::Corrupted("directory page full".into()));
        }
        Ok(())
    }

    // =========================================================================
    // Structural checks
    // =========================================================================

    /// Walks the whole tree checking size bounds, separator ordering,
    /// and parent pointers. Intended for tests and debugging; takes no
    /// latches beyond per-node read latches.
    pub fn verify(&self) -> Result<()> {
        let root_id = *self.root_page_id.lock();
        if !root_id.is_valid() {
            return Ok(());
        }
        self.verify_node(root_id, PageId::INVALID, None, None)?;
        Ok(())
    }

    fn verify_node(
        &self,
        page_id: PageId,
        expected_parent: PageId,
        lower: Option<u64>,
        upper: Option<u64>,
    ) -> Result<u32> {
        let corrupted = |msg: String| OxbowError::Corrupted(msg);
        let guard = self.pool.read_page(page_id)?;
        let is_root = !expected_parent.is_valid();

        match NodeRef::parse(guard.data())? {
            NodeRef::Leaf(leaf) => {
                if leaf.parent_page_id() != expected_parent {
                    return Err(corrupted(format!("{page_id} has a stale parent pointer")));
                }
                let size = leaf.size();
                if !is_root && (size < leaf.min_size() || size >= leaf.max_size()) {
                    return Err(corrupted(format!("leaf {page_id} size {size} out of bounds")));
                }
                for i in 0..size {
                    let key = leaf.key_at(i);
                    if i > 0 && leaf.key_at(i - 1) >= key {
                        return Err(corrupted(format!("leaf {page_id} keys out of order")));
                    }
                    if lower.is_some_and(|bound| key < bound)
                        || upper.is_some_and(|bound| key >= bound)
                    {
                        return Err(corrupted(format!("leaf {page_id} key {key} out of range")));
                    }
                }
                Ok(1)
            }
            NodeRef::Internal(node) => {
                if node.parent_page_id() != expected_parent {
                    return Err(corrupted(format!("{page_id} has a stale parent pointer")));
                }
                let size = node.size();
                if size < 2 || (!is_root && (size < node.min_size() || size > node.max_size())) {
                    return Err(corrupted(format!(
                        "internal {page_id} size {size} out of bounds"
                    )));
                }
                for i in 2..size {
                    if node.key_at(i - 1) >= node.key_at(i) {
                        return Err(corrupted(format!("internal {page_id} separators unsorted")));
                    }
                }
                for i in 1..size {
                    let key = node.key_at(i);
                    if lower.is_some_and(|bound| key < bound)
                        || upper.is_some_and(|bound| key >= bound)
                    {
                        return Err(corrupted(format!(
                            "internal {page_id} separator {key} out of range"
                        )));
                    }
                }

                let mut height = None;
                for i in 0..size {
                    let child_lower = if i == 0 { lower } else { Some(node.key_at(i)) };
                    let child_upper = if i + 1 == size {
                        upper
                    } else {
                        Some(node.key_at(i + 1))
                    };
                    let child_height =
                        self.verify_node(node.child_at(i), page_id, child_lower, child_upper)?;
                    if *height.get_or_insert(child_height) != child_height {
                        return Err(corrupted(format!("{page_id} has children at mixed depths")));
                    }
                }
                Ok(height.unwrap_or(0) + 1)
            }
        }
    }
}
