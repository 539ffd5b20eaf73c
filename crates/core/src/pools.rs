//! Mutex-guarded pools mutated by both the node control task and the
//! consensus pipeline (spec §5 "Shared resources").

use std::collections::BTreeMap;

use hgc_consensus_core::block::{Block, BlockIndex};
use parking_lot::Mutex;

/// An ordered queue drained as a single batch when the next self-event is
/// produced (spec §4.4: "pending transactions (ordered), pending internal
/// transactions (ordered)").
pub struct PendingPool<T> {
    items: Mutex<Vec<T>>,
}

impl<T> Default for PendingPool<T> {
    fn default() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }
}

impl<T> PendingPool<T> {
    pub fn push(&self, item: T) {
        self.items.lock().push(item);
    }

    pub fn extend(&self, items: impl IntoIterator<Item = T>) {
        self.items.lock().extend(items);
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Removes and returns everything queued, for inclusion in the next
    /// self-event.
    pub fn drain_all(&self) -> Vec<T> {
        std::mem::take(&mut self.items.lock())
    }
}

/// Partial blocks awaiting a super-majority of signatures, keyed by block
/// index (spec §4.4 "signature pool").
#[derive(Default)]
pub struct SignaturePool {
    blocks: Mutex<BTreeMap<BlockIndex, Block>>,
}

impl SignaturePool {
    /// Registers a freshly-produced block, or replaces the entry if one
    /// already exists at that index (e.g. the local commit hash patch).
    pub fn insert(&self, block: Block) {
        self.blocks.lock().insert(block.header.index, block);
    }

    pub fn get(&self, index: BlockIndex) -> Option<Block> {
        self.blocks.lock().get(&index).cloned()
    }

    /// Applies `f` to the partial block at `index`, if any is pooled.
    pub fn with_mut<R>(&self, index: BlockIndex, f: impl FnOnce(&mut Block) -> R) -> Option<R> {
        self.blocks.lock().get_mut(&index).map(f)
    }

    pub fn indices(&self) -> Vec<BlockIndex> {
        self.blocks.lock().keys().copied().collect()
    }

    /// Removes a block once it has reached anchor-eligibility and has no
    /// further use for the pool.
    pub fn remove(&self, index: BlockIndex) -> Option<Block> {
        self.blocks.lock().remove(&index)
    }

    /// Drops every pooled partial block, e.g. after a fast-forward reset
    /// makes their signatures meaningless.
    pub fn clear(&self) {
        self.blocks.lock().clear();
    }
}
