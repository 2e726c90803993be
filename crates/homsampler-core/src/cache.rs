//! Alignment block lookups keyed by `(method_clade_id, region)`
//!
//! Neighbouring reference genes often share blocks, so a run can hand the
//! sampler a [`MemoryBlockCache`]. Tests and one-off lookups use
//! [`NoBlockCache`].

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::model::{AlignmentBlock, GenomicRegion};

pub type BlockKey = (i64, GenomicRegion);

pub trait BlockCache: Send + Sync {
    fn get(&self, key: &BlockKey) -> Option<Arc<Vec<AlignmentBlock>>>;

    fn insert(&self, key: BlockKey, blocks: Arc<Vec<AlignmentBlock>>);
}

/// Never stores anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBlockCache;

impl BlockCache for NoBlockCache {
    fn get(&self, _key: &BlockKey) -> Option<Arc<Vec<AlignmentBlock>>> {
        None
    }

    fn insert(&self, _key: BlockKey, _blocks: Arc<Vec<AlignmentBlock>>) {}
}

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<BlockKey, Arc<Vec<AlignmentBlock>>>,
    order: VecDeque<BlockKey>,
}

/// Bounded in-memory cache, evicting the oldest entry first
#[derive(Debug)]
pub struct MemoryBlockCache {
    capacity: usize,
    entries: Mutex<Entries>,
}

impl MemoryBlockCache {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(Entries::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryBlockCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl BlockCache for MemoryBlockCache {
    fn get(&self, key: &BlockKey) -> Option<Arc<Vec<AlignmentBlock>>> {
        let entries = self.entries.lock().ok()?;
        entries.map.get(key).cloned()
    }

    fn insert(&self, key: BlockKey, blocks: Arc<Vec<AlignmentBlock>>) {
        // poisoned: skip caching
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };

        if entries.map.insert(key.clone(), blocks).is_none() {
            entries.order.push_back(key);
        }
        while entries.map.len() > self.capacity {
            let Some(oldest) = entries.order.pop_front() else {
                break;
            };
            entries.map.remove(&oldest);
        }
    }
}
