//! Source nodes and the weak element → node cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use super::element::{ElementId, MediaElement};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Graph node wrapping one media element.
///
/// Holds the element weakly so that wrapping it never keeps it alive.
#[derive(Debug)]
pub struct SourceNode {
    node_id: u64,
    element_id: ElementId,
    element: Weak<MediaElement>,
}

impl SourceNode {
    pub(crate) fn new(element: &Arc<MediaElement>) -> Self {
        Self {
            node_id: NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed),
            element_id: element.id(),
            element: Arc::downgrade(element),
        }
    }

    pub fn node_id(&self) -> u64 {
        self.node_id
    }

    pub fn element_id(&self) -> ElementId {
        self.element_id
    }

    /// Whether the wrapped element still exists
    pub fn is_live(&self) -> bool {
        self.element.strong_count() > 0
    }

    /// Pull pending samples from the element; false once it is gone
    pub(crate) fn pull(&self, out: &mut Vec<f32>) -> bool {
        match self.element.upgrade() {
            Some(element) => {
                element.drain_into(out);
                true
            }
            None => false,
        }
    }
}

struct CacheEntry {
    element: Weak<MediaElement>,
    node: Arc<SourceNode>,
}

impl CacheEntry {
    fn is_live(&self) -> bool {
        self.element.strong_count() > 0
    }
}

/// Side-table from element identity to its source node.
///
/// Entries never extend the element's lifetime. An entry whose element has
/// been dropped is dead: lookups ignore it and `purge` removes it.
#[derive(Default)]
pub struct SourceCache {
    entries: HashMap<ElementId, CacheEntry>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached node for exactly this element instance
    pub fn get(&self, element: &Arc<MediaElement>) -> Option<Arc<SourceNode>> {
        let entry = self.entries.get(&element.id())?;
        let cached = entry.element.upgrade()?;
        Arc::ptr_eq(&cached, element).then(|| Arc::clone(&entry.node))
    }

    pub fn insert(&mut self, element: &Arc<MediaElement>, node: Arc<SourceNode>) {
        self.entries.insert(
            element.id(),
            CacheEntry {
                element: Arc::downgrade(element),
                node,
            },
        );
    }

    /// Drop entries whose element is gone; returns how many were removed
    pub fn purge(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live());
        before - self.entries.len()
    }

    /// Number of entries, including any not yet purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Nodes whose element is still alive
    pub fn live_nodes(&self) -> impl Iterator<Item = &Arc<SourceNode>> {
        self.entries
            .values()
            .filter(|entry| entry.is_live())
            .map(|entry| &entry.node)
    }
}
