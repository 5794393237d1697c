use std::collections::HashMap;
use std::sync::Arc;

use crate::runtime::{MapStorage, SliceStorage, Slot};

/// Identity of a shared allocation: its address
pub type SlotId = usize;

/// Storage allocated for the copy of one shared allocation
#[derive(Debug, Clone)]
pub enum Tracked {
    /// Pointer target
    Slot(Slot),
    /// Slice backing storage
    Items(SliceStorage),
    /// Map backing storage
    Entries(MapStorage),
}

/// Maps original shared storage (pointer slots, slice and map backing
/// storage) to the storage allocated for its copy
///
/// Storage is registered before its contents are copied, so a path that
/// leads back to it resolves to the registered copy instead of recursing.
#[derive(Debug, Default)]
pub struct PointerTracker {
    seen: HashMap<SlotId, Tracked>,
}

impl PointerTracker {
    /// Creates an empty tracker
    pub fn new() -> Self {
        PointerTracker {
            seen: HashMap::new(),
        }
    }

    /// Identity of an original allocation
    pub fn identity<T>(storage: &Arc<T>) -> SlotId {
        Arc::as_ptr(storage) as *const () as SlotId
    }

    /// Copy registered for an original identity
    pub fn get(&self, id: SlotId) -> Option<Tracked> {
        self.seen.get(&id).cloned()
    }

    /// Registers the copy for an original identity
    pub fn register(&mut self, id: SlotId, copy: Tracked) {
        self.seen.insert(id, copy);
    }

    /// Number of registered identities
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
