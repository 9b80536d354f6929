use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;

use crate::registry::handle::WorkerHandle;
use crate::registry::keys::{ServiceKey, WorkerId};

/// Membership mark of a reserved slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotMark {
    /// Slot is supervised; it may be momentarily without a live handle.
    Active,
    /// Slot stopped for good (budget exhausted or fatal error).
    Retired,
}

/// Immutable view of one service's membership.
///
/// Cloning is cheap; a snapshot never changes after [`Registry::lookup`] returned it.
#[derive(Clone, Debug)]
pub struct Snapshot {
    service: ServiceKey,
    handles: Arc<[WorkerHandle]>,
    slots: Arc<[(WorkerId, SlotMark)]>,
    generation: u64,
}

impl Snapshot {
    fn empty(service: ServiceKey) -> Self {
        Self {
            service,
            handles: Arc::from(Vec::new()),
            slots: Arc::from(Vec::new()),
            generation: 0,
        }
    }

    pub fn service(&self) -> &ServiceKey {
        &self.service
    }

    /// Live handles, sorted by identity.
    pub fn handles(&self) -> &[WorkerHandle] {
        &self.handles
    }

    /// Reserved slots, sorted by id.
    pub fn slots(&self) -> &[(WorkerId, SlotMark)] {
        &self.slots
    }

    /// True when no live handle is registered.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns the live handle of a slot (latest incarnation), if any.
    pub fn get(&self, id: &WorkerId) -> Option<&WorkerHandle> {
        self.handles.iter().rev().find(|h| h.id() == id)
    }

    /// Returns the reservation mark of a slot, if reserved.
    pub fn slot(&self, id: &WorkerId) -> Option<SlotMark> {
        self.slots
            .binary_search_by(|(sid, _)| sid.cmp(id))
            .ok()
            .map(|idx| self.slots[idx].1)
    }

    /// Registry generation this snapshot was published at.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Concurrency-safe directory `ServiceKey → set of WorkerHandle`.
///
/// ### Rules
/// - `register` is idempotent, `deregister` of an absent handle is a no-op
/// - `lookup` returns a consistent snapshot (copy-on-write swap)
/// - Reservations (`reserve`/`retire`/`release`) are independent of handles:
///   a slot stays reserved while its worker restarts
pub struct Registry {
    entries: RwLock<HashMap<ServiceKey, Snapshot>>,
    generation: watch::Sender<u64>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Adds `handle` to the key's set. Returns `false` if it was already there.
    pub fn register(&self, key: &ServiceKey, handle: WorkerHandle) -> bool {
        self.mutate(key, |handles, _| match handles.binary_search(&handle) {
            Ok(_) => false,
            Err(pos) => {
                handles.insert(pos, handle);
                true
            }
        })
    }

    /// Removes `handle` (matched by id and incarnation). Returns `false` if absent.
    pub fn deregister(&self, key: &ServiceKey, handle: &WorkerHandle) -> bool {
        self.mutate(key, |handles, _| match handles.binary_search(handle) {
            Ok(pos) => {
                handles.remove(pos);
                true
            }
            Err(_) => false,
        })
    }

    /// Returns the current snapshot for `key` (empty if the key is unknown).
    pub fn lookup(&self, key: &ServiceKey) -> Snapshot {
        self.entries
            .read()
            .get(key)
            .cloned()
            .unwrap_or_else(|| Snapshot::empty(key.clone()))
    }

    /// Reserves a slot id for `key` (or re-activates a retired one).
    pub fn reserve(&self, key: &ServiceKey, id: WorkerId) -> bool {
        self.set_mark(key, id, SlotMark::Active)
    }

    /// Marks a reserved slot as permanently stopped.
    pub fn retire(&self, key: &ServiceKey, id: WorkerId) -> bool {
        self.set_mark(key, id, SlotMark::Retired)
    }

    /// Drops a slot reservation. Returns `false` if it was not reserved.
    pub fn release(&self, key: &ServiceKey, id: &WorkerId) -> bool {
        self.mutate(key, |_, slots| {
            match slots.binary_search_by(|(sid, _)| sid.cmp(id)) {
                Ok(pos) => {
                    slots.remove(pos);
                    true
                }
                Err(_) => false,
            }
        })
    }

    /// Returns sorted list of service keys with at least one handle or reservation.
    pub fn services(&self) -> Vec<ServiceKey> {
        let mut keys: Vec<ServiceKey> = self.entries.read().keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Current generation (bumped on every effective mutation).
    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    /// Receiver that observes generation bumps.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    fn set_mark(&self, key: &ServiceKey, id: WorkerId, mark: SlotMark) -> bool {
        self.mutate(key, |_, slots| {
            match slots.binary_search_by(|(sid, _)| sid.cmp(&id)) {
                Ok(pos) if slots[pos].1 == mark => false,
                Ok(pos) => {
                    slots[pos].1 = mark;
                    true
                }
                Err(pos) => {
                    slots.insert(pos, (id, mark));
                    true
                }
            }
        })
    }

    /// Applies `f` to working copies of the key's sets and publishes the result.
    ///
    /// The write lock is held for the copy and the swap only.
    fn mutate<F>(&self, key: &ServiceKey, f: F) -> bool
    where
        F: FnOnce(&mut Vec<WorkerHandle>, &mut Vec<(WorkerId, SlotMark)>) -> bool,
    {
        let mut entries = self.entries.write();
        let (mut handles, mut slots) = match entries.get(key) {
            Some(snap) => (snap.handles.to_vec(), snap.slots.to_vec()),
            None => (Vec::new(), Vec::new()),
        };

        if !f(&mut handles, &mut slots) {
            return false;
        }

        let mut generation = 0;
        self.generation.send_modify(|g| {
            *g += 1;
            generation = *g;
        });

        if handles.is_empty() && slots.is_empty() {
            entries.remove(key);
        } else {
            entries.insert(
                key.clone(),
                Snapshot {
                    service: key.clone(),
                    handles: Arc::from(handles),
                    slots: Arc::from(slots),
                    generation,
                },
            );
        }
        true
    }
}

impl Default for Registry {
    fn default() -> Self {
        let (generation, _rx) = watch::channel(0);
        Self {
            entries: RwLock::new(HashMap::new()),
            generation,
        }
    }
}
