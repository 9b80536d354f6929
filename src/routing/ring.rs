//! # ConsistentHashRouter: pure key → worker selection.
//!
//! ## Algorithm
//! ```text
//! members (distinct WorkerIds, sorted)
//!   └─► for i in 0..pool_size: point = h("{id}#{i}")
//!         └─► points sorted by (point, member order)
//!
//! select(key):
//!   p = h(key)
//!   idx = first point >= p (wrap to 0 past the end)
//!   owner = member at idx
//! ```
//!
//! ## Rules
//! - Pure: the result depends only on the members, `pool_size`, the hash and the key
//! - Colliding points resolve to the lexicographically smaller `WorkerId`
//! - Several handles with the same id resolve to the highest incarnation
//! - No caching: every call to [`ConsistentHashRouter::select`] rebuilds from its snapshot

use std::fmt::Write as _;
use std::sync::Arc;

use crate::commands::DeviceId;
use crate::error::RouteError;
use crate::registry::{Snapshot, WorkerHandle, WorkerId};
use crate::routing::hash::{RoutingHash, Sha256Hash};

/// A built hash ring over a fixed set of worker ids.
#[derive(Clone)]
pub struct Ring {
    hasher: Arc<dyn RoutingHash>,
    members: Vec<WorkerId>,
    /// `(position, index into members)`, sorted.
    points: Vec<(u64, u32)>,
}

impl Ring {
    /// Returns the id owning `key`, or `None` for an empty ring.
    pub fn owner(&self, key: &DeviceId) -> Option<&WorkerId> {
        self.owner_of_point(self.hasher.hash_bytes(key.as_bytes()))
    }

    /// Returns the id owning an arbitrary ring position.
    pub fn owner_of_point(&self, point: u64) -> Option<&WorkerId> {
        if self.points.is_empty() {
            return None;
        }
        let idx = self.points.partition_point(|(p, _)| *p < point);
        let (_, member) = self.points[idx % self.points.len()];
        self.members.get(member as usize)
    }

    /// Distinct members, sorted.
    pub fn members(&self) -> &[WorkerId] {
        &self.members
    }

    /// Number of virtual positions.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl std::fmt::Debug for Ring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ring")
            .field("members", &self.members)
            .field("points", &self.points.len())
            .finish()
    }
}

/// Selects the worker handle for a routing key over a registry snapshot.
#[derive(Clone)]
pub struct ConsistentHashRouter {
    pool_size: usize,
    hasher: Arc<dyn RoutingHash>,
}

impl ConsistentHashRouter {
    /// Creates a router with `pool_size` virtual positions per worker (min 1).
    pub fn new(pool_size: usize, hasher: Arc<dyn RoutingHash>) -> Self {
        Self {
            pool_size: pool_size.max(1),
            hasher,
        }
    }

    /// Creates a router using [`Sha256Hash`].
    pub fn with_default_hash(pool_size: usize) -> Self {
        Self::new(pool_size, Arc::new(Sha256Hash))
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Builds the ring for a set of ids (duplicates are ignored).
    pub fn ring<'a, I>(&self, ids: I) -> Ring
    where
        I: IntoIterator<Item = &'a WorkerId>,
    {
        let mut members: Vec<WorkerId> = ids.into_iter().cloned().collect();
        members.sort_unstable();
        members.dedup();

        let mut points = Vec::with_capacity(members.len() * self.pool_size);
        let mut label = String::new();
        for (idx, id) in members.iter().enumerate() {
            for vnode in 0..self.pool_size {
                label.clear();
                let _ = write!(label, "{id}#{vnode}");
                points.push((self.hasher.hash_bytes(label.as_bytes()), idx as u32));
            }
        }
        points.sort_unstable();

        Ring {
            hasher: Arc::clone(&self.hasher),
            members,
            points,
        }
    }

    /// Picks the handle owning `key` among `handles`, or `None` if there are none.
    pub fn pick<'a>(&self, handles: &'a [WorkerHandle], key: &DeviceId) -> Option<&'a WorkerHandle> {
        let ring = self.ring(handles.iter().map(WorkerHandle::id));
        let owner = ring.owner(key)?;
        handles
            .iter()
            .filter(|h| h.id() == owner)
            .max_by_key(|h| h.incarnation())
    }

    /// Selects the handle for `key` over the snapshot's live handles.
    ///
    /// Fails with [`RouteError::NoWorkersAvailable`] when the snapshot is empty.
    pub fn select(&self, snapshot: &Snapshot, key: &DeviceId) -> Result<WorkerHandle, RouteError> {
        self.pick(snapshot.handles(), key)
            .cloned()
            .ok_or_else(|| RouteError::NoWorkersAvailable {
                service: snapshot.service().clone(),
            })
    }
}

impl std::fmt::Debug for ConsistentHashRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsistentHashRouter")
            .field("pool_size", &self.pool_size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;
    use crate::registry::{Registry, ServiceKey};
    use tokio::sync::mpsc;

    fn ids(n: usize) -> Vec<WorkerId> {
        (0..n).map(|i| WorkerId::new(format!("w-{i}"))).collect()
    }

    fn keys(n: usize) -> Vec<DeviceId> {
        (0..n).map(|i| DeviceId::new(format!("device-{i}"))).collect()
    }

    fn handle(id: &str, incarnation: u64) -> (WorkerHandle, mpsc::Receiver<Command>) {
        let (tx, rx) = mpsc::channel(1);
        (WorkerHandle::new(WorkerId::new(id), incarnation, tx), rx)
    }

    #[test]
    fn test_empty_snapshot_fails() {
        let router = ConsistentHashRouter::with_default_hash(5);
        let reg = Registry::new();
        let snap = reg.lookup(&ServiceKey::new("pool"));

        let err = router.select(&snap, &DeviceId::new("d1")).unwrap_err();
        assert_eq!(
            err,
            RouteError::NoWorkersAvailable {
                service: ServiceKey::new("pool")
            }
        );
    }

    #[test]
    fn test_select_is_deterministic() {
        let reg = Registry::new();
        let key = ServiceKey::new("pool");
        let mut inboxes = Vec::new();
        for i in 0..5 {
            let (h, rx) = handle(&format!("w-{i}"), 1);
            inboxes.push(rx);
            reg.register(&key, h);
        }
        let snap = reg.lookup(&key);
        let a = ConsistentHashRouter::with_default_hash(5);
        let b = ConsistentHashRouter::with_default_hash(5);

        for device in keys(200) {
            let first = a.select(&snap, &device).unwrap();
            for _ in 0..3 {
                assert_eq!(a.select(&snap, &device).unwrap(), first);
            }
            assert_eq!(b.select(&snap, &device).unwrap(), first);
        }
    }

    #[test]
    fn test_ring_ignores_input_order() {
        let router = ConsistentHashRouter::with_default_hash(16);
        let mut members = ids(6);
        let forward = router.ring(&members);
        members.reverse();
        let backward = router.ring(&members);

        for device in keys(500) {
            assert_eq!(forward.owner(&device), backward.owner(&device));
        }
        assert_eq!(forward.len(), 6 * 16);
    }

    #[test]
    fn test_removing_a_worker_moves_only_its_keys() {
        let router = ConsistentHashRouter::with_default_hash(64);
        let members = ids(10);
        let before = router.ring(&members);
        let removed = members[3].clone();
        let after = router.ring(members.iter().filter(|id| **id != removed));

        let sample = keys(10_000);
        let mut moved = 0usize;
        for device in &sample {
            let old = before.owner(device).unwrap();
            let new = after.owner(device).unwrap();
            if old != new {
                assert_eq!(old, &removed, "key {device} moved off a surviving worker");
                moved += 1;
            }
        }
        let fraction = moved as f64 / sample.len() as f64;
        assert!(fraction < 2.0 / 10.0, "moved {:.1}% of keys", fraction * 100.0);
    }

    #[test]
    fn test_adding_a_worker_only_takes_keys() {
        let router = ConsistentHashRouter::with_default_hash(64);
        let members = ids(10);
        let before = router.ring(&members);
        let mut grown = members.clone();
        grown.push(WorkerId::new("w-new"));
        let after = router.ring(&grown);

        let sample = keys(10_000);
        let mut moved = 0usize;
        for device in &sample {
            let old = before.owner(device).unwrap();
            let new = after.owner(device).unwrap();
            if old != new {
                assert_eq!(new.as_str(), "w-new");
                moved += 1;
            }
        }
        let fraction = moved as f64 / sample.len() as f64;
        assert!(fraction > 0.0);
        assert!(fraction < 2.0 / 11.0, "moved {:.1}% of keys", fraction * 100.0);
    }

    #[test]
    fn test_distribution_is_reasonable() {
        let router = ConsistentHashRouter::with_default_hash(100);
        let members = ids(5);
        let ring = router.ring(&members);

        let mut counts = vec![0usize; 5];
        for device in keys(10_000) {
            let owner = ring.owner(&device).unwrap();
            let idx = members.iter().position(|m| m == owner).unwrap();
            counts[idx] += 1;
        }
        for (i, count) in counts.iter().enumerate() {
            assert!(
                (1_000..3_000).contains(count),
                "worker {i} got {count} of 10000 keys"
            );
        }
    }

    #[test]
    fn test_collisions_break_ties_by_id() {
        let router = ConsistentHashRouter::new(3, Arc::new(|_: &[u8]| 42u64));
        let members = vec![WorkerId::new("w-b"), WorkerId::new("w-c"), WorkerId::new("w-a")];
        let ring = router.ring(&members);

        assert_eq!(ring.owner(&DeviceId::new("x")).unwrap().as_str(), "w-a");
        assert_eq!(ring.owner_of_point(0).unwrap().as_str(), "w-a");
        assert_eq!(ring.owner_of_point(u64::MAX).unwrap().as_str(), "w-a");
    }

    #[test]
    fn test_latest_incarnation_wins() {
        let router = ConsistentHashRouter::with_default_hash(5);
        let (old, _r1) = handle("w-0", 1);
        let (new, _r2) = handle("w-0", 2);
        let handles = vec![old, new.clone()];

        let picked = router.pick(&handles, &DeviceId::new("d1")).unwrap();
        assert_eq!(picked, &new);
    }

    #[test]
    fn test_zero_pool_size_is_clamped() {
        let router = ConsistentHashRouter::with_default_hash(0);
        assert_eq!(router.pool_size(), 1);
        assert_eq!(router.ring(&ids(3)).len(), 3);
    }
}
