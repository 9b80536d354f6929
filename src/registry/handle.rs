use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use tokio::sync::mpsc;

use crate::commands::Command;
use crate::registry::keys::WorkerId;

/// Address of one worker incarnation.
///
/// Identity is `(id, incarnation)`; the inbox sender is carried along but does
/// not take part in comparisons. Handles are owned by the [`Registry`](crate::Registry);
/// callers get clones per lookup and must not keep them across restarts.
#[derive(Clone)]
pub struct WorkerHandle {
    id: WorkerId,
    incarnation: u64,
    inbox: mpsc::Sender<Command>,
}

impl WorkerHandle {
    pub fn new(id: WorkerId, incarnation: u64, inbox: mpsc::Sender<Command>) -> Self {
        Self {
            id,
            incarnation,
            inbox,
        }
    }

    pub fn id(&self) -> &WorkerId {
        &self.id
    }

    /// Monotonic per-slot counter, starting at 1.
    pub fn incarnation(&self) -> u64 {
        self.incarnation
    }

    /// True once the worker behind this handle dropped its inbox.
    pub fn is_closed(&self) -> bool {
        self.inbox.is_closed()
    }

    pub(crate) fn inbox(&self) -> &mpsc::Sender<Command> {
        &self.inbox
    }
}

impl PartialEq for WorkerHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.incarnation == other.incarnation
    }
}

impl Eq for WorkerHandle {}

impl Ord for WorkerHandle {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id
            .cmp(&other.id)
            .then(self.incarnation.cmp(&other.incarnation))
    }
}

impl PartialOrd for WorkerHandle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for WorkerHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.incarnation.hash(state);
    }
}

impl fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("id", &self.id)
            .field("incarnation", &self.incarnation)
            .field("closed", &self.is_closed())
            .finish()
    }
}
