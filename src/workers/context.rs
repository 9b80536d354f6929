use tokio_util::sync::CancellationToken;

use crate::registry::{ServiceKey, WorkerId};

/// Identity and cancellation scope of one worker incarnation.
///
/// The token is cancelled when the incarnation is killed, its slot is
/// stopped, or the supervisor shuts down.
#[derive(Clone, Debug)]
pub struct WorkerContext {
    service: ServiceKey,
    worker: WorkerId,
    incarnation: u64,
    token: CancellationToken,
}

impl WorkerContext {
    pub(crate) fn new(
        service: ServiceKey,
        worker: WorkerId,
        incarnation: u64,
        token: CancellationToken,
    ) -> Self {
        Self {
            service,
            worker,
            incarnation,
            token,
        }
    }

    pub fn service(&self) -> &ServiceKey {
        &self.service
    }

    /// Slot id (stable across restarts).
    pub fn worker(&self) -> &WorkerId {
        &self.worker
    }

    /// 1-based incarnation counter of the slot.
    pub fn incarnation(&self) -> u64 {
        self.incarnation
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
