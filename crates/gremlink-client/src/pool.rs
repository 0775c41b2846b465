// Pending-request registry, owned exclusively by the multiplexer task.
use std::collections::HashMap;

use gremlink_wire::ResponseMessage;
use tokio::sync::mpsc;
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::Error;

/// Sending side of one request's output stream. Writes are best-effort: a
/// caller that dropped its handle does not propagate back here.
pub(crate) type ResponseTx = mpsc::UnboundedSender<Result<ResponseMessage, Error>>;

pub(crate) struct PendingRequest {
    pub(crate) output: ResponseTx,
    pub(crate) deadline: Instant,
}

/// Maps in-flight correlation ids to their output streams and deadlines.
///
/// Timers are deadline values, not tasks: the multiplexer re-enumerates
/// [`expirations`](Self::expirations) every loop iteration, so removing an
/// entry is what cancels its timer.
#[derive(Default)]
pub(crate) struct RequestPool {
    entries: HashMap<Uuid, PendingRequest>,
}

impl RequestPool {
    pub(crate) fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    /// Insert a new entry unless `id` is already pending. `build` is only
    /// invoked when the insert will happen.
    pub(crate) fn try_insert(
        &mut self,
        id: Uuid,
        build: impl FnOnce() -> PendingRequest,
    ) -> bool {
        if self.entries.contains_key(&id) {
            return false;
        }
        self.entries.insert(id, build());
        true
    }

    pub(crate) fn get(&self, id: &Uuid) -> Option<&PendingRequest> {
        self.entries.get(id)
    }

    /// Remove an entry, cancelling its timer. Absent ids are a no-op.
    pub(crate) fn remove(&mut self, id: &Uuid) -> Option<PendingRequest> {
        self.entries.remove(id)
    }

    /// Live deadlines, one per entry, for the loop's timer race.
    pub(crate) fn expirations(&self) -> impl Iterator<Item = (Uuid, Instant)> + '_ {
        self.entries.iter().map(|(id, entry)| (*id, entry.deadline))
    }

    /// Fail every pending request with `error` and empty the pool.
    pub(crate) fn drain(&mut self, error: &Error) {
        for (_, entry) in self.entries.drain() {
            let _ = entry.output.send(Err(error.clone()));
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
