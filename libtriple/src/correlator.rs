//! Delivery of reconciled responses to waiting callers.

use std::fmt;

use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::{
    error::TripleError,
    response::{RequestId, Response},
};

/// Hands a reconciled response to whoever is waiting for `id`.
///
/// Delivery is fire-and-forget: an unknown or already-completed id must be
/// a silent no-op.
pub trait ResponseCorrelator<T>: Send + Sync {
    /// Deliver the response for `id`
    fn deliver(&self, id: RequestId, response: Response<T>);
}

/// Pending-call table keyed by request id.
///
/// Callers [`register`](Self::register) before the request is sent and await
/// the returned receiver. The entry is removed on delivery, so each id is
/// delivered at most once.
pub struct PendingCalls<T> {
    waiters: DashMap<RequestId, oneshot::Sender<Response<T>>>,
}

impl<T> fmt::Debug for PendingCalls<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCalls")
            .field("pending", &self.waiters.len())
            .finish()
    }
}

impl<T> Default for PendingCalls<T> {
    fn default() -> Self {
        Self {
            waiters: DashMap::new(),
        }
    }
}

impl<T> PendingCalls<T> {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter for `id`.
    ///
    /// # Errors
    /// Returns [`TripleError::DuplicateRequest`] if `id` is still pending; the
    /// existing waiter is kept.
    pub fn register(&self, id: RequestId) -> Result<oneshot::Receiver<Response<T>>, TripleError> {
        match self.waiters.entry(id) {
            Entry::Occupied(_) => {
                warn!(request_id = %id, "request id already pending");
                Err(TripleError::DuplicateRequest(id))
            }
            Entry::Vacant(slot) => {
                let (tx, rx) = oneshot::channel();
                let _ = slot.insert(tx);
                Ok(rx)
            }
        }
    }

    /// Drop the waiter for `id`, e.g. after the caller timed out
    pub fn cancel(&self, id: RequestId) -> bool {
        self.waiters.remove(&id).is_some()
    }

    /// Whether a waiter is registered for `id`
    #[must_use]
    pub fn is_pending(&self, id: RequestId) -> bool {
        self.waiters.contains_key(&id)
    }

    /// Number of outstanding calls
    #[must_use]
    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    /// Whether no calls are outstanding
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}

impl<T: Send> ResponseCorrelator<T> for PendingCalls<T> {
    fn deliver(&self, id: RequestId, response: Response<T>) {
        let Some((_, tx)) = self.waiters.remove(&id) else {
            debug!(request_id = %id, "no waiter for response, dropping");
            return;
        };
        if tx.send(response).is_err() {
            debug!(request_id = %id, "waiter went away before delivery");
        }
    }
}
