//! Pending request table
//!
//! Every outgoing request gets a fresh numeric id and a oneshot channel. The
//! entry lives in the table until exactly one of these happens:
//!
//! 1. **Response**: a response with the same id arrives, the entry is removed
//!    and the caller receives the `result` (or the `error` object)
//! 2. **Connection lost**: the connection drops and every entry is failed
//!    with `Error::ConnectionLost`
//! 3. **Send failure / timeout**: the client removes the entry itself
//!
//! Ids start at 1 and are never reused within a client. Responses carrying an
//! id that is not (or no longer) pending are reported to the caller of
//! [`RequestManager::complete`], which logs and drops them.
//!
//! The table uses a `std` mutex: no critical section spans an await, and the
//! client needs to register while holding the connection slot.

use jsonlink_core::{Error, Id, JsonRpcResponse, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::oneshot;

/// Receives the outcome of one request
pub(crate) type ResponseReceiver = oneshot::Receiver<Result<Value>>;

struct PendingRequest {
    method: String,
    issued_at: Instant,
    tx: oneshot::Sender<Result<Value>>,
}

#[derive(Clone)]
pub(crate) struct RequestManager {
    pending: Arc<Mutex<HashMap<Id, PendingRequest>>>,
    counter: Arc<AtomicI64>,
}

impl RequestManager {
    pub(crate) fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            counter: Arc::new(AtomicI64::new(1)),
        }
    }

    pub(crate) fn next_id(&self) -> Id {
        Id::Number(self.counter.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a pending request under `id`
    ///
    /// Fails if the id is already pending; ids come from `next_id`, so this
    /// only happens when the table is fed by hand.
    pub(crate) fn register(&self, id: Id, method: &str) -> Result<ResponseReceiver> {
        let mut pending = crate::lock(&self.pending);
        if pending.contains_key(&id) {
            return Err(Error::Internal(format!("request id {} already pending", id)));
        }

        let (tx, rx) = oneshot::channel();
        pending.insert(
            id,
            PendingRequest {
                method: method.to_string(),
                issued_at: Instant::now(),
                tx,
            },
        );
        Ok(rx)
    }

    /// Settle the request a response belongs to
    ///
    /// Returns false when no request with that id is pending.
    pub(crate) fn complete(&self, response: JsonRpcResponse) -> bool {
        let entry = crate::lock(&self.pending).remove(&response.id);
        let Some(entry) = entry else {
            return false;
        };

        tracing::debug!(
            id = %response.id,
            method = %entry.method,
            elapsed_ms = entry.issued_at.elapsed().as_millis() as u64,
            is_error = response.is_error(),
            "Response correlated"
        );
        // The caller may have given up (timeout, dropped future).
        let _ = entry.tx.send(response.into_outcome());
        true
    }

    /// Settle one request with an error
    pub(crate) fn fail(&self, id: &Id, error: Error) -> bool {
        match crate::lock(&self.pending).remove(id) {
            Some(entry) => {
                let _ = entry.tx.send(Err(error));
                true
            }
            None => false,
        }
    }

    /// Fail every pending request, returning how many there were
    pub(crate) fn fail_all(&self, error: Error) -> usize {
        let drained: Vec<(Id, PendingRequest)> = crate::lock(&self.pending).drain().collect();
        let count = drained.len();

        for (id, entry) in drained {
            tracing::debug!(
                id = %id,
                method = %entry.method,
                age_ms = entry.issued_at.elapsed().as_millis() as u64,
                error = %error,
                "Failing pending request"
            );
            let _ = entry.tx.send(Err(error.clone()));
        }
        count
    }

    pub(crate) fn pending_count(&self) -> usize {
        crate::lock(&self.pending).len()
    }
}

impl Default for RequestManager {
    fn default() -> Self {
        Self::new()
    }
}
