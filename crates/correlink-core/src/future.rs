//! Future-based requests (requires the `async` feature).
//!
//! The correlation core is callback driven and runtime agnostic. These helpers
//! bridge a response callback into a `tokio::sync::oneshot` so async callers
//! can `.await` the answer, and layer an optional deadline on top.

use std::time::Duration;

use correlink_envelope::RequestId;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::debug;

use crate::correlator::Correlator;
use crate::error::{CorrelatorError, Result};

impl Correlator {
    /// Send a request and wait for its response.
    ///
    /// Resolves to [`CorrelatorError::Abandoned`] if the connection is torn
    /// down before the response arrives. Dropping the future cancels the
    /// pending entry.
    pub async fn request(&self, data: Value) -> Result<Value> {
        let (mut pending, rx) = self.start_request(data)?;
        let outcome = rx.await;
        pending.disarm();
        outcome.map_err(|_| CorrelatorError::Abandoned(pending.id.clone()))
    }

    /// Send a request and wait at most `timeout` for its response.
    ///
    /// On expiry the pending entry is cancelled, so a late response is
    /// dropped instead of resolving a callback nobody waits for.
    pub async fn request_timeout(&self, data: Value, timeout: Duration) -> Result<Value> {
        let (mut pending, rx) = self.start_request(data)?;
        match tokio::time::timeout(timeout, rx).await {
            Ok(outcome) => {
                pending.disarm();
                outcome.map_err(|_| CorrelatorError::Abandoned(pending.id.clone()))
            }
            Err(_) => {
                debug!(request_id = %pending.id, ?timeout, "request timed out");
                Err(CorrelatorError::Timeout(timeout))
            }
        }
    }

    fn start_request(&self, data: Value) -> Result<(PendingRequest, oneshot::Receiver<Value>)> {
        let (tx, rx) = oneshot::channel();
        let id = self.send_request(data, move |value| {
            // The receiver is gone only if the caller stopped waiting.
            let _ = tx.send(value);
        })?;
        let pending = PendingRequest {
            correlator: self.clone(),
            id,
            armed: true,
        };
        Ok((pending, rx))
    }
}

/// Cancels its request when dropped while still armed, e.g. when the caller's
/// future loses a `select!`.
struct PendingRequest {
    correlator: Correlator,
    id: RequestId,
    armed: bool,
}

impl PendingRequest {
    /// The receiver has settled; the registry no longer holds this id.
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingRequest {
    fn drop(&mut self) {
        if self.armed {
            self.correlator.cancel(&self.id);
        }
    }
}
