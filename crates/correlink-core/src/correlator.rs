use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use correlink_channel::Channel;
use correlink_envelope::{Envelope, EnvelopeError, EnvelopeKind, RequestId};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::config::CorrelatorConfig;
use crate::error::{CorrelatorError, Result};
use crate::ids::IdGenerator;
use crate::registry::Registry;
use crate::responder::Responder;

/// Application handler for inbound requests.
pub type RequestHandler = Arc<dyn Fn(Value, Responder) + Send + Sync>;

/// Point-in-time counters of one correlator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CorrelatorStats {
    /// Requests awaiting a response.
    pub pending: usize,
    /// Tombstones not yet compacted away.
    pub tombstones: usize,
    /// Registry compactions performed.
    pub compactions: u64,
    /// Requests handed to the channel.
    pub requests_sent: u64,
    /// Requests received from the peer.
    pub requests_received: u64,
    /// Responses that resolved a pending request.
    pub responses_resolved: u64,
    /// Responses that matched nothing and were dropped.
    pub responses_dropped: u64,
}

struct State {
    registry: Registry,
    ids: IdGenerator,
    closed: bool,
}

struct Inner {
    label: Option<String>,
    config: CorrelatorConfig,
    tag: Arc<str>,
    channel: Arc<dyn Channel>,
    state: Mutex<State>,
    handler: RwLock<Option<RequestHandler>>,
    requests_sent: AtomicU64,
    requests_received: AtomicU64,
    responses_resolved: AtomicU64,
    responses_dropped: AtomicU64,
}

/// Request/response correlation for one logical connection.
///
/// Cloning is cheap and every clone drives the same registry. All registry
/// mutations are serialized by a per-connection mutex; callbacks and request
/// handlers always run after that lock is released, so they may call back
/// into the correlator.
#[derive(Clone)]
pub struct Correlator {
    inner: Arc<Inner>,
}

impl Correlator {
    /// Create a correlator with default configuration.
    pub fn new(channel: impl Channel + 'static) -> Self {
        Self::build(None, Arc::new(channel), CorrelatorConfig::default())
    }

    /// Create a correlator with explicit configuration.
    pub fn with_config(channel: impl Channel + 'static, config: CorrelatorConfig) -> Result<Self> {
        Self::from_shared(Arc::new(channel), config)
    }

    /// Create a correlator over a channel handle shared with other owners.
    pub fn from_shared(channel: Arc<dyn Channel>, config: CorrelatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(None, channel, config))
    }

    pub(crate) fn for_connection(
        connection_id: &str,
        channel: Arc<dyn Channel>,
        config: CorrelatorConfig,
    ) -> Self {
        Self::build(Some(connection_id.to_string()), channel, config)
    }

    fn build(label: Option<String>, channel: Arc<dyn Channel>, config: CorrelatorConfig) -> Self {
        let state = State {
            registry: Registry::with_threshold(config.compaction_threshold),
            ids: IdGenerator::new(config.first_request_id),
            closed: false,
        };
        Self {
            inner: Arc::new(Inner {
                label,
                tag: Arc::from(config.protocol_tag.as_str()),
                config,
                channel,
                state: Mutex::new(state),
                handler: RwLock::new(None),
                requests_sent: AtomicU64::new(0),
                requests_received: AtomicU64::new(0),
                responses_resolved: AtomicU64::new(0),
                responses_dropped: AtomicU64::new(0),
            }),
        }
    }

    /// Connection id assigned by a [`crate::ConnectionHub`], if any.
    pub fn connection_id(&self) -> Option<&str> {
        self.inner.label.as_deref()
    }

    pub fn config(&self) -> &CorrelatorConfig {
        &self.inner.config
    }

    /// Register the handler for inbound requests, replacing any previous one.
    pub fn on_request<F>(&self, handler: F)
    where
        F: Fn(Value, Responder) + Send + Sync + 'static,
    {
        self.set_handler(Arc::new(handler));
    }

    pub(crate) fn set_handler(&self, handler: RequestHandler) {
        let mut slot = self
            .inner
            .handler
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(handler);
    }

    /// Send a request and remember `on_response` until its response arrives.
    ///
    /// Returns the id the request was tagged with. There is no timeout: an
    /// unanswered request stays pending until [`Correlator::cancel`] or
    /// [`Correlator::close`].
    pub fn send_request<F>(&self, data: Value, on_response: F) -> Result<RequestId>
    where
        F: FnOnce(Value) + Send + 'static,
    {
        let id = {
            let mut state = self.state();
            if state.closed {
                return Err(CorrelatorError::Closed);
            }
            let State { registry, ids, .. } = &mut *state;
            let id = ids.next_id(|candidate| registry.is_pending(candidate));
            registry.insert(id.clone(), Box::new(on_response))?;
            id
        };

        let message = Envelope::request(self.inner.tag.as_ref(), id.clone(), data).into_message();
        debug!(
            connection = self.label(),
            request_id = %id,
            "sending request"
        );

        if let Err(err) = self.inner.channel.send(message) {
            // The peer never saw this id, so nothing can ever answer it.
            self.state().registry.remove(&id);
            warn!(
                connection = self.label(),
                request_id = %id,
                error = %err,
                "request send failed"
            );
            return Err(err.into());
        }

        self.inner.requests_sent.fetch_add(1, Ordering::Relaxed);
        Ok(id)
    }

    /// Inspect one inbound message.
    ///
    /// Returns `false` when the message is not an envelope of this protocol;
    /// the caller must then deliver it normally. Every protocol envelope is
    /// consumed, including responses that match nothing.
    pub fn dispatch_incoming(&self, message: &Value) -> bool {
        let Some(envelope) = Envelope::from_message(message, &self.inner.tag) else {
            trace!(connection = self.label(), "passing through foreign message");
            return false;
        };

        match envelope.kind {
            EnvelopeKind::Request(id) => self.dispatch_request(id, envelope.data),
            EnvelopeKind::Response(id) => self.dispatch_response(id, envelope.data),
        }
        true
    }

    /// Inspect one inbound message delivered as JSON bytes.
    ///
    /// For byte-oriented transports. Bytes that are not JSON at all fail with
    /// [`CorrelatorError::Envelope`]; valid JSON is routed like
    /// [`Correlator::dispatch_incoming`].
    pub fn dispatch_bytes(&self, bytes: &[u8]) -> Result<bool> {
        let message: Value = serde_json::from_slice(bytes).map_err(EnvelopeError::from)?;
        Ok(self.dispatch_incoming(&message))
    }

    /// Incoming transform that feeds this correlator.
    pub fn incoming_hook(&self) -> impl Fn(&Value) -> bool + Send + Sync + 'static {
        let correlator = self.clone();
        move |message: &Value| correlator.dispatch_incoming(message)
    }

    /// Forget a pending request without invoking its callback.
    ///
    /// A response arriving later is dropped. Returns `false` if the request
    /// was not pending.
    pub fn cancel(&self, id: &RequestId) -> bool {
        let cancelled = self.state().registry.cancel(id);
        if cancelled {
            debug!(connection = self.label(), request_id = %id, "request cancelled");
        }
        cancelled
    }

    /// Whether `id` is still awaiting its response.
    pub fn is_pending(&self, id: &RequestId) -> bool {
        self.state().registry.is_pending(id)
    }

    pub fn pending_count(&self) -> usize {
        self.state().registry.pending_count()
    }

    pub fn stats(&self) -> CorrelatorStats {
        let (pending, tombstones, compactions) = {
            let state = self.state();
            (
                state.registry.pending_count(),
                state.registry.tombstone_count(),
                state.registry.compactions(),
            )
        };
        CorrelatorStats {
            pending,
            tombstones,
            compactions,
            requests_sent: self.inner.requests_sent.load(Ordering::Relaxed),
            requests_received: self.inner.requests_received.load(Ordering::Relaxed),
            responses_resolved: self.inner.responses_resolved.load(Ordering::Relaxed),
            responses_dropped: self.inner.responses_dropped.load(Ordering::Relaxed),
        }
    }

    /// Tear down: discard the registry and refuse new requests.
    ///
    /// Pending callbacks are dropped without being invoked. Envelopes that
    /// arrive afterwards are still consumed but trigger nothing. Returns the
    /// number of abandoned requests; closing twice abandons nothing.
    pub fn close(&self) -> usize {
        let abandoned = {
            let mut state = self.state();
            if state.closed {
                return 0;
            }
            state.closed = true;
            state.registry.clear()
        };
        debug!(connection = self.label(), abandoned, "correlator closed");
        abandoned
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    fn dispatch_request(&self, id: RequestId, data: Value) {
        if self.is_closed() {
            debug!(connection = self.label(), request_id = %id, "request after close dropped");
            return;
        }
        self.inner.requests_received.fetch_add(1, Ordering::Relaxed);

        let handler = self
            .inner
            .handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(handler) = handler else {
            warn!(
                connection = self.label(),
                request_id = %id,
                "no request handler registered; request dropped"
            );
            return;
        };

        debug!(connection = self.label(), request_id = %id, "dispatching request");
        let responder = Responder::new(
            id,
            Arc::clone(&self.inner.tag),
            Arc::clone(&self.inner.channel),
        );
        handler(data, responder);
    }

    fn dispatch_response(&self, id: RequestId, data: Value) {
        let callback = {
            let mut state = self.state();
            if state.closed {
                None
            } else {
                state.registry.resolve(&id)
            }
        };

        match callback {
            Some(callback) => {
                debug!(connection = self.label(), request_id = %id, "resolving request");
                self.inner.responses_resolved.fetch_add(1, Ordering::Relaxed);
                callback(data);
            }
            None => {
                debug!(
                    connection = self.label(),
                    request_id = %id,
                    "response matches no pending request; dropped"
                );
                self.inner.responses_dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn label(&self) -> &str {
        self.inner.label.as_deref().unwrap_or("-")
    }
}

impl fmt::Debug for Correlator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Correlator")
            .field("connection", &self.inner.label)
            .field("tag", &self.inner.tag)
            .field("transport", &self.inner.channel.transport_name())
            .field("stats", &self.stats())
            .finish()
    }
}
