use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{ChannelError, Result};
use crate::traits::{Channel, IncomingHook, MessageListener};

/// Create two connected in-memory endpoints.
///
/// Whatever one endpoint's sender emits is queued for the other endpoint and
/// processed when that endpoint is pumped. Delivery is FIFO per direction.
pub fn memory_pair() -> (MemoryEndpoint, MemoryEndpoint) {
    let (a_tx, b_rx) = mpsc::channel();
    let (b_tx, a_rx) = mpsc::channel();
    (
        MemoryEndpoint::new("left", MemorySender { tx: a_tx }, a_rx),
        MemoryEndpoint::new("right", MemorySender { tx: b_tx }, b_rx),
    )
}

/// Outbound handle of a [`MemoryEndpoint`]. Cheap to clone.
#[derive(Clone, Debug)]
pub struct MemorySender {
    tx: Sender<Value>,
}

impl Channel for MemorySender {
    fn send(&self, message: Value) -> Result<()> {
        self.tx.send(message).map_err(|_| ChannelError::Closed)
    }

    fn transport_name(&self) -> &'static str {
        "memory"
    }
}

/// One side of an in-memory duplex connection.
///
/// Inbound messages first run through the incoming transforms in registration
/// order. The first transform that returns `true` consumes the message;
/// otherwise it is handed to every message listener.
pub struct MemoryEndpoint {
    name: &'static str,
    sender: MemorySender,
    inbox: Receiver<Value>,
    transforms: Vec<IncomingHook>,
    listeners: Vec<MessageListener>,
}

impl MemoryEndpoint {
    fn new(name: &'static str, sender: MemorySender, inbox: Receiver<Value>) -> Self {
        Self {
            name,
            sender,
            inbox,
            transforms: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Endpoint label used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Clone of the outbound handle.
    pub fn sender(&self) -> MemorySender {
        self.sender.clone()
    }

    /// Register an incoming transform.
    pub fn on_incoming<F>(&mut self, hook: F)
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.transforms.push(Box::new(hook));
    }

    /// Register a listener for normal message delivery.
    pub fn on_message<F>(&mut self, listener: F)
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Run one inbound message through transforms and listeners.
    ///
    /// Returns `true` if a transform consumed it.
    pub fn deliver(&self, message: Value) -> bool {
        if self.transforms.iter().any(|hook| hook(&message)) {
            trace!(endpoint = self.name, "message consumed by transform");
            return true;
        }
        trace!(
            endpoint = self.name,
            listeners = self.listeners.len(),
            "delivering message"
        );
        for listener in &self.listeners {
            listener(message.clone());
        }
        false
    }

    /// Wait up to `timeout` for one inbound message and deliver it.
    ///
    /// Returns `Ok(false)` on timeout and `Err(ChannelError::Closed)` once the
    /// peer and every clone of its sender are gone.
    pub fn pump_one(&self, timeout: Duration) -> Result<bool> {
        match self.inbox.recv_timeout(timeout) {
            Ok(message) => {
                self.deliver(message);
                Ok(true)
            }
            Err(RecvTimeoutError::Timeout) => Ok(false),
            Err(RecvTimeoutError::Disconnected) => Err(ChannelError::Closed),
        }
    }

    /// Deliver every message already queued, without blocking.
    ///
    /// Returns the number of messages delivered.
    pub fn pump_pending(&self) -> Result<usize> {
        let mut delivered = 0usize;
        loop {
            match self.inbox.try_recv() {
                Ok(message) => {
                    self.deliver(message);
                    delivered += 1;
                }
                Err(TryRecvError::Empty) => return Ok(delivered),
                Err(TryRecvError::Disconnected) if delivered == 0 => {
                    return Err(ChannelError::Closed)
                }
                Err(TryRecvError::Disconnected) => return Ok(delivered),
            }
        }
    }

    /// Deliver inbound messages until the peer hangs up.
    pub fn run(&self) -> Result<()> {
        while let Ok(message) = self.inbox.recv() {
            self.deliver(message);
        }
        debug!(endpoint = self.name, "peer disconnected");
        Ok(())
    }
}

impl std::fmt::Debug for MemoryEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEndpoint")
            .field("name", &self.name)
            .field("transforms", &self.transforms.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
