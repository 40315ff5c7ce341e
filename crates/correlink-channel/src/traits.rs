use serde_json::Value;

use crate::error::Result;

/// Outbound half of a logical connection.
///
/// `send` is fire-and-forget from the caller's point of view: success means the
/// transport accepted the message, not that the peer received it. Messages are
/// JSON values; how they are serialized on the wire is the transport's business.
pub trait Channel: Send + Sync {
    /// Hand a complete message to the transport.
    fn send(&self, message: Value) -> Result<()>;

    /// Transport name for diagnostics.
    fn transport_name(&self) -> &'static str {
        "unknown"
    }
}

/// Incoming transform. Returns `true` when the message was consumed and must
/// not reach normal application delivery.
pub type IncomingHook = Box<dyn Fn(&Value) -> bool + Send + Sync>;

/// Normal delivery target for messages no transform consumed.
pub type MessageListener = Box<dyn Fn(Value) + Send + Sync>;
