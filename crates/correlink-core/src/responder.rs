use std::fmt;
use std::sync::Arc;

use correlink_channel::Channel;
use correlink_envelope::{Envelope, RequestId};
use serde_json::Value;
use tracing::debug;

use crate::error::Result;

/// Answers one inbound request.
///
/// Holds the request id and the connection's channel by value, so it can be
/// moved to another thread or kept after the handler returns. Responding more
/// than once is not prevented here; the peer drops every response after the
/// first.
#[derive(Clone)]
pub struct Responder {
    id: RequestId,
    tag: Arc<str>,
    channel: Arc<dyn Channel>,
}

impl Responder {
    pub(crate) fn new(id: RequestId, tag: Arc<str>, channel: Arc<dyn Channel>) -> Self {
        Self { id, tag, channel }
    }

    /// Id of the request being answered.
    pub fn request_id(&self) -> &RequestId {
        &self.id
    }

    /// Send `data` back as the response to this request.
    pub fn respond(&self, data: Value) -> Result<()> {
        let message = Envelope::response(self.tag.as_ref(), self.id.clone(), data).into_message();
        debug!(request_id = %self.id, "sending response");
        self.channel.send(message)?;
        Ok(())
    }
}

impl fmt::Debug for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder")
            .field("request_id", &self.id)
            .field("tag", &self.tag)
            .field("transport", &self.channel.transport_name())
            .finish()
    }
}
