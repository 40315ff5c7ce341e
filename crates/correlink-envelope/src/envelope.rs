use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{EnvelopeError, Result};
use crate::id::RequestId;

/// Default protocol tag carried under [`TAG_FIELD`].
pub const DEFAULT_PROTOCOL_TAG: &str = "correlink";

/// Key holding the protocol tag.
pub const TAG_FIELD: &str = "plugin";
/// Key holding the id of a request.
pub const REQUEST_ID_FIELD: &str = "requestId";
/// Key holding the id of the request a response answers.
pub const RESPONSE_ID_FIELD: &str = "responseId";
/// Key holding the application payload.
pub const DATA_FIELD: &str = "data";

/// Whether an envelope asks or answers, and for which id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeKind {
    Request(RequestId),
    Response(RequestId),
}

/// A decoded protocol message.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Protocol tag the envelope was sent with.
    pub tag: String,
    /// Request or response, with its correlation id.
    pub kind: EnvelopeKind,
    /// Application payload. Missing payloads decode as `null`.
    pub data: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEnvelope {
    plugin: String,
    #[serde(default)]
    request_id: Option<RequestId>,
    #[serde(default)]
    response_id: Option<RequestId>,
    #[serde(default)]
    data: Value,
}

impl Envelope {
    /// Build a request envelope.
    pub fn request(tag: impl Into<String>, id: RequestId, data: Value) -> Self {
        Self {
            tag: tag.into(),
            kind: EnvelopeKind::Request(id),
            data,
        }
    }

    /// Build a response envelope answering `id`.
    pub fn response(tag: impl Into<String>, id: RequestId, data: Value) -> Self {
        Self {
            tag: tag.into(),
            kind: EnvelopeKind::Response(id),
            data,
        }
    }

    /// The correlation id, whichever side it is on.
    pub fn id(&self) -> &RequestId {
        match &self.kind {
            EnvelopeKind::Request(id) | EnvelopeKind::Response(id) => id,
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(self.kind, EnvelopeKind::Request(_))
    }

    /// Convert into the JSON message handed to a channel.
    pub fn into_message(self) -> Value {
        let (id_field, id) = match self.kind {
            EnvelopeKind::Request(id) => (REQUEST_ID_FIELD, id),
            EnvelopeKind::Response(id) => (RESPONSE_ID_FIELD, id),
        };
        let mut object = Map::with_capacity(3);
        object.insert(TAG_FIELD.to_string(), Value::String(self.tag));
        object.insert(id_field.to_string(), Value::String(id.as_str().to_owned()));
        object.insert(DATA_FIELD.to_string(), self.data);
        Value::Object(object)
    }

    /// Serialize to JSON bytes for byte-oriented transports.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.clone().into_message())?)
    }

    /// Decode a raw inbound message.
    ///
    /// Returns `None` when the message does not belong to the protocol
    /// identified by `tag`: not an object, a different or missing tag, both
    /// or neither id present, or ids that are not strings or numbers.
    pub fn from_message(message: &Value, tag: &str) -> Option<Self> {
        let object = message.as_object()?;
        if object.get(TAG_FIELD).and_then(Value::as_str) != Some(tag) {
            return None;
        }

        let wire = match WireEnvelope::deserialize(message) {
            Ok(wire) => wire,
            Err(err) => {
                trace!(error = %err, "tagged message has malformed envelope fields");
                return None;
            }
        };

        let request_id = wire.request_id.filter(|id| !id.is_empty());
        let response_id = wire.response_id.filter(|id| !id.is_empty());
        let kind = match (request_id, response_id) {
            (Some(id), None) => EnvelopeKind::Request(id),
            (None, Some(id)) => EnvelopeKind::Response(id),
            (Some(_), Some(_)) => {
                trace!("tagged message carries both request and response ids");
                return None;
            }
            (None, None) => {
                trace!("tagged message carries no correlation id");
                return None;
            }
        };

        Some(Self {
            tag: wire.plugin,
            kind,
            data: wire.data,
        })
    }

    /// Decode JSON bytes.
    ///
    /// Unlike [`Envelope::from_message`], a message that is not an envelope is
    /// an error here, since the caller asked for an envelope explicitly.
    pub fn from_slice(bytes: &[u8], tag: &str) -> Result<Self> {
        let message: Value = serde_json::from_slice(bytes)?;
        Self::from_message(&message, tag).ok_or_else(|| {
            EnvelopeError::NotAnEnvelope(format!("expected a '{tag}' request or response"))
        })
    }
}
