//! Tagged request/response envelopes.
//!
//! Every protocol message is a JSON object carrying:
//! - a protocol tag under `plugin`, so foreign messages can be told apart
//! - exactly one of `requestId` / `responseId`
//! - the application payload under `data`
//!
//! Anything that does not have this shape is not ours and is left for normal
//! delivery.

pub mod envelope;
pub mod error;
pub mod id;

pub use envelope::{
    Envelope, EnvelopeKind, DATA_FIELD, DEFAULT_PROTOCOL_TAG, REQUEST_ID_FIELD, RESPONSE_ID_FIELD,
    TAG_FIELD,
};
pub use error::{EnvelopeError, Result};
pub use id::RequestId;
