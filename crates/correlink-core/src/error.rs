use std::time::Duration;

use correlink_envelope::RequestId;

/// Errors that can occur in correlation operations.
#[derive(Debug, thiserror::Error)]
pub enum CorrelatorError {
    /// The channel refused the outbound message.
    #[error("channel error: {0}")]
    Channel(#[from] correlink_channel::ChannelError),

    /// Envelope encode/decode error.
    #[error("envelope error: {0}")]
    Envelope(#[from] correlink_envelope::EnvelopeError),

    /// A generated id matched a live pending request.
    #[error("request id {0} is already pending")]
    IdCollision(RequestId),

    /// The connection has been torn down.
    #[error("connection closed")]
    Closed,

    /// No correlator is registered for the connection id.
    #[error("unknown connection: {0}")]
    UnknownConnection(String),

    /// The connection closed before the request was answered.
    #[error("request {0} abandoned by connection teardown")]
    Abandoned(RequestId),

    /// No response arrived in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Configuration rejected by validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, CorrelatorError>;
