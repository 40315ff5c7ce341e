/// Errors that can occur while decoding envelopes from raw bytes.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// The input is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The input is JSON but not an envelope of the expected protocol.
    #[error("not a protocol envelope: {0}")]
    NotAnEnvelope(String),
}

pub type Result<T> = std::result::Result<T, EnvelopeError>;
