/// Errors that can occur when handing messages to a channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The remote end of the channel is gone.
    #[error("channel closed")]
    Closed,

    /// An I/O error occurred in the underlying transport.
    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport refused the message.
    #[error("message rejected: {0}")]
    Rejected(String),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
