use std::fmt;

use correlink_channel::ChannelError;
use correlink_core::CorrelatorError;
use correlink_envelope::EnvelopeError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn channel_error(context: &str, err: ChannelError) -> CliError {
    match err {
        ChannelError::Closed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn envelope_error(context: &str, err: EnvelopeError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn correlator_error(context: &str, err: CorrelatorError) -> CliError {
    match err {
        CorrelatorError::Channel(err) => channel_error(context, err),
        CorrelatorError::Envelope(err) => envelope_error(context, err),
        CorrelatorError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        CorrelatorError::InvalidConfig(_) => CliError::new(USAGE, format!("{context}: {err}")),
        CorrelatorError::Closed | CorrelatorError::Abandoned(_) => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn timeout_maps_to_124() {
        let err = correlator_error("bench", CorrelatorError::Timeout(Duration::from_secs(1)));
        assert_eq!(err.code, TIMEOUT);
        assert!(err.message.starts_with("bench: "));
    }

    #[test]
    fn closed_channel_maps_to_failure() {
        let err = correlator_error("send", CorrelatorError::Channel(ChannelError::Closed));
        assert_eq!(err.code, FAILURE);
    }

    #[test]
    fn rejected_channel_maps_to_transport_error() {
        let err = channel_error("send", ChannelError::Rejected("full".to_string()));
        assert_eq!(err.code, TRANSPORT_ERROR);
    }

    #[test]
    fn invalid_config_maps_to_usage() {
        let err = correlator_error(
            "config",
            CorrelatorError::InvalidConfig("threshold".to_string()),
        );
        assert_eq!(err.code, USAGE);
    }
}
