use correlink_envelope::DEFAULT_PROTOCOL_TAG;

use crate::error::{CorrelatorError, Result};

/// Tombstones tolerated before the registry is rebuilt.
pub const DEFAULT_COMPACTION_THRESHOLD: usize = 32;

const MAX_PROTOCOL_TAG_LEN: usize = 64;

/// Per-connection correlation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelatorConfig {
    /// Tag identifying this protocol's envelopes. Both peers must agree.
    pub protocol_tag: String,
    /// Deletions since the last compaction that trigger the next one.
    pub compaction_threshold: usize,
    /// First value of the per-connection request id counter.
    pub first_request_id: u64,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            protocol_tag: DEFAULT_PROTOCOL_TAG.to_string(),
            compaction_threshold: DEFAULT_COMPACTION_THRESHOLD,
            first_request_id: 1,
        }
    }
}

impl CorrelatorConfig {
    /// Reject settings the correlator cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.protocol_tag.is_empty() {
            return Err(CorrelatorError::InvalidConfig(
                "protocol tag must not be empty".to_string(),
            ));
        }
        if self.protocol_tag.len() > MAX_PROTOCOL_TAG_LEN {
            return Err(CorrelatorError::InvalidConfig(format!(
                "protocol tag exceeds {MAX_PROTOCOL_TAG_LEN} bytes"
            )));
        }
        if self.compaction_threshold == 0 {
            return Err(CorrelatorError::InvalidConfig(
                "compaction threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = CorrelatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.compaction_threshold, 32);
        assert_eq!(config.protocol_tag, "correlink");
    }

    #[test]
    fn rejects_empty_tag_and_zero_threshold() {
        let empty_tag = CorrelatorConfig {
            protocol_tag: String::new(),
            ..CorrelatorConfig::default()
        };
        assert!(matches!(
            empty_tag.validate(),
            Err(CorrelatorError::InvalidConfig(_))
        ));

        let zero = CorrelatorConfig {
            compaction_threshold: 0,
            ..CorrelatorConfig::default()
        };
        assert!(matches!(
            zero.validate(),
            Err(CorrelatorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_oversized_tag() {
        let config = CorrelatorConfig {
            protocol_tag: "t".repeat(65),
            ..CorrelatorConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
