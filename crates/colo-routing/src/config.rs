use serde::{Deserialize, Serialize};

use crate::error::{ColoError, ColoResult};
use crate::subnet::{MatchPolicy, DEFAULT_PREFIX_LEN};

/// Configuration for a [`SubnetRelayTransformer`](crate::SubnetRelayTransformer).
///
/// All fields have sensible defaults. Use the builder pattern:
///
/// ```rust
/// use colo_routing::TransformerConfig;
///
/// let config = TransformerConfig::new().prefix_len(24).host_network(false);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformerConfig {
    /// Prefix length two endpoints must share to count as co-located.
    pub(crate) prefix_len: u8,
    /// Relays run with host networking: match on the exact host address
    /// instead of the subnet.
    pub(crate) host_network: bool,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformerConfig {
    /// Create a new config with defaults.
    ///
    /// `COLO_PREFIX_LEN` and `COLO_HOST_NETWORK` (`1` or `true`) override the
    /// defaults when set and parseable.
    pub fn new() -> Self {
        let prefix_len = std::env::var("COLO_PREFIX_LEN")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PREFIX_LEN);
        let host_network = std::env::var("COLO_HOST_NETWORK")
            .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            prefix_len,
            host_network,
        }
    }

    /// Set the co-location prefix length (default: 24).
    pub fn prefix_len(mut self, len: u8) -> Self {
        self.prefix_len = len;
        self
    }

    /// Match relays by exact host address (default: false).
    pub fn host_network(mut self, enabled: bool) -> Self {
        self.host_network = enabled;
        self
    }

    /// Parse and validate a JSON config. Missing fields take defaults.
    pub fn from_json(json: &str) -> ColoResult<Self> {
        let config: TransformerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ColoResult<()> {
        if !(1..=32).contains(&self.prefix_len) {
            return Err(ColoError::InvalidPrefixLength {
                len: self.prefix_len,
            });
        }
        Ok(())
    }

    /// The match policy this config selects.
    pub fn policy(&self) -> MatchPolicy {
        if self.host_network {
            MatchPolicy::SameHost
        } else {
            MatchPolicy::Subnet {
                prefix_len: self.prefix_len,
            }
        }
    }
}
