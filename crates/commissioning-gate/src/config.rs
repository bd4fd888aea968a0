//! # Gate Configuration
//!
//! Device-level constants of the commissioning gate. Everything here is
//! fixed for the lifetime of the process; the TC requirements in particular
//! are immutable attributes as seen by commissioners.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{BasicCommissioningInfo, MAX_FABRIC_INDEX, MIN_FABRIC_INDEX};

/// Terms & Conditions requirements of this device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermsConfig {
    /// When false the gate never blocks on TC.
    pub acknowledgements_required: bool,

    /// Minimum TC version a user must accept.
    pub min_required_version: u16,

    /// Clauses that must all be acknowledged before commissioning completes.
    pub required_acknowledgements: u16,
}

impl Default for TermsConfig {
    fn default() -> Self {
        Self {
            acknowledgements_required: true,
            min_required_version: 1,
            required_acknowledgements: 0x0001,
        }
    }
}

/// Fail-safe timing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailSafeConfig {
    /// Expiry a commissioner should use for its first arm.
    pub expiry_length_seconds: u16,

    /// Upper bound on a single attempt, re-arms included.
    pub max_cumulative_seconds: u16,
}

impl Default for FailSafeConfig {
    fn default() -> Self {
        Self {
            expiry_length_seconds: 60,
            max_cumulative_seconds: 900,
        }
    }
}

/// Complete gate configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    /// TC requirements.
    pub terms: TermsConfig,
    /// Fail-safe timing.
    pub fail_safe: FailSafeConfig,
    /// Maximum committed plus pending fabrics.
    #[serde(default = "default_max_fabrics")]
    pub max_fabrics: usize,
}

fn default_max_fabrics() -> usize {
    5
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            terms: TermsConfig::default(),
            fail_safe: FailSafeConfig::default(),
            max_fabrics: default_max_fabrics(),
        }
    }
}

impl GateConfig {
    /// Create a config for testing (TC required, short cumulative window).
    pub fn for_testing() -> Self {
        Self {
            terms: TermsConfig::default(),
            fail_safe: FailSafeConfig {
                expiry_length_seconds: 60,
                max_cumulative_seconds: 120,
            },
            max_fabrics: default_max_fabrics(),
        }
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fail_safe.max_cumulative_seconds < self.fail_safe.expiry_length_seconds {
            return Err(ConfigError::CumulativeBelowExpiry {
                expiry: self.fail_safe.expiry_length_seconds,
                cumulative: self.fail_safe.max_cumulative_seconds,
            });
        }
        let index_space = (MAX_FABRIC_INDEX - MIN_FABRIC_INDEX) as usize + 1;
        if self.max_fabrics == 0 || self.max_fabrics > index_space {
            return Err(ConfigError::FabricCapacity {
                requested: self.max_fabrics,
                max: index_space,
            });
        }
        Ok(())
    }

    /// Fail-safe parameters as advertised in `BasicCommissioningInfo`.
    pub fn basic_commissioning_info(&self) -> BasicCommissioningInfo {
        BasicCommissioningInfo {
            fail_safe_expiry_length_seconds: self.fail_safe.expiry_length_seconds,
            max_cumulative_failsafe_seconds: self.fail_safe.max_cumulative_seconds,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max cumulative fail-safe ({cumulative}s) is below the expiry length ({expiry}s)")]
    CumulativeBelowExpiry { expiry: u16, cumulative: u16 },

    #[error("fabric capacity {requested} outside 1..={max}")]
    FabricCapacity { requested: usize, max: usize },
}
