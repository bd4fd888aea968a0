//! # Terms & Conditions Store
//!
//! Holds the device's TC requirements (immutable config) and the last
//! recorded acceptance (mutable, durable).
//!
//! Persisted under [`TC_KEY`] as a versioned bincode record. Writes are
//! persist-then-swap: if the store rejects the write, the in-memory
//! acceptance is left untouched, so version and bitmask never diverge.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::TermsConfig;
use crate::ports::KeyValueStore;

use super::entities::{TcAttributes, TermsAcceptance};
use super::errors::{GateError, GateResult};

/// Storage key of the acceptance record.
pub const TC_KEY: &[u8] = b"g/tc";

/// Current layout version of the persisted record.
pub const TC_SERIALIZATION_VERSION: u8 = 1;

#[derive(Serialize, Deserialize)]
struct TermsRecord {
    serialization_version: u8,
    acknowledgements: u16,
    version: u16,
}

/// Result of checking the current acceptance against the device requirements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TermsCheck {
    Met,
    /// Nothing was ever accepted.
    NeverAccepted,
    /// Accepted version is below the device minimum.
    VersionTooLow { accepted: u16, minimum: u16 },
    /// Some required clause bits are missing.
    MissingAcknowledgements { missing: u16 },
}

impl TermsCheck {
    pub fn is_met(&self) -> bool {
        matches!(self, Self::Met)
    }
}

/// TC attribute store.
#[derive(Debug)]
pub struct TermsStore {
    config: TermsConfig,
    accepted: Option<TermsAcceptance>,
}

impl TermsStore {
    /// A store with no recorded acceptance.
    pub fn new(config: TermsConfig) -> Self {
        Self {
            config,
            accepted: None,
        }
    }

    /// Load the persisted acceptance, if any.
    pub fn load<S: KeyValueStore + ?Sized>(config: TermsConfig, kv: &S) -> GateResult<Self> {
        let accepted = match kv.get(TC_KEY)? {
            None => None,
            Some(bytes) => {
                let record: TermsRecord = bincode::deserialize(&bytes)?;
                if record.serialization_version != TC_SERIALIZATION_VERSION {
                    return Err(GateError::VersionMismatch {
                        found: record.serialization_version,
                        expected: TC_SERIALIZATION_VERSION,
                    });
                }
                Some(TermsAcceptance::new(record.version, record.acknowledgements))
            }
        };
        if let Some(acceptance) = accepted {
            debug!(
                version = acceptance.version,
                acknowledgements = acceptance.acknowledgements,
                "[terms] Loaded persisted acceptance"
            );
        }
        Ok(Self { config, accepted })
    }

    pub fn accepted_version(&self) -> u16 {
        self.accepted.map(|a| a.version).unwrap_or(0)
    }

    pub fn acknowledgements(&self) -> u16 {
        self.accepted.map(|a| a.acknowledgements).unwrap_or(0)
    }

    pub fn min_required_version(&self) -> u16 {
        self.config.min_required_version
    }

    pub fn acknowledgements_required(&self) -> bool {
        self.config.acknowledgements_required
    }

    pub fn required_acknowledgements(&self) -> u16 {
        self.config.required_acknowledgements
    }

    pub fn acceptance(&self) -> Option<TermsAcceptance> {
        self.accepted
    }

    /// Record an acceptance. Persists first, then updates memory.
    pub fn write<S: KeyValueStore + ?Sized>(
        &mut self,
        kv: &mut S,
        acceptance: TermsAcceptance,
    ) -> GateResult<()> {
        let record = TermsRecord {
            serialization_version: TC_SERIALIZATION_VERSION,
            acknowledgements: acceptance.acknowledgements,
            version: acceptance.version,
        };
        let bytes = bincode::serialize(&record)?;
        kv.put(TC_KEY, &bytes)?;
        self.accepted = Some(acceptance);
        info!(
            version = acceptance.version,
            acknowledgements = acceptance.acknowledgements,
            "[terms] Acceptance recorded"
        );
        Ok(())
    }

    /// Drop the in-memory acceptance once the gate has deleted [`TC_KEY`].
    /// Only a factory reset does this.
    pub fn forget(&mut self) {
        self.accepted = None;
    }

    /// Check the recorded acceptance against version floor and required bits.
    ///
    /// This does not look at `acknowledgements_required`; the caller decides
    /// whether the check applies.
    pub fn requirements_met(&self) -> TermsCheck {
        let Some(acceptance) = self.accepted else {
            return TermsCheck::NeverAccepted;
        };
        if acceptance.version < self.config.min_required_version {
            return TermsCheck::VersionTooLow {
                accepted: acceptance.version,
                minimum: self.config.min_required_version,
            };
        }
        if !acceptance.covers(self.config.required_acknowledgements) {
            return TermsCheck::MissingAcknowledgements {
                missing: self.config.required_acknowledgements & !acceptance.acknowledgements,
            };
        }
        TermsCheck::Met
    }

    pub fn attributes(&self) -> TcAttributes {
        TcAttributes {
            accepted_version: self.accepted_version(),
            acknowledgements: self.acknowledgements(),
            min_required_version: self.config.min_required_version,
            acknowledgements_required: self.config.acknowledgements_required,
        }
    }
}
