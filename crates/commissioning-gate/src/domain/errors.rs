//! # Gate Error Types
//!
//! Two families live here:
//!
//! - **Wire outcomes** (`CommissioningError`, `OperationalCertStatus`,
//!   `ImStatus`): closed enums with stable `u8` values, returned to the caller.
//!   Validation failures are ordinary outcomes, not faults.
//! - **Internal failures** (`GateError`, `FabricError`, `KVStoreError`):
//!   storage and consistency problems that the dispatcher turns into an
//!   `ImStatus::Failure` at the boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;

use super::entities::FabricIndex;

/// Result code of the General Commissioning commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CommissioningError {
    Ok = 0,
    ValueOutsideRange = 1,
    InvalidAuthentication = 2,
    NoFailSafe = 3,
    BusyWithOtherAdmin = 4,
    RequiredTCNotAccepted = 5,
    TCAcknowledgementsNotReceived = 6,
    TCMinVersionNotMet = 7,
    ResourceExhausted = 8,
}

impl CommissioningError {
    /// Success alias used by `ArmFailSafe` responses.
    pub const NO_ERROR: Self = Self::Ok;

    pub fn is_ok(&self) -> bool {
        *self == Self::Ok
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for CommissioningError {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Ok,
            1 => Self::ValueOutsideRange,
            2 => Self::InvalidAuthentication,
            3 => Self::NoFailSafe,
            4 => Self::BusyWithOtherAdmin,
            5 => Self::RequiredTCNotAccepted,
            6 => Self::TCAcknowledgementsNotReceived,
            7 => Self::TCMinVersionNotMet,
            8 => Self::ResourceExhausted,
            other => return Err(other),
        })
    }
}

impl std::fmt::Display for CommissioningError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Ok => "Ok",
            Self::ValueOutsideRange => "ValueOutsideRange",
            Self::InvalidAuthentication => "InvalidAuthentication",
            Self::NoFailSafe => "NoFailSafe",
            Self::BusyWithOtherAdmin => "BusyWithOtherAdmin",
            Self::RequiredTCNotAccepted => "RequiredTCNotAccepted",
            Self::TCAcknowledgementsNotReceived => "TCAcknowledgementsNotReceived",
            Self::TCMinVersionNotMet => "TCMinVersionNotMet",
            Self::ResourceExhausted => "ResourceExhausted",
        };
        write!(f, "{} ({})", name, self.as_u8())
    }
}

/// Status code of the Operational Credentials fabric commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OperationalCertStatus {
    Ok = 0,
    TableFull = 5,
    /// The requested fabric index is not in the table.
    InvalidFabricIndex = 11,
}

impl OperationalCertStatus {
    /// Alias matching the fabric-table vocabulary.
    pub const NOT_FOUND: Self = Self::InvalidFabricIndex;

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Interaction-model status used when no cluster-specific response applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ImStatus {
    Success = 0x00,
    Failure = 0x01,
    UnsupportedEndpoint = 0x7F,
    ConstraintError = 0x87,
    FailsafeRequired = 0xCA,
}

/// Key-value store errors.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    IOError { message: String },
    /// Data corruption in the store.
    #[error("KV store corruption: {message}")]
    CorruptionError { message: String },
}

/// Fabric table errors.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FabricError {
    #[error("Fabric index {0} not found")]
    NotFound(FabricIndex),

    #[error("Fabric table full ({capacity} fabrics)")]
    TableFull { capacity: usize },

    #[error("No pending fabric to commit")]
    NoPendingFabric,

    #[error("Fabric {0} is already pending for this attempt")]
    PendingFabricExists(FabricIndex),
}

impl FabricError {
    /// Wire status for a fabric command that failed with this error.
    pub fn status(&self) -> OperationalCertStatus {
        match self {
            Self::NotFound(_) => OperationalCertStatus::InvalidFabricIndex,
            Self::TableFull { .. } => OperationalCertStatus::TableFull,
            Self::NoPendingFabric | Self::PendingFabricExists(_) => {
                OperationalCertStatus::InvalidFabricIndex
            }
        }
    }
}

/// Fail-safe timer errors.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FailSafeError {
    /// The fail-safe is held by a different fabric.
    #[error("Fail-safe is armed for fabric {bound:?}, caller is {caller:?}")]
    BoundToOtherFabric {
        bound: Option<FabricIndex>,
        caller: Option<FabricIndex>,
    },

    #[error("Fail-safe is not armed")]
    NotArmed,

    #[error("A NOC was already added during this fail-safe")]
    NocAlreadyInvoked,
}

/// Internal gate failure. Never a validation outcome.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("Storage error: {0}")]
    Storage(#[from] KVStoreError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Persisted record version {found} does not match expected {expected}")]
    VersionMismatch { found: u8, expected: u8 },

    #[error("Fabric error: {0}")]
    Fabric(#[from] FabricError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl From<bincode::Error> for GateError {
    fn from(err: bincode::Error) -> Self {
        GateError::Serialization(err.to_string())
    }
}

/// Result type for gate operations.
pub type GateResult<T> = Result<T, GateError>;

/// Errors seen by clients of the gate service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service task has stopped.
    #[error("Gate service is not running")]
    Closed,

    #[error(transparent)]
    Gate(#[from] GateError),

    /// The reply did not match the request kind.
    #[error("Unexpected response from gate service")]
    UnexpectedResponse,
}
