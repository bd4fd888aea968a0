//! Core entities of the commissioning gate.
//!
//! Plain data: identities handed over by the session layer, the Terms &
//! Conditions acceptance record, fabric entries and attribute snapshots.

use serde::{Deserialize, Serialize};

/// Milliseconds on the gate's monotonic clock.
pub type Timestamp = u64;

/// Local index of a fabric on this device.
pub type FabricIndex = u8;

/// Lowest fabric index ever handed out.
pub const MIN_FABRIC_INDEX: FabricIndex = 1;

/// Highest fabric index ever handed out (255 is reserved).
pub const MAX_FABRIC_INDEX: FabricIndex = 254;

/// The only endpoint that serves the commissioning clusters.
pub const ROOT_ENDPOINT: u16 = 0;

/// How the peer that issued a command was authenticated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthMode {
    /// Passcode-authenticated session (commissioning window).
    Pase,
    /// Certificate-authenticated session on an operational fabric.
    Case,
}

/// Authenticated caller identity supplied by the session-establishment layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerContext {
    /// Authentication mode of the session carrying the command.
    pub auth_mode: AuthMode,
    /// Accessing fabric, `None` for a PASE session with no fabric yet.
    pub fabric_index: Option<FabricIndex>,
    /// Peer node id (0 when unknown).
    pub node_id: u64,
}

impl CallerContext {
    /// A PASE caller that has no fabric association yet.
    pub fn pase() -> Self {
        Self {
            auth_mode: AuthMode::Pase,
            fabric_index: None,
            node_id: 0,
        }
    }

    /// A CASE caller on an operational fabric.
    pub fn case(fabric_index: FabricIndex, node_id: u64) -> Self {
        Self {
            auth_mode: AuthMode::Case,
            fabric_index: Some(fabric_index),
            node_id,
        }
    }

    pub fn is_case(&self) -> bool {
        self.auth_mode == AuthMode::Case
    }
}

/// A recorded Terms & Conditions acceptance.
///
/// Version and bitmask only ever change together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermsAcceptance {
    /// Accepted TC version.
    pub version: u16,
    /// Bitmask of accepted clauses.
    pub acknowledgements: u16,
}

impl TermsAcceptance {
    pub fn new(version: u16, acknowledgements: u16) -> Self {
        Self {
            version,
            acknowledgements,
        }
    }

    /// True when every bit of `required` is present in this acceptance.
    pub fn covers(&self, required: u16) -> bool {
        self.acknowledgements & required == required
    }
}

/// Point-in-time copy of the four TC attributes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcAttributes {
    pub accepted_version: u16,
    pub acknowledgements: u16,
    pub min_required_version: u16,
    pub acknowledgements_required: bool,
}

/// Fail-safe parameters advertised to commissioners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicCommissioningInfo {
    pub fail_safe_expiry_length_seconds: u16,
    pub max_cumulative_failsafe_seconds: u16,
}

/// Lifecycle phase of the gate for the current (or last) attempt.
///
/// ```text
/// Idle ──arm──→ Armed ──complete──→ Completing ──→ Committed
///                 │                      │
///                 └──disarm/expiry──→ Idle   └──commit failure──→ Aborted
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatePhase {
    Idle,
    Armed,
    Completing,
    Committed,
    Aborted,
}

impl GatePhase {
    /// Phases from which a new attempt may start.
    pub fn is_at_rest(&self) -> bool {
        matches!(self, Self::Idle | Self::Committed | Self::Aborted)
    }
}

/// Credentials offered by a commissioner when provisioning a fabric.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFabric {
    pub fabric_id: u64,
    pub node_id: u64,
    pub vendor_id: u16,
    pub label: String,
}

/// A fabric the device belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FabricEntry {
    pub fabric_index: FabricIndex,
    pub fabric_id: u64,
    pub node_id: u64,
    pub vendor_id: u16,
    pub label: String,
}

impl FabricEntry {
    pub fn from_new(fabric_index: FabricIndex, fabric: NewFabric) -> Self {
        Self {
            fabric_index,
            fabric_id: fabric.fabric_id,
            node_id: fabric.node_id,
            vendor_id: fabric.vendor_id,
            label: fabric.label,
        }
    }

    /// List view of this entry relative to the reading caller.
    pub fn describe(&self, caller: &CallerContext) -> FabricDescriptor {
        FabricDescriptor {
            fabric_index: self.fabric_index,
            fabric_id: self.fabric_id,
            node_id: self.node_id,
            vendor_id: self.vendor_id,
            label: self.label.clone(),
            is_caller_fabric: caller.fabric_index == Some(self.fabric_index),
        }
    }
}

/// Entry of the `Fabrics` attribute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FabricDescriptor {
    pub fabric_index: FabricIndex,
    pub fabric_id: u64,
    pub node_id: u64,
    pub vendor_id: u16,
    pub label: String,
    pub is_caller_fabric: bool,
}
