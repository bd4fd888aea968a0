//! # IPC Message Payloads
//!
//! Request/response types exchanged with commissioners. Every request carries
//! the authenticated `CallerContext` handed over by the session layer and a
//! correlation id that is echoed in the response.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    BasicCommissioningInfo, CallerContext, CommissioningError, FabricDescriptor, FabricIndex,
    ImStatus, OperationalCertStatus,
};

/// General Commissioning cluster.
pub const GENERAL_COMMISSIONING_CLUSTER: u32 = 0x0030;

/// Operational Credentials cluster.
pub const OPERATIONAL_CREDENTIALS_CLUSTER: u32 = 0x003E;

/// Remote-invokable commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    ArmFailSafe {
        expiry_length_seconds: u16,
        breadcrumb: u64,
    },
    SetTCAcknowledgements {
        tc_version: u16,
        tc_user_response: u16,
    },
    CommissioningComplete,
    AddNoc {
        fabric_id: u64,
        node_id: u64,
        vendor_id: u16,
        label: String,
    },
    RemoveFabric {
        fabric_index: FabricIndex,
    },
}

impl Command {
    pub fn cluster_id(&self) -> u32 {
        match self {
            Self::ArmFailSafe { .. }
            | Self::SetTCAcknowledgements { .. }
            | Self::CommissioningComplete => GENERAL_COMMISSIONING_CLUSTER,
            Self::AddNoc { .. } | Self::RemoveFabric { .. } => OPERATIONAL_CREDENTIALS_CLUSTER,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ArmFailSafe { .. } => "ArmFailSafe",
            Self::SetTCAcknowledgements { .. } => "SetTCAcknowledgements",
            Self::CommissioningComplete => "CommissioningComplete",
            Self::AddNoc { .. } => "AddNOC",
            Self::RemoveFabric { .. } => "RemoveFabric",
        }
    }
}

/// Readable attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeId {
    Breadcrumb,
    BasicCommissioningInfo,
    TCAcceptedVersion,
    TCMinRequiredVersion,
    TCAcknowledgements,
    TCAcknowledgementsRequired,
    Fabrics,
}

/// Attribute value as read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    U16(u16),
    U64(u64),
    Bool(bool),
    BasicCommissioningInfo(BasicCommissioningInfo),
    Fabrics(Vec<FabricDescriptor>),
}

/// Command invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeRequest {
    /// Correlation ID for request tracking.
    pub correlation_id: Uuid,
    pub endpoint: u16,
    pub caller: CallerContext,
    pub command: Command,
}

/// Command-specific response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandResponse {
    ArmFailSafe {
        error_code: CommissioningError,
        debug_text: String,
    },
    SetTCAcknowledgements {
        error_code: CommissioningError,
    },
    CommissioningComplete {
        error_code: CommissioningError,
        debug_text: String,
    },
    /// Response to `AddNoc` and `RemoveFabric`.
    Noc {
        status_code: OperationalCertStatus,
        fabric_index: Option<FabricIndex>,
    },
    /// Interaction-model status when no command response applies.
    Status(ImStatus),
}

impl CommandResponse {
    /// The commissioning error code, for General Commissioning responses.
    pub fn error_code(&self) -> Option<CommissioningError> {
        match self {
            Self::ArmFailSafe { error_code, .. }
            | Self::SetTCAcknowledgements { error_code }
            | Self::CommissioningComplete { error_code, .. } => Some(*error_code),
            Self::Noc { .. } | Self::Status(_) => None,
        }
    }
}

/// Response to an `InvokeRequest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeResponse {
    /// Correlation ID matching the request.
    pub correlation_id: Uuid,
    pub response: CommandResponse,
}

/// Attribute read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadRequest {
    /// Correlation ID for request tracking.
    pub correlation_id: Uuid,
    pub endpoint: u16,
    pub caller: CallerContext,
    pub attribute: AttributeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadResult {
    Value(AttributeValue),
    Status(ImStatus),
}

/// Response to a `ReadRequest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResponse {
    /// Correlation ID matching the request.
    pub correlation_id: Uuid,
    pub result: ReadResult,
}

/// Any inbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
    Invoke(InvokeRequest),
    Read(ReadRequest),
}

/// Any outbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    Invoke(InvokeResponse),
    Read(ReadResponse),
}
