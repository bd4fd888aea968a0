//! # Inbound Ports
//!
//! API trait defining what a commissioner-facing front end can ask of the
//! gate. Implemented by `GateHandle`.

use async_trait::async_trait;

use crate::domain::{CallerContext, ServiceError, TcAttributes};
use crate::ipc::{AttributeId, Command, CommandResponse, ReadResult, Request, Response};

/// Commissioning gate API - inbound port.
#[async_trait]
pub trait CommissioningApi: Send + Sync {
    /// Invoke a command on the root endpoint.
    async fn invoke(
        &self,
        caller: CallerContext,
        command: Command,
    ) -> Result<CommandResponse, ServiceError>;

    /// Read an attribute on the root endpoint.
    async fn read(
        &self,
        caller: CallerContext,
        attribute: AttributeId,
    ) -> Result<ReadResult, ServiceError>;

    /// Pass a fully formed request through unchanged.
    async fn request(&self, request: Request) -> Result<Response, ServiceError>;

    /// Wipe TC acceptance and all fabrics.
    async fn factory_reset(&self) -> Result<(), ServiceError>;

    /// Latest TC attributes, without queueing behind commands.
    fn tc_attributes(&self) -> TcAttributes;
}
