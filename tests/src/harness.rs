//! # Test Commissioner
//!
//! Plays the commissioner side of an attempt against a running
//! `GateService`:
//!
//! ```text
//! ArmFailSafe (PASE) → [SetTCAcknowledgements] → AddNOC (PASE) → [CommissioningComplete (CASE)]
//! ```
//!
//! The bracketed steps are controlled by the commissioner's test config,
//! which is also pushed to the gate so the next session carries the same
//! overrides. The device still enforces its own TC requirement: skipping the
//! TC step here only changes what the commissioner sends.

use anyhow::{bail, Result};
use commissioning_gate::{
    CallerContext, Command, CommandResponse, CommissioningApi, CommissioningError,
    CommissioningTestConfig, FabricIndex, GateHandle, OperationalCertStatus,
};
use tracing::debug;

/// Expiry used for every attempt the harness starts.
pub const ATTEMPT_EXPIRY_SECS: u16 = 60;

/// What happened during one `commission()` run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommissioningReport {
    /// Index the device allocated for the new fabric.
    pub fabric_index: FabricIndex,
    /// Result of `SetTCAcknowledgements`, when it was sent.
    pub tc_result: Option<CommissioningError>,
    /// Result of `CommissioningComplete`, when it was sent.
    pub complete_result: Option<CommissioningError>,
}

impl CommissioningReport {
    /// The CASE identity of the commissioned node.
    pub fn case_caller(&self) -> CallerContext {
        CallerContext::case(self.fabric_index, node_id_for(self.fabric_index))
    }
}

/// Drives commissioning attempts through a `GateHandle`.
#[derive(Debug)]
pub struct TestCommissioner {
    handle: GateHandle,
    config: CommissioningTestConfig,
    tc_version: u16,
    tc_acknowledgements: u16,
    next_fabric_id: u64,
}

impl TestCommissioner {
    pub fn new(handle: GateHandle) -> Self {
        Self {
            handle,
            config: CommissioningTestConfig::default(),
            tc_version: 1,
            tc_acknowledgements: 0xFFFF,
            next_fabric_id: 1,
        }
    }

    /// Set the TC response the commissioner sends on the user's behalf.
    pub fn with_tc_response(mut self, version: u16, acknowledgements: u16) -> Self {
        self.tc_version = version;
        self.tc_acknowledgements = acknowledgements;
        self
    }

    pub fn handle(&self) -> &GateHandle {
        &self.handle
    }

    pub fn config(&self) -> CommissioningTestConfig {
        self.config
    }

    /// Restore the default test config on both sides.
    pub async fn reset(&mut self) -> Result<()> {
        self.config = CommissioningTestConfig::default();
        self.push_config().await
    }

    pub async fn set_tc_required(&mut self, required: bool) -> Result<()> {
        self.config.tc_required = Some(required);
        self.push_config().await
    }

    pub async fn set_skip_commissioning_complete(&mut self, skip: bool) -> Result<()> {
        self.config.skip_commissioning_complete = skip;
        self.push_config().await
    }

    /// Run one attempt. Returns an error only when a step the flow depends
    /// on (arming or AddNOC) fails.
    pub async fn commission(&mut self) -> Result<CommissioningReport> {
        let pase = CallerContext::pase();

        let armed = self.arm(&pase, ATTEMPT_EXPIRY_SECS).await?;
        if armed != CommissioningError::Ok {
            bail!("ArmFailSafe returned {armed:?}");
        }

        let tc_result = if self.config.tc_required.unwrap_or(true) {
            Some(
                self.set_tc_acknowledgements(self.tc_version, self.tc_acknowledgements)
                    .await?,
            )
        } else {
            None
        };

        let fabric_index = self.add_noc(&pase).await?;
        let report = CommissioningReport {
            fabric_index,
            tc_result,
            complete_result: None,
        };

        if self.config.skip_commissioning_complete {
            debug!(fabric_index, "[harness] Skipping CommissioningComplete");
            return Ok(report);
        }
        let complete_result = self.complete(&report.case_caller()).await?;
        Ok(CommissioningReport {
            complete_result: Some(complete_result),
            ..report
        })
    }

    pub async fn arm(&self, caller: &CallerContext, seconds: u16) -> Result<CommissioningError> {
        let response = self
            .handle
            .invoke(
                *caller,
                Command::ArmFailSafe {
                    expiry_length_seconds: seconds,
                    breadcrumb: 1,
                },
            )
            .await?;
        error_code(response)
    }

    pub async fn set_tc_acknowledgements(
        &self,
        version: u16,
        acknowledgements: u16,
    ) -> Result<CommissioningError> {
        let response = self
            .handle
            .invoke(
                CallerContext::pase(),
                Command::SetTCAcknowledgements {
                    tc_version: version,
                    tc_user_response: acknowledgements,
                },
            )
            .await?;
        error_code(response)
    }

    pub async fn complete(&self, caller: &CallerContext) -> Result<CommissioningError> {
        let response = self
            .handle
            .invoke(*caller, Command::CommissioningComplete)
            .await?;
        error_code(response)
    }

    pub async fn remove_fabric(
        &self,
        caller: &CallerContext,
        fabric_index: FabricIndex,
    ) -> Result<OperationalCertStatus> {
        match self
            .handle
            .invoke(*caller, Command::RemoveFabric { fabric_index })
            .await?
        {
            CommandResponse::Noc { status_code, .. } => Ok(status_code),
            other => bail!("unexpected RemoveFabric response: {other:?}"),
        }
    }

    async fn add_noc(&mut self, caller: &CallerContext) -> Result<FabricIndex> {
        let fabric_id = self.next_fabric_id;
        self.next_fabric_id += 1;
        let response = self
            .handle
            .invoke(
                *caller,
                Command::AddNoc {
                    fabric_id,
                    node_id: 0,
                    vendor_id: 0xFFF1,
                    label: format!("harness-{fabric_id}"),
                },
            )
            .await?;
        match response {
            CommandResponse::Noc {
                status_code: OperationalCertStatus::Ok,
                fabric_index: Some(fabric_index),
            } => Ok(fabric_index),
            other => bail!("AddNOC failed: {other:?}"),
        }
    }

    async fn push_config(&self) -> Result<()> {
        self.handle.set_test_config(self.config).await?;
        Ok(())
    }
}

fn node_id_for(fabric_index: FabricIndex) -> u64 {
    0x1000 + u64::from(fabric_index)
}

fn error_code(response: CommandResponse) -> Result<CommissioningError> {
    match response.error_code() {
        Some(code) => Ok(code),
        None => bail!("response carries no commissioning error code: {response:?}"),
    }
}
