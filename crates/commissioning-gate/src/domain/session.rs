//! Per-attempt commissioning session.
//!
//! A session exists from the first `ArmFailSafe` of an attempt until the
//! attempt completes, aborts, is disarmed or expires. It carries the
//! attempt's test overrides and the fabric being provisioned.

use serde::{Deserialize, Serialize};

use super::entities::FabricIndex;

/// Overrides a test commissioner may inject into new sessions.
///
/// `tc_required` can only add enforcement: `Some(true)` forces the TC check
/// on a device that does not require it; `Some(false)` cannot disable the
/// device-level requirement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissioningTestConfig {
    pub tc_required: Option<bool>,
    /// Signals the commissioner to stop before `CommissioningComplete`.
    pub skip_commissioning_complete: bool,
}

/// State of one commissioning attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommissioningSession {
    tc_required: bool,
    skip_commissioning_complete: bool,
    provisioning_fabric: Option<FabricIndex>,
}

impl CommissioningSession {
    pub fn new(test_config: CommissioningTestConfig) -> Self {
        Self {
            tc_required: test_config.tc_required.unwrap_or(false),
            skip_commissioning_complete: test_config.skip_commissioning_complete,
            provisioning_fabric: None,
        }
    }

    /// Whether the session itself demands TC enforcement.
    pub fn tc_required(&self) -> bool {
        self.tc_required
    }

    pub fn skip_commissioning_complete(&self) -> bool {
        self.skip_commissioning_complete
    }

    pub fn provisioning_fabric(&self) -> Option<FabricIndex> {
        self.provisioning_fabric
    }

    pub fn bind_fabric(&mut self, fabric_index: FabricIndex) {
        self.provisioning_fabric = Some(fabric_index);
    }

    /// Effective TC requirement given the device flag.
    pub fn effective_tc_required(&self, device_required: bool) -> bool {
        device_required || self.tc_required
    }
}

impl Default for CommissioningSession {
    fn default() -> Self {
        Self::new(CommissioningTestConfig::default())
    }
}
