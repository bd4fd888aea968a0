//! # Commissioning Gate
//!
//! The state machine that decides whether a commissioning attempt may
//! complete. It owns the fail-safe timer, the TC store, the fabric table and
//! the per-attempt session, and is the only writer of any of them.
//!
//! ```text
//!            ArmFailSafe(n>0)           CommissioningComplete
//!   [Idle] ──────────────────→ [Armed] ──────────────────────→ [Completing]
//!     ↑                          │  ↑                               │
//!     │  ArmFailSafe(0)/expiry   │  └─ TC not met (stays Armed)     ├─ commit ok ──→ [Committed]
//!     └──────────────────────────┘                                  └─ commit err ─→ [Aborted]
//! ```
//!
//! `Committed` and `Aborted` behave like `Idle` for the next `ArmFailSafe`.
//!
//! ## Ordering
//!
//! Every command first applies any fail-safe expiry that is due, so a
//! command and an expiry are always observed in clock order. TC acceptance is
//! never touched by expiry or disarm.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::GateConfig;
use crate::ports::{BatchOperation, KeyValueStore, TimeSource};

use super::entities::{
    BasicCommissioningInfo, CallerContext, FabricDescriptor, FabricIndex, GatePhase, NewFabric,
    TcAttributes, TermsAcceptance, Timestamp,
};
use super::errors::{
    CommissioningError, FabricError, GateError, GateResult, OperationalCertStatus,
};
use super::fabric::{FabricTable, FABRICS_KEY};
use super::failsafe::{ArmOutcome, FailSafeState, FailSafeTimer};
use super::session::{CommissioningSession, CommissioningTestConfig};
use super::terms::{TermsStore, TC_KEY};

/// Storage key of the in-progress attempt marker.
pub const FAIL_SAFE_MARKER_KEY: &[u8] = b"g/fs";

/// Outcome of an `AddNoc` command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddNocOutcome {
    Added { fabric_index: FabricIndex },
    TableFull,
    /// No fail-safe armed for the caller's fabric.
    FailsafeRequired,
    /// A NOC was already added during this fail-safe.
    ConstraintError,
}

/// The commissioning gate.
pub struct CommissioningGate<S, T> {
    config: GateConfig,
    store: S,
    clock: T,
    fail_safe: FailSafeTimer,
    terms: TermsStore,
    fabrics: FabricTable,
    session: Option<CommissioningSession>,
    phase: GatePhase,
    breadcrumb: u64,
    /// Overrides applied to the next session.
    test_config: CommissioningTestConfig,
}

impl<S: KeyValueStore, T: TimeSource> CommissioningGate<S, T> {
    /// Start the gate from whatever `store` holds.
    ///
    /// A TC record with an unknown layout is logged and ignored. A leftover
    /// fail-safe marker means the previous boot died mid-attempt; it is
    /// cleared (pending fabrics are never persisted).
    pub fn boot(config: GateConfig, mut store: S, clock: T) -> GateResult<Self> {
        config.validate()?;

        let terms = match TermsStore::load(config.terms.clone(), &store) {
            Ok(terms) => terms,
            Err(GateError::VersionMismatch { found, expected }) => {
                warn!(
                    found,
                    expected, "[gate] Unknown TC record version, starting without acceptance"
                );
                TermsStore::new(config.terms.clone())
            }
            Err(err) => return Err(err),
        };
        let fabrics = FabricTable::load(config.max_fabrics, &store)?;

        if let Some(bytes) = store.get(FAIL_SAFE_MARKER_KEY)? {
            let armed_at: Option<Timestamp> = bincode::deserialize(&bytes).ok();
            warn!(
                ?armed_at,
                "[gate] Fail-safe was armed at shutdown, discarding interrupted attempt"
            );
            store.delete(FAIL_SAFE_MARKER_KEY)?;
        }

        info!(
            accepted_version = terms.accepted_version(),
            fabrics = fabrics.len(),
            tc_required = terms.acknowledgements_required(),
            "[gate] Commissioning gate started"
        );

        Ok(Self {
            fail_safe: FailSafeTimer::new(&config.fail_safe),
            config,
            store,
            clock,
            terms,
            fabrics,
            session: None,
            phase: GatePhase::Idle,
            breadcrumb: 0,
            test_config: CommissioningTestConfig::default(),
        })
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// `ArmFailSafe`: arm, re-arm or (with 0) disarm.
    pub fn arm_fail_safe(
        &mut self,
        caller: &CallerContext,
        expiry_seconds: u16,
        breadcrumb: u64,
    ) -> CommissioningError {
        let now = self.clock.now();
        self.expire_if_due(now);

        // The marker goes down before a new attempt is armed.
        if expiry_seconds > 0 && !self.fail_safe.is_armed() {
            if let Err(err) = self.write_marker(now) {
                error!(%err, "[gate] Cannot record fail-safe marker");
                return CommissioningError::ResourceExhausted;
            }
        }

        match self.fail_safe.arm(now, expiry_seconds, caller.fabric_index) {
            Err(err) => {
                debug!(%err, "[gate] ArmFailSafe rejected");
                CommissioningError::BusyWithOtherAdmin
            }
            Ok(ArmOutcome::Disarmed { was_armed }) => {
                if was_armed {
                    self.release_attempt();
                    info!("[gate] Fail-safe disarmed, attempt torn down");
                }
                CommissioningError::Ok
            }
            Ok(ArmOutcome::Armed { expiry }) => {
                self.session = Some(CommissioningSession::new(self.test_config));
                self.phase = GatePhase::Armed;
                self.breadcrumb = breadcrumb;
                info!(
                    expiry,
                    fabric = ?caller.fabric_index,
                    "[gate] Fail-safe armed, attempt started"
                );
                CommissioningError::Ok
            }
            Ok(ArmOutcome::Rearmed { expiry }) => {
                self.breadcrumb = breadcrumb;
                debug!(expiry, "[gate] Fail-safe re-armed");
                CommissioningError::Ok
            }
        }
    }

    /// `SetTCAcknowledgements`: record a TC acceptance. Allowed in any phase.
    pub fn set_tc_acknowledgements(
        &mut self,
        version: u16,
        acknowledgements: u16,
    ) -> GateResult<CommissioningError> {
        self.expire_if_due(self.clock.now());

        if self.terms.acknowledgements_required() {
            if version < self.terms.min_required_version() {
                debug!(
                    version,
                    minimum = self.terms.min_required_version(),
                    "[gate] TC version below minimum"
                );
                return Ok(CommissioningError::TCMinVersionNotMet);
            }
            if acknowledgements == 0 {
                debug!(version, "[gate] No TC clauses accepted");
                return Ok(CommissioningError::RequiredTCNotAccepted);
            }
        }

        let acceptance = TermsAcceptance::new(version, acknowledgements);
        if let Err(err) = self.terms.write(&mut self.store, acceptance) {
            error!(%err, "[gate] Failed to persist TC acceptance");
            return Err(err);
        }
        Ok(CommissioningError::Ok)
    }

    /// `CommissioningComplete`: finish the attempt if TC and identity allow.
    pub fn commissioning_complete(
        &mut self,
        caller: &CallerContext,
    ) -> GateResult<CommissioningError> {
        self.expire_if_due(self.clock.now());

        if !self.fail_safe.is_armed() {
            debug!("[gate] CommissioningComplete without fail-safe");
            return Ok(CommissioningError::NoFailSafe);
        }
        if !caller.is_case() || !self.fail_safe.matches_fabric(caller.fabric_index) {
            debug!(
                auth_mode = ?caller.auth_mode,
                caller_fabric = ?caller.fabric_index,
                fail_safe_fabric = ?self.fail_safe.fabric_index(),
                "[gate] CommissioningComplete from wrong session"
            );
            return Ok(CommissioningError::InvalidAuthentication);
        }

        if self.tc_enforced() {
            let check = self.terms.requirements_met();
            if !check.is_met() {
                debug!(?check, "[gate] TC requirements not met, attempt stays armed");
                return Ok(CommissioningError::TCAcknowledgementsNotReceived);
            }
        }

        self.phase = GatePhase::Completing;
        if self.fabrics.pending().is_some() {
            if let Err(err) = self.fabrics.commit_pending(&mut self.store) {
                error!(%err, "[gate] Fabric commit failed, aborting attempt");
                self.release_attempt();
                self.phase = GatePhase::Aborted;
                return Err(err);
            }
        }

        self.fail_safe.disarm();
        self.session = None;
        self.breadcrumb = 0;
        self.clear_marker();
        self.phase = GatePhase::Committed;
        info!(fabric = ?caller.fabric_index, "[gate] Commissioning complete");
        Ok(CommissioningError::Ok)
    }

    /// `AddNOC`: provision a pending fabric for the current attempt.
    pub fn add_noc(&mut self, caller: &CallerContext, fabric: NewFabric) -> AddNocOutcome {
        self.expire_if_due(self.clock.now());

        if !self.fail_safe.is_armed() || !self.fail_safe.matches_fabric(caller.fabric_index) {
            debug!("[gate] AddNOC without matching fail-safe");
            return AddNocOutcome::FailsafeRequired;
        }
        if self.fail_safe.noc_invoked() {
            debug!("[gate] AddNOC already invoked in this attempt");
            return AddNocOutcome::ConstraintError;
        }

        let fabric_index = match self.fabrics.add_pending(fabric) {
            Ok(fabric_index) => fabric_index,
            Err(FabricError::TableFull { capacity }) => {
                debug!(capacity, "[gate] Fabric table full");
                return AddNocOutcome::TableFull;
            }
            Err(err) => {
                debug!(%err, "[gate] AddNOC rejected");
                return AddNocOutcome::ConstraintError;
            }
        };
        if let Err(err) = self.fail_safe.record_noc(fabric_index) {
            debug!(%err, "[gate] AddNOC rejected");
            self.fabrics.revert_pending();
            return AddNocOutcome::ConstraintError;
        }
        if let Some(session) = self.session.as_mut() {
            session.bind_fabric(fabric_index);
        }
        info!(fabric_index, "[gate] NOC added, fabric pending until commit");
        AddNocOutcome::Added { fabric_index }
    }

    /// `RemoveFabric`: drop a committed fabric. Allowed in any phase.
    pub fn remove_fabric(&mut self, fabric_index: FabricIndex) -> GateResult<OperationalCertStatus> {
        self.expire_if_due(self.clock.now());

        match self.fabrics.remove(&mut self.store, fabric_index) {
            Ok(_) => Ok(OperationalCertStatus::Ok),
            Err(GateError::Fabric(err @ FabricError::NotFound(_))) => {
                debug!(%err, "[gate] RemoveFabric rejected");
                Ok(err.status())
            }
            Err(err) => {
                error!(%err, fabric_index, "[gate] Failed to persist fabric removal");
                Err(err)
            }
        }
    }

    /// Wipe TC acceptance, fabrics and any attempt in progress.
    pub fn factory_reset(&mut self) -> GateResult<()> {
        self.store.atomic_batch_write(vec![
            BatchOperation::delete(TC_KEY),
            BatchOperation::delete(FABRICS_KEY),
            BatchOperation::delete(FAIL_SAFE_MARKER_KEY),
        ])?;
        self.release_attempt();
        self.terms.forget();
        self.fabrics.forget_all();
        warn!("[gate] Factory reset");
        Ok(())
    }

    /// Tear down the attempt if its fail-safe deadline has passed.
    ///
    /// Returns true when an expiry was applied.
    pub fn expire_if_due(&mut self, now: Timestamp) -> bool {
        if !self.fail_safe.is_expired(now) {
            return false;
        }
        warn!(
            now,
            deadline = ?self.fail_safe.deadline(),
            "[gate] Fail-safe expired, reverting attempt"
        );
        self.release_attempt();
        true
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn tc_attributes(&self) -> TcAttributes {
        self.terms.attributes()
    }

    pub fn terms(&self) -> &TermsStore {
        &self.terms
    }

    pub fn fabrics(&self, caller: &CallerContext) -> Vec<FabricDescriptor> {
        self.fabrics.list(caller)
    }

    pub fn fabric_table(&self) -> &FabricTable {
        &self.fabrics
    }

    pub fn breadcrumb(&self) -> u64 {
        self.breadcrumb
    }

    pub fn basic_commissioning_info(&self) -> BasicCommissioningInfo {
        self.config.basic_commissioning_info()
    }

    pub fn fail_safe_state(&self) -> FailSafeState {
        self.fail_safe.state()
    }

    pub fn fail_safe_deadline(&self) -> Option<Timestamp> {
        self.fail_safe.deadline()
    }

    pub fn phase(&self) -> GatePhase {
        self.phase
    }

    pub fn session(&self) -> Option<&CommissioningSession> {
        self.session.as_ref()
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn clock(&self) -> &T {
        &self.clock
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give the store back, e.g. to boot a new gate over it.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Set the overrides injected into the next session.
    #[cfg(any(test, feature = "test-hooks"))]
    pub fn set_test_config(&mut self, test_config: CommissioningTestConfig) {
        self.test_config = test_config;
    }

    #[cfg(any(test, feature = "test-hooks"))]
    pub fn test_config(&self) -> CommissioningTestConfig {
        self.test_config
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn tc_enforced(&self) -> bool {
        let device_required = self.terms.acknowledgements_required();
        match &self.session {
            Some(session) => session.effective_tc_required(device_required),
            None => device_required,
        }
    }

    /// Disarm and revert everything scoped to the attempt. TC is untouched.
    fn release_attempt(&mut self) {
        self.fail_safe.disarm();
        self.fabrics.revert_pending();
        self.session = None;
        self.breadcrumb = 0;
        self.clear_marker();
        self.phase = GatePhase::Idle;
    }

    fn write_marker(&mut self, now: Timestamp) -> GateResult<()> {
        let bytes = bincode::serialize(&now)?;
        self.store.put(FAIL_SAFE_MARKER_KEY, &bytes)?;
        Ok(())
    }

    fn clear_marker(&mut self) {
        if let Err(err) = self.store.delete(FAIL_SAFE_MARKER_KEY) {
            error!(%err, "[gate] Failed to clear fail-safe marker");
        }
    }
}

impl<S, T> std::fmt::Debug for CommissioningGate<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommissioningGate")
            .field("phase", &self.phase)
            .field("fail_safe", &self.fail_safe)
            .field("terms", &self.terms)
            .field("fabrics", &self.fabrics)
            .field("breadcrumb", &self.breadcrumb)
            .finish_non_exhaustive()
    }
}
