//! # Fail-Safe Timer
//!
//! Single logical timer bounding one commissioning attempt.
//!
//! ```text
//! [IDLE] ──arm(n>0)──→ [ARMED{expiry}] ──arm(n>0)──→ [ARMED{expiry'}]   (re-arm)
//!                           │
//!                           ├── arm(0) / disarm() ──→ [IDLE]
//!                           └── now >= expiry     ──→ [IDLE]   (one-shot)
//! ```
//!
//! The timer only tracks time. Reverting provisioning state on expiry is the
//! gate's job; the timer never touches TC attributes.
//!
//! Every re-arm is clamped to `started_at + max_cumulative_seconds`, so an
//! attempt cannot be kept open indefinitely.

use crate::config::FailSafeConfig;

use super::entities::{FabricIndex, Timestamp};
use super::errors::FailSafeError;

/// Observable fail-safe state. `armed == expiry.is_some()` always holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FailSafeState {
    pub armed: bool,
    pub expiry: Option<Timestamp>,
}

/// Context of an armed fail-safe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ArmedContext {
    /// Fabric the fail-safe is bound to (`None` until a NOC is added over PASE).
    fabric_index: Option<FabricIndex>,
    /// When the attempt began; anchors the cumulative cap.
    started_at: Timestamp,
    expiry: Timestamp,
    noc_invoked: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TimerState {
    Idle,
    Armed(ArmedContext),
}

/// What an `arm` call did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArmOutcome {
    /// A fresh attempt started.
    Armed { expiry: Timestamp },
    /// The running attempt got a new expiry.
    Rearmed { expiry: Timestamp },
    /// `arm(0)`; `was_armed` is false for the idempotent no-op.
    Disarmed { was_armed: bool },
}

/// The fail-safe timer.
#[derive(Debug)]
pub struct FailSafeTimer {
    state: TimerState,
    max_cumulative_ms: u64,
}

impl FailSafeTimer {
    pub fn new(config: &FailSafeConfig) -> Self {
        Self {
            state: TimerState::Idle,
            max_cumulative_ms: u64::from(config.max_cumulative_seconds) * 1000,
        }
    }

    /// Arm, re-arm or (with `expiry_seconds == 0`) disarm.
    ///
    /// Re-arming and disarming require the caller's fabric to match the
    /// fabric the fail-safe is bound to.
    pub fn arm(
        &mut self,
        now: Timestamp,
        expiry_seconds: u16,
        fabric: Option<FabricIndex>,
    ) -> Result<ArmOutcome, FailSafeError> {
        if !self.matches_fabric(fabric) {
            return Err(FailSafeError::BoundToOtherFabric {
                bound: self.fabric_index(),
                caller: fabric,
            });
        }

        if expiry_seconds == 0 {
            let was_armed = self.disarm();
            return Ok(ArmOutcome::Disarmed { was_armed });
        }

        let requested = now.saturating_add(u64::from(expiry_seconds) * 1000);
        let outcome = match &mut self.state {
            TimerState::Idle => {
                let expiry = requested.min(now.saturating_add(self.max_cumulative_ms));
                self.state = TimerState::Armed(ArmedContext {
                    fabric_index: fabric,
                    started_at: now,
                    expiry,
                    noc_invoked: false,
                });
                ArmOutcome::Armed { expiry }
            }
            TimerState::Armed(ctx) => {
                let cap = ctx.started_at.saturating_add(self.max_cumulative_ms);
                ctx.expiry = requested.min(cap);
                ArmOutcome::Rearmed { expiry: ctx.expiry }
            }
        };
        self.debug_check();
        Ok(outcome)
    }

    /// Disarm unconditionally. Returns whether it was armed.
    pub fn disarm(&mut self) -> bool {
        let was_armed = self.is_armed();
        self.state = TimerState::Idle;
        was_armed
    }

    /// Bind the fail-safe to the fabric created by an AddNOC.
    pub fn record_noc(&mut self, fabric_index: FabricIndex) -> Result<(), FailSafeError> {
        match &mut self.state {
            TimerState::Idle => Err(FailSafeError::NotArmed),
            TimerState::Armed(ctx) if ctx.noc_invoked => Err(FailSafeError::NocAlreadyInvoked),
            TimerState::Armed(ctx) => {
                ctx.noc_invoked = true;
                ctx.fabric_index = Some(fabric_index);
                Ok(())
            }
        }
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, TimerState::Armed(_))
    }

    /// Armed and past its deadline.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        match self.state {
            TimerState::Idle => false,
            TimerState::Armed(ctx) => now >= ctx.expiry,
        }
    }

    pub fn deadline(&self) -> Option<Timestamp> {
        match self.state {
            TimerState::Idle => None,
            TimerState::Armed(ctx) => Some(ctx.expiry),
        }
    }

    pub fn fabric_index(&self) -> Option<FabricIndex> {
        match self.state {
            TimerState::Idle => None,
            TimerState::Armed(ctx) => ctx.fabric_index,
        }
    }

    pub fn noc_invoked(&self) -> bool {
        matches!(self.state, TimerState::Armed(ctx) if ctx.noc_invoked)
    }

    /// An idle fail-safe matches everyone.
    pub fn matches_fabric(&self, fabric: Option<FabricIndex>) -> bool {
        match self.state {
            TimerState::Idle => true,
            TimerState::Armed(ctx) => ctx.fabric_index == fabric,
        }
    }

    pub fn state(&self) -> FailSafeState {
        let state = FailSafeState {
            armed: self.is_armed(),
            expiry: self.deadline(),
        };
        debug_assert_eq!(state.armed, state.expiry.is_some());
        state
    }

    fn debug_check(&self) {
        if let TimerState::Armed(ctx) = self.state {
            debug_assert!(ctx.expiry <= ctx.started_at.saturating_add(self.max_cumulative_ms));
        }
    }
}
