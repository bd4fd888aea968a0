//! # Commissioning Gate
//!
//! **Clusters:** General Commissioning (0x0030), Operational Credentials (0x003E)
//! **Endpoint:** 0 (root) only
//!
//! ## Purpose
//!
//! Device-side gate that refuses to let a commissioning attempt complete until
//! the user has accepted the device's Terms & Conditions. Coordinates that
//! check with the fail-safe timer bounding each attempt and with the fabric
//! lifecycle (pending fabric commit, revert and removal).
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | TC version and bitmask change together | `domain/terms.rs` - `TermsStore::write()` persist-then-swap |
//! | Fail-safe `armed == expiry.is_some()` | `domain/failsafe.rs` - `FailSafeTimer::state()` |
//! | Expiry and disarm never touch TC | `domain/gate.rs` - `release_attempt()` |
//! | No completion without accepted TC | `domain/gate.rs` - `commissioning_complete()` |
//! | Session override cannot relax device TC requirement | `domain/session.rs` - `effective_tc_required()` |
//! | Fabric indices never reused within a boot | `domain/fabric.rs` - `allocate_index()` |
//! | Commands and expiry are strictly serialized | `service.rs` - single `select!` loop |
//!
//! ## Attempt Lifecycle
//!
//! ```text
//! [Idle] ──ArmFailSafe(n)──→ [Armed] ──CommissioningComplete──→ [Completing] ──→ [Committed]
//!    ↑                          │                                    │
//!    └── ArmFailSafe(0)/expiry ─┘                                    └──→ [Aborted]
//! ```
//!
//! | Command | Phase | Outcome |
//! |---------|-------|---------|
//! | `ArmFailSafe` | any | `Ok`, `BusyWithOtherAdmin`, `ResourceExhausted` |
//! | `SetTCAcknowledgements` | any | `Ok`, `TCMinVersionNotMet`, `RequiredTCNotAccepted` |
//! | `CommissioningComplete` | Armed | `Ok`, `NoFailSafe`, `InvalidAuthentication`, `TCAcknowledgementsNotReceived` |
//! | `AddNOC` | Armed | `Ok`, `TableFull`, IM `FailsafeRequired` / `ConstraintError` |
//! | `RemoveFabric` | any | `Ok`, `InvalidFabricIndex` |
//!
//! ## Persistence
//!
//! | Key | Contents |
//! |-----|----------|
//! | `g/tc` | Versioned TC acceptance record |
//! | `g/fabrics` | Committed fabric list |
//! | `g/fs` | Attempt-in-progress marker, cleared on boot |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      OUTER LAYER                                │
//! │  service.rs - GateService actor, GateHandle client              │
//! │  ipc/       - Wire payloads, CommandDispatcher                  │
//! │  adapters/  - InMemoryKVStore, FileBackedKVStore                │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MIDDLE LAYER                               │
//! │  ports/inbound.rs  - CommissioningApi trait                     │
//! │  ports/outbound.rs - KeyValueStore, TimeSource traits           │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      INNER LAYER                                │
//! │  domain/gate.rs     - CommissioningGate state machine           │
//! │  domain/failsafe.rs - FailSafeTimer                             │
//! │  domain/terms.rs    - TermsStore                                │
//! │  domain/fabric.rs   - FabricTable                               │
//! │  domain/session.rs  - CommissioningSession, test overrides      │
//! │  domain/errors.rs   - CommissioningError, GateError             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Test Hooks
//!
//! `CommissioningTestConfig`, `MockTimeSource` and `FailingKVStore` are only
//! compiled with `cfg(test)` or the `test-hooks` feature.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ipc;
pub mod ports;
pub mod service;

pub use adapters::*;
pub use config::*;
pub use domain::*;
pub use ipc::*;
pub use ports::*;
pub use service::{GateHandle, GateService, GateSnapshot};
