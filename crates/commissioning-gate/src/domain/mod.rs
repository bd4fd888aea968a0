//! # Domain Layer - Commissioning Gate
//!
//! Pure state-machine logic. Storage and time come in through the outbound
//! ports; nothing here spawns tasks or performs I/O of its own.
//!
//! ## Components
//!
//! - `entities`: Caller identity, TC acceptance, fabric entries, phases
//! - `failsafe`: FailSafeTimer with cumulative cap
//! - `terms`: TermsStore (TC attributes, versioned persistence)
//! - `fabric`: FabricTable with pending-fabric commit/revert
//! - `session`: CommissioningSession and the test-only overrides
//! - `gate`: CommissioningGate, the command state machine
//! - `errors`: Wire outcomes and internal failures

pub mod entities;
pub mod errors;
pub mod fabric;
pub mod failsafe;
pub mod gate;
pub mod session;
pub mod terms;

pub use entities::*;
pub use errors::*;
pub use fabric::*;
pub use failsafe::*;
pub use gate::*;
pub use session::*;
pub use terms::*;
