//! Ports layer for the commissioning gate.
//!
//! - Inbound (driving) port: the command surface remote commissioners reach
//! - Outbound (driven) ports: persistence and time

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
