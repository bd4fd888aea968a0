//! # IPC Module
//!
//! Wire payloads and the dispatcher that maps them onto the gate.

pub mod dispatcher;
pub mod payloads;

pub use dispatcher::CommandDispatcher;
pub use payloads::*;
