//! # Device Runtime Library
//!
//! Configuration and transport for the `device-runtime` binary, exposed for
//! testing. The entry point is `main.rs`.

pub mod config;
pub mod transport;

pub use config::DeviceConfig;
pub use transport::serve;
