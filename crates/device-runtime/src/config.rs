//! # Device Configuration
//!
//! Gate configuration plus runtime parameters, overridable from the
//! environment. Invalid overrides are logged and ignored.

use std::path::PathBuf;
use std::str::FromStr;

use commissioning_gate::GateConfig;
use tracing::{info, warn};

/// Storage file name inside `data_dir`.
pub const STORE_FILE_NAME: &str = "gate.db";

/// Complete device configuration.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Gate configuration.
    pub gate: GateConfig,
    /// Directory holding the durable store.
    pub data_dir: PathBuf,
    /// Depth of the gate service command queue.
    pub command_queue_depth: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            gate: GateConfig::default(),
            data_dir: PathBuf::from("./data"),
            command_queue_depth: 32,
        }
    }
}

impl DeviceConfig {
    /// Path of the store file.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(STORE_FILE_NAME)
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("CG_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(required) = parse_var::<_, Flag>(&lookup, "CG_TC_REQUIRED") {
            config.gate.terms.acknowledgements_required = required.0;
        }
        if let Some(version) = parse_var(&lookup, "CG_TC_MIN_VERSION") {
            config.gate.terms.min_required_version = version;
        }
        if let Some(acks) = parse_var::<_, Bitmask>(&lookup, "CG_TC_REQUIRED_ACKS") {
            config.gate.terms.required_acknowledgements = acks.0;
        }
        if let Some(secs) = parse_var(&lookup, "CG_FAILSAFE_EXPIRY_SECS") {
            config.gate.fail_safe.expiry_length_seconds = secs;
        }
        if let Some(secs) = parse_var(&lookup, "CG_FAILSAFE_MAX_CUMULATIVE_SECS") {
            config.gate.fail_safe.max_cumulative_seconds = secs;
        }
        if let Some(max) = parse_var(&lookup, "CG_MAX_FABRICS") {
            config.gate.max_fabrics = max;
        }
        if let Some(depth) = parse_var(&lookup, "CG_COMMAND_QUEUE_DEPTH") {
            config.command_queue_depth = depth;
        }

        info!(
            data_dir = %config.data_dir.display(),
            tc_required = config.gate.terms.acknowledgements_required,
            tc_min_version = config.gate.terms.min_required_version,
            "Loaded device configuration"
        );
        config
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring invalid configuration value");
            None
        }
    }
}

/// Boolean accepting `true/false/1/0/yes/no`.
struct Flag(bool);

impl FromStr for Flag {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Flag(true)),
            "0" | "false" | "no" | "off" => Ok(Flag(false)),
            _ => Err(()),
        }
    }
}

/// `u16` in decimal or `0x` hex.
struct Bitmask(u16);

impl FromStr for Bitmask {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u16::from_str_radix(hex, 16).map(Bitmask),
            None => s.parse().map(Bitmask),
        }
    }
}
