//! Aria Device - paired-device tooling for library sync
//!
//! Wraps the external device bridge tool (`adb`) behind the [`DeviceCommander`]
//! trait and provides [`ConnectionProbe`], a staged diagnostic chain that
//! verifies tool presence, device reachability, authorization and a writable
//! destination before any sync work starts.

mod adb;
mod error;
mod probe;

// Re-export public API
pub use adb::{AdbCommander, AdbConfig, DeviceCommander, DeviceEntry, DeviceState};
pub use error::{DeviceError, Result};
pub use probe::{ConnectionProbe, ProbeError, ProbeReport, ProbeStage};
