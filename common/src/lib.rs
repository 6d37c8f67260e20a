//! Provides types and functions common to the operator and benchmark drivers.
#![deny(missing_docs)]
pub mod target_info;
#[cfg(feature = "telemetry")]
pub mod telemetry;
