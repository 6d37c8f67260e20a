//! Provides API for the operator and related tooling.
#![warn(missing_docs)]

/// Labels module for managing resource labels.
#[cfg(feature = "controller")]
pub(crate) mod labels;
/// Target module for managing HTTP load target resources.
pub mod target;
/// Utils module for shared utility functions.
#[cfg(feature = "controller")]
pub mod utils;

/// Field manager name used for server-side apply.
#[cfg(feature = "controller")]
const CONTROLLER_NAME: &str = "skeet";
