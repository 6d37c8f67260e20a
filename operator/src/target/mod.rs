//! HttpTarget is a k8s custom resource that defines a synthetic HTTP load target.

// Export all spec types
mod spec;
pub use spec::*;

// All other mods are behind the controller flag to keep the deps to a minimum
#[cfg(feature = "controller")]
pub(crate) mod controller;
#[cfg(feature = "controller")]
pub(crate) mod endpoints;
#[cfg(feature = "controller")]
pub mod nginx;
#[cfg(feature = "controller")]
pub mod validate;

#[cfg(test)]
#[cfg(feature = "controller")]
pub mod stub;

#[cfg(feature = "controller")]
pub use controller::run;
