//! Defines a common struct for describing a ready load target.
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Describes a target that is ready to receive HTTP load.
///
/// The operator publishes this record once the target's deployment is ready
/// and its load balancer has an external address. Benchmark drivers mount the
/// record and issue load against [`TargetInfo::http_url`].
#[derive(Default, Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetInfo {
    /// Name of the target workload.
    pub name: String,
    /// Namespace the target runs in.
    pub namespace: String,
    /// Externally reachable address of the load-balanced service.
    pub address: String,
    /// Number of pods backing the service.
    pub replicas: i32,
}

impl TargetInfo {
    /// Report the HTTP URL drivers should issue load against.
    pub fn http_url(&self) -> String {
        format!("http://{}", self.address)
    }
}
