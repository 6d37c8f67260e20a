//! Place all spec types into a single module so they can be used as a lightweight dependency
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Primary CRD for creating and managing a synthetic HTTP load target.
///
/// All fields are optional. Defaults are resolved into a
/// `TargetConfig` before any resource is rendered.
#[derive(CustomResource, Serialize, Deserialize, Debug, Default, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "skeet.dev",
    version = "v1alpha1",
    kind = "HttpTarget",
    plural = "httptargets",
    status = "HttpTargetStatus",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct HttpTargetSpec {
    /// Number of nginx pods backing the service.
    /// Defaults to 1.
    pub replicas: Option<i32>,
    /// Image for the nginx container.
    /// Defaults to nginx:1.25.
    pub image: Option<String>,
    /// Pull policy for the nginx image.
    /// Defaults to Always.
    pub image_pull_policy: Option<String>,
    /// Number of bytes of pseudo-random content the container generates at startup.
    /// Defaults to 1MiB.
    pub content_size_bytes: Option<i64>,
}

/// Current status of the target.
#[derive(Default, Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpTargetStatus {
    /// Requested number of replicas.
    pub replicas: i32,
    /// Number of replicas ready to serve traffic.
    pub ready_replicas: i32,
    /// Externally reachable address of the load-balanced service.
    pub address: Option<String>,
    /// Describes why the target is not progressing.
    pub message: Option<String>,
}
