//! Structural validation of rendered target manifests.
//!
//! Validation is a pure walk over the rendered objects. It cannot verify
//! runtime behavior such as whether the image actually starts nginx, that
//! belongs to the cluster's readiness probes.
use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::target::nginx::RenderedTarget;

/// Errors produced by [`validate`].
///
/// A validation failure signals a bug in the renderer or a mutated manifest,
/// not a transient condition. It is surfaced to the caller and never retried.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The identifying app label is absent or disagrees between locations.
    #[error("inconsistent app label: {location} has {found:?}, expected {expected:?}")]
    LabelMismatch {
        /// Place in the manifest that disagrees.
        location: &'static str,
        /// Label value the manifest is expected to use.
        expected: String,
        /// Label value found at the location, if any.
        found: Option<String>,
    },
    /// The container port and the service target port disagree.
    #[error("container port {container_port} does not match service target port {target_port}")]
    PortMismatch {
        /// Port exposed by the nginx container.
        container_port: i32,
        /// Port the service forwards traffic to.
        target_port: i32,
    },
    /// The rendered replica count differs from the requested one.
    #[error("rendered replica count {rendered} does not match requested {requested}")]
    ReplicasMismatch {
        /// Replica count the caller requested.
        requested: i32,
        /// Replica count present in the rendered deployment.
        rendered: i32,
    },
    /// A structural element the invariants depend on is absent.
    #[error("manifest is missing {0}")]
    Missing(&'static str),
}

/// Check the structural invariants of a rendered target:
///
/// * the single identifying app label is used consistently across the
///   deployment selector, the pod template, the anti-affinity match
///   expression and the service selector,
/// * the exposed container port equals the service target port,
/// * the rendered replica count equals the requested one.
pub fn validate(rendered: &RenderedTarget) -> Result<(), ValidationError> {
    let expected = &rendered.config.name;

    let spec = rendered
        .deployment
        .spec
        .as_ref()
        .ok_or(ValidationError::Missing("deployment spec"))?;

    let replicas = spec
        .replicas
        .ok_or(ValidationError::Missing("deployment replicas"))?;
    if replicas != rendered.config.replicas {
        return Err(ValidationError::ReplicasMismatch {
            requested: rendered.config.replicas,
            rendered: replicas,
        });
    }

    check_label(
        "deployment selector",
        app_label(spec.selector.match_labels.as_ref()),
        expected,
    )?;
    check_label(
        "pod template",
        app_label(
            spec.template
                .metadata
                .as_ref()
                .and_then(|meta| meta.labels.as_ref()),
        ),
        expected,
    )?;

    let pod_spec = spec
        .template
        .spec
        .as_ref()
        .ok_or(ValidationError::Missing("pod spec"))?;
    let anti_affinity_value = pod_spec
        .affinity
        .as_ref()
        .and_then(|affinity| affinity.pod_anti_affinity.as_ref())
        .and_then(|anti| {
            anti.required_during_scheduling_ignored_during_execution
                .as_ref()
        })
        .and_then(|terms| terms.first())
        .and_then(|term| term.label_selector.as_ref())
        .and_then(|selector| selector.match_expressions.as_ref())
        .and_then(|exprs| {
            exprs
                .iter()
                .find(|expr| expr.key == "app" && expr.operator == "In")
        })
        .and_then(|expr| expr.values.as_ref())
        .and_then(|values| values.first())
        .cloned();
    check_label("anti-affinity match expression", anti_affinity_value, expected)?;

    let service_spec = rendered
        .service
        .spec
        .as_ref()
        .ok_or(ValidationError::Missing("service spec"))?;
    check_label(
        "service selector",
        app_label(service_spec.selector.as_ref()),
        expected,
    )?;

    let container = pod_spec
        .containers
        .first()
        .ok_or(ValidationError::Missing("nginx container"))?;
    let container_port = container
        .ports
        .as_ref()
        .and_then(|ports| ports.first())
        .map(|port| port.container_port)
        .ok_or(ValidationError::Missing("container port"))?;
    let service_port = service_spec
        .ports
        .as_ref()
        .and_then(|ports| ports.first())
        .ok_or(ValidationError::Missing("service port"))?;
    let target_port = match &service_port.target_port {
        Some(IntOrString::Int(port)) => *port,
        Some(IntOrString::String(_)) => {
            return Err(ValidationError::Missing("integer service target port"))
        }
        // An absent target port defaults to the service port.
        None => service_port.port,
    };
    if container_port != target_port {
        return Err(ValidationError::PortMismatch {
            container_port,
            target_port,
        });
    }

    Ok(())
}

fn app_label(labels: Option<&BTreeMap<String, String>>) -> Option<String> {
    labels.and_then(|labels| labels.get("app")).cloned()
}

fn check_label(
    location: &'static str,
    found: Option<String>,
    expected: &str,
) -> Result<(), ValidationError> {
    if found.as_deref() == Some(expected) {
        Ok(())
    } else {
        Err(ValidationError::LabelMismatch {
            location,
            expected: expected.to_owned(),
            found,
        })
    }
}
