//! Renders the nginx workload resources for an HttpTarget.
//!
//! Rendering is a pure function from a resolved [`TargetConfig`] to the
//! Deployment and Service that describe the workload. The renderer performs no
//! I/O and never talks to the cluster; applying the output is the controller's
//! job.
use std::collections::BTreeMap;

use k8s_openapi::{
    api::{
        apps::v1::{Deployment, DeploymentSpec},
        core::v1::{
            Affinity, ConfigMapVolumeSource, Container, ContainerPort, PodAffinityTerm,
            PodAntiAffinity, PodSpec, PodTemplateSpec, Service, ServicePort, ServiceSpec, Volume,
            VolumeMount,
        },
    },
    apimachinery::pkg::{
        apis::meta::v1::{LabelSelector, LabelSelectorRequirement},
        util::intstr::IntOrString,
    },
};
use kube::core::ObjectMeta;

use crate::labels::selector_labels;
use crate::target::HttpTargetSpec;

/// Port the nginx container listens on and the service targets.
pub const CONTAINER_PORT: i32 = 80;
/// Path the generated payload is written to inside the container.
pub const CONTENT_PATH: &str = "/usr/share/nginx/html/random_content";

const NGINX_CONTAINER_NAME: &str = "nginx";
const SITE_CONF_VOLUME_NAME: &str = "site-conf";
const SITE_CONF_MOUNT_PATH: &str = "/etc/nginx/conf.d";

/// Name of the ConfigMap holding the site configuration of a target.
pub fn site_config_map_name(name: &str) -> String {
    format!("{name}-conf")
}

/// Fully resolved parameters of a target workload.
///
/// All fields must pass their constraints before rendering. No defaults are
/// substituted during rendering, resolving the optional CR fields is the
/// caller's job via [`TargetConfig::from_spec`].
#[derive(Clone, Debug, PartialEq)]
pub struct TargetConfig {
    /// Name of the workload, used as the app label value and resource name stem.
    pub name: String,
    /// Number of nginx pods, must be at least one.
    pub replicas: i32,
    /// Image reference for the nginx container, must be non-empty.
    pub image: String,
    /// Pull policy for the image.
    pub image_pull_policy: String,
    /// Size in bytes of the generated payload, must not be negative.
    pub content_size_bytes: i64,
}

impl TargetConfig {
    /// Resolve a config from a CR spec, filling defaults for absent fields.
    pub fn from_spec(name: String, spec: &HttpTargetSpec) -> Self {
        Self {
            name,
            replicas: spec.replicas.unwrap_or(1),
            image: spec.image.clone().unwrap_or_else(|| "nginx:1.25".to_owned()),
            image_pull_policy: spec
                .image_pull_policy
                .clone()
                .unwrap_or_else(|| "Always".to_owned()),
            content_size_bytes: spec.content_size_bytes.unwrap_or(1_048_576),
        }
    }
}

/// Errors produced by [`render`] when an input field violates its constraint.
///
/// Always recoverable by supplying corrected parameters, never retried
/// automatically.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InvalidParameter {
    /// Replica count below one.
    #[error("replicas must be >= 1, got {0}")]
    Replicas(i32),
    /// Image reference empty or containing whitespace.
    #[error("image must be a non-empty reference without whitespace, got {0:?}")]
    Image(String),
    /// Negative payload size.
    #[error("contentSizeBytes must be >= 0, got {0}")]
    ContentSizeBytes(i64),
}

/// The rendered resource descriptions of a target, deployment first then
/// service.
///
/// Produced once per [`render`] call and owned by the caller, the renderer
/// retains no reference. Carries the originating config so validation can
/// check replica-count fidelity without out-of-band state.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderedTarget {
    /// The nginx deployment.
    pub deployment: Deployment,
    /// The load-balanced service fronting the deployment.
    pub service: Service,
    /// The config this target was rendered from.
    pub config: TargetConfig,
}

/// Render the deployment and service for the given config.
///
/// Rendering is deterministic, identical configs produce structurally
/// identical output. Parameters are substituted verbatim into their slots;
/// the startup command is carried as an opaque string and never executed
/// here.
pub fn render(config: &TargetConfig) -> Result<RenderedTarget, InvalidParameter> {
    if config.replicas < 1 {
        return Err(InvalidParameter::Replicas(config.replicas));
    }
    if config.image.is_empty() || config.image.contains(char::is_whitespace) {
        return Err(InvalidParameter::Image(config.image.clone()));
    }
    if config.content_size_bytes < 0 {
        return Err(InvalidParameter::ContentSizeBytes(config.content_size_bytes));
    }
    Ok(RenderedTarget {
        deployment: deployment(config),
        service: service(config),
        config: config.clone(),
    })
}

// Startup command that writes the payload before exec'ing nginx.
// head -c writes exactly the requested number of bytes, including zero.
fn content_command(size_bytes: i64) -> String {
    format!("head -c {size_bytes} /dev/urandom > {CONTENT_PATH} && exec nginx -g 'daemon off;'")
}

fn deployment(config: &TargetConfig) -> Deployment {
    Deployment {
        metadata: ObjectMeta {
            name: Some(config.name.clone()),
            labels: selector_labels(&config.name),
            ..ObjectMeta::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(config.replicas),
            selector: LabelSelector {
                match_labels: selector_labels(&config.name),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: selector_labels(&config.name),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    affinity: Some(Affinity {
                        pod_anti_affinity: Some(PodAntiAffinity {
                            // Hard constraint, evaluated at scheduling time only.
                            required_during_scheduling_ignored_during_execution: Some(vec![
                                PodAffinityTerm {
                                    label_selector: Some(LabelSelector {
                                        match_expressions: Some(vec![LabelSelectorRequirement {
                                            key: "app".to_owned(),
                                            operator: "In".to_owned(),
                                            values: Some(vec![config.name.clone()]),
                                        }]),
                                        ..Default::default()
                                    }),
                                    topology_key: "kubernetes.io/hostname".to_owned(),
                                    ..Default::default()
                                },
                            ]),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }),
                    containers: vec![Container {
                        command: Some(vec![
                            "/bin/sh".to_owned(),
                            "-c".to_owned(),
                            content_command(config.content_size_bytes),
                        ]),
                        image: Some(config.image.clone()),
                        image_pull_policy: Some(config.image_pull_policy.clone()),
                        name: NGINX_CONTAINER_NAME.to_owned(),
                        ports: Some(vec![ContainerPort {
                            container_port: CONTAINER_PORT,
                            name: Some("http".to_owned()),
                            ..Default::default()
                        }]),
                        volume_mounts: Some(vec![VolumeMount {
                            mount_path: SITE_CONF_MOUNT_PATH.to_owned(),
                            name: SITE_CONF_VOLUME_NAME.to_owned(),
                            ..Default::default()
                        }]),
                        ..Default::default()
                    }],
                    volumes: Some(vec![Volume {
                        config_map: Some(ConfigMapVolumeSource {
                            name: Some(site_config_map_name(&config.name)),
                            ..Default::default()
                        }),
                        name: SITE_CONF_VOLUME_NAME.to_owned(),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn service(config: &TargetConfig) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(config.name.clone()),
            labels: selector_labels(&config.name),
            ..ObjectMeta::default()
        },
        spec: Some(ServiceSpec {
            // Do not rewrite source addresses and favor locally scheduled endpoints.
            external_traffic_policy: Some("Local".to_owned()),
            ports: Some(vec![ServicePort {
                name: Some("http".to_owned()),
                port: CONTAINER_PORT,
                protocol: Some("TCP".to_owned()),
                target_port: Some(IntOrString::Int(CONTAINER_PORT)),
                ..Default::default()
            }]),
            selector: selector_labels(&config.name),
            type_: Some("LoadBalancer".to_owned()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Data for the site configuration ConfigMap mounted into each pod.
pub fn site_config_map_data() -> BTreeMap<String, String> {
    BTreeMap::from_iter(vec![(
        "default.conf".to_owned(),
        r#"server {
    listen 80;
    server_name localhost;

    location / {
        root /usr/share/nginx/html;
        access_log off;
    }
}
"#
        .to_owned(),
    )])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::validate::validate;

    fn config() -> TargetConfig {
        TargetConfig {
            name: "target".to_owned(),
            replicas: 3,
            image: "nginx:1.21".to_owned(),
            image_pull_policy: "Always".to_owned(),
            content_size_bytes: 1_048_576,
        }
    }

    #[test]
    fn render_is_deterministic() {
        let config = config();
        assert_eq!(render(&config).unwrap(), render(&config).unwrap());
    }

    #[test]
    fn render_substitutes_parameters_verbatim() {
        let rendered = render(&config()).unwrap();
        let spec = rendered.deployment.spec.as_ref().unwrap();
        assert_eq!(spec.replicas, Some(3));
        let container = &spec.template.spec.as_ref().unwrap().containers[0];
        assert_eq!(container.image.as_deref(), Some("nginx:1.21"));
        let command = container.command.as_ref().unwrap();
        assert_eq!(
            command[2],
            "head -c 1048576 /dev/urandom > /usr/share/nginx/html/random_content && exec nginx -g 'daemon off;'"
        );
    }

    #[test]
    fn render_then_validate_succeeds() {
        validate(&render(&config()).unwrap()).unwrap();
    }

    #[test]
    fn zero_replicas_is_invalid() {
        let err = render(&TargetConfig {
            replicas: 0,
            ..config()
        })
        .unwrap_err();
        assert_eq!(err, InvalidParameter::Replicas(0));
        assert_eq!(err.to_string(), "replicas must be >= 1, got 0");
    }

    #[test]
    fn blank_image_is_invalid() {
        for image in ["", " ", "nginx :1.21"] {
            let err = render(&TargetConfig {
                image: image.to_owned(),
                ..config()
            })
            .unwrap_err();
            assert!(matches!(err, InvalidParameter::Image(_)), "{image:?}");
        }
    }

    #[test]
    fn negative_content_size_is_invalid() {
        let err = render(&TargetConfig {
            content_size_bytes: -1,
            ..config()
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "contentSizeBytes must be >= 0, got -1");
    }

    #[test]
    fn zero_content_size_renders() {
        let rendered = render(&TargetConfig {
            content_size_bytes: 0,
            ..config()
        })
        .unwrap();
        let spec = rendered.deployment.spec.as_ref().unwrap();
        let command = spec.template.spec.as_ref().unwrap().containers[0]
            .command
            .as_ref()
            .unwrap();
        assert!(command[2].starts_with("head -c 0 /dev/urandom"));
    }

    #[test]
    fn defaults_resolve_from_empty_spec() {
        let config = TargetConfig::from_spec("target".to_owned(), &HttpTargetSpec::default());
        assert_eq!(config.replicas, 1);
        assert_eq!(config.image, "nginx:1.25");
        assert_eq!(config.image_pull_policy, "Always");
        assert_eq!(config.content_size_bytes, 1_048_576);
    }

    #[test]
    fn spec_overrides_defaults() {
        let config = TargetConfig::from_spec(
            "target".to_owned(),
            &HttpTargetSpec {
                replicas: Some(5),
                image: Some("nginx:1.21".to_owned()),
                image_pull_policy: Some("IfNotPresent".to_owned()),
                content_size_bytes: Some(0),
            },
        );
        assert_eq!(config.replicas, 5);
        assert_eq!(config.image, "nginx:1.21");
        assert_eq!(config.image_pull_policy, "IfNotPresent");
        assert_eq!(config.content_size_bytes, 0);
    }
}
