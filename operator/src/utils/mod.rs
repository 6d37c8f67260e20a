//! Utils is shared functions and constants for the controller

use std::{collections::BTreeMap, sync::Arc};

use k8s_openapi::{
    api::{
        apps::v1::{Deployment, DeploymentStatus},
        core::v1::{ConfigMap, Service, ServiceStatus},
    },
    apimachinery::pkg::apis::meta::v1::OwnerReference,
};

use kube::{
    api::{Patch, PatchParams},
    client::Client,
    core::ObjectMeta,
    Api, ResourceExt,
};

use crate::labels::{managed_labels, managed_labels_extend};
use crate::CONTROLLER_NAME;

/// Operator Context
pub struct Context {
    /// Kube client
    pub k_client: Client,
}

impl Context {
    /// Create new context
    pub fn new(k_client: Client) -> Self {
        Context { k_client }
    }
}

/// Apply a Deployment that carries its own identifying metadata.
/// Owner references and managed labels are overlaid onto the rendered metadata.
pub async fn apply_deployment(
    cx: Arc<Context>,
    ns: &str,
    orefs: Vec<OwnerReference>,
    mut deployment: Deployment,
) -> Result<Option<DeploymentStatus>, kube::error::Error> {
    let serverside = PatchParams::apply(CONTROLLER_NAME);
    let deployments: Api<Deployment> = Api::namespaced(cx.k_client.clone(), ns);

    let name = deployment.name_any();
    deployment.metadata.owner_references = Some(orefs);
    deployment.metadata.labels = managed_labels_extend(deployment.metadata.labels.take());

    // Server-side apply deployment
    let deployment = deployments
        .patch(&name, &serverside, &Patch::Apply(deployment))
        .await?;
    Ok(deployment.status)
}

/// Apply a Service that carries its own identifying metadata.
/// Owner references and managed labels are overlaid onto the rendered metadata.
pub async fn apply_service(
    cx: Arc<Context>,
    ns: &str,
    orefs: Vec<OwnerReference>,
    mut service: Service,
) -> Result<Option<ServiceStatus>, kube::error::Error> {
    let serverside = PatchParams::apply(CONTROLLER_NAME);
    let services: Api<Service> = Api::namespaced(cx.k_client.clone(), ns);

    let name = service.name_any();
    service.metadata.owner_references = Some(orefs);
    service.metadata.labels = managed_labels_extend(service.metadata.labels.take());

    // Server-side apply service
    let service = services
        .patch(&name, &serverside, &Patch::Apply(service))
        .await?;
    Ok(service.status)
}

/// Apply a config map
pub async fn apply_config_map(
    cx: Arc<Context>,
    ns: &str,
    orefs: Vec<OwnerReference>,
    name: &str,
    data: BTreeMap<String, String>,
) -> Result<(), kube::error::Error> {
    let serverside = PatchParams::apply(CONTROLLER_NAME);
    let config_maps: Api<ConfigMap> = Api::namespaced(cx.k_client.clone(), ns);
    // Apply config map
    let map_data = ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_owned()),
            owner_references: Some(orefs),
            labels: managed_labels(),
            ..ObjectMeta::default()
        },
        data: Some(data),
        ..Default::default()
    };
    config_maps
        .patch(name, &serverside, &Patch::Apply(map_data))
        .await?;
    Ok(())
}

/// Get the status of a deployment in namespace, None if it does not exist yet.
pub async fn get_deployment_status(
    cx: Arc<Context>,
    ns: &str,
    name: &str,
) -> Result<Option<DeploymentStatus>, kube::error::Error> {
    let deployments: Api<Deployment> = Api::namespaced(cx.k_client.clone(), ns);
    Ok(deployments
        .get_opt(name)
        .await?
        .and_then(|deployment| deployment.status))
}

/// Get the status of a service in namespace, None if it does not exist yet.
pub async fn get_service_status(
    cx: Arc<Context>,
    ns: &str,
    name: &str,
) -> Result<Option<ServiceStatus>, kube::error::Error> {
    let services: Api<Service> = Api::namespaced(cx.k_client.clone(), ns);
    Ok(services
        .get_opt(name)
        .await?
        .and_then(|service| service.status))
}
