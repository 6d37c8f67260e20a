use std::{sync::Arc, time::Duration};

use futures::stream::StreamExt;
use k8s_openapi::api::{
    apps::v1::Deployment,
    core::v1::{ConfigMap, Service},
};
use kube::{
    api::{Patch, PatchParams},
    client::Client,
    core::object::HasSpec,
    runtime::Controller,
    Api, Resource, ResourceExt,
};
use kube::runtime::{
    controller::Action,
    watcher::{self, Config},
};
use skeet_common::target_info::TargetInfo;
use tracing::{debug, error, info};

use crate::{
    labels::MANAGED_BY_LABEL_SELECTOR,
    target::{
        endpoints::{targets_config_map_data, targets_config_map_name},
        nginx::{render, site_config_map_data, site_config_map_name, TargetConfig},
        validate::validate,
        HttpTarget, HttpTargetStatus,
    },
    utils::{
        apply_config_map, apply_deployment, apply_service, get_deployment_status,
        get_service_status, Context,
    },
};

/// Handle errors during reconciliation.
fn on_error(_target: Arc<HttpTarget>, _error: &Error, _context: Arc<Context>) -> Action {
    Action::requeue(Duration::from_secs(5))
}

/// Errors produced by the reconcile function.
#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("Kube error: {source}")]
    Kube {
        #[from]
        source: kube::Error,
    },
}

/// Start a controller for the HttpTarget CRD.
pub async fn run() {
    let k_client = Client::try_default().await.unwrap();
    let context = Arc::new(Context::new(k_client.clone()));

    let targets: Api<HttpTarget> = Api::all(k_client.clone());
    let deployments = Api::<Deployment>::all(k_client.clone());
    let services = Api::<Service>::all(k_client.clone());
    let config_maps = Api::<ConfigMap>::all(k_client.clone());

    Controller::new(targets.clone(), Config::default())
        .owns(
            deployments,
            watcher::Config::default().labels(MANAGED_BY_LABEL_SELECTOR),
        )
        .owns(
            services,
            watcher::Config::default().labels(MANAGED_BY_LABEL_SELECTOR),
        )
        .owns(
            config_maps,
            watcher::Config::default().labels(MANAGED_BY_LABEL_SELECTOR),
        )
        .run(reconcile, on_error, context)
        .for_each(|rec_res| async move {
            match rec_res {
                Ok((target, _)) => {
                    info!(target.name, "reconcile success");
                }
                Err(err) => {
                    error!(?err, "reconcile error")
                }
            }
        })
        .await;
}

/// Perform a reconcile pass for the HttpTarget CRD
async fn reconcile(target: Arc<HttpTarget>, cx: Arc<Context>) -> Result<Action, Error> {
    let spec = target.spec();
    debug!(?spec, "reconcile");

    let ns = target.namespace().unwrap();
    let orefs = target
        .controller_owner_ref(&())
        .map(|oref| vec![oref])
        .unwrap_or_default();

    let config = TargetConfig::from_spec(target.name_any(), spec);

    let rendered = match render(&config) {
        Ok(rendered) => rendered,
        Err(err) => {
            error!(%err, "invalid target definition");
            return definition_error(cx, &target, &config, err.to_string()).await;
        }
    };
    if let Err(err) = validate(&rendered) {
        error!(%err, "rendered manifest failed validation");
        return definition_error(cx, &target, &config, err.to_string()).await;
    }

    apply_config_map(
        cx.clone(),
        &ns,
        orefs.clone(),
        &site_config_map_name(&config.name),
        site_config_map_data(),
    )
    .await?;
    apply_deployment(cx.clone(), &ns, orefs.clone(), rendered.deployment.clone()).await?;
    apply_service(cx.clone(), &ns, orefs.clone(), rendered.service.clone()).await?;

    let ready_replicas = get_deployment_status(cx.clone(), &ns, &config.name)
        .await?
        .and_then(|status| status.ready_replicas)
        .unwrap_or_default();
    let address = get_service_status(cx.clone(), &ns, &config.name)
        .await?
        .and_then(|status| status.load_balancer)
        .and_then(|lb| lb.ingress)
        .and_then(|ingress| ingress.into_iter().next())
        .and_then(|ingress| ingress.ip.or(ingress.hostname));

    let ready = ready_replicas >= config.replicas && address.is_some();
    if let Some(address) = &address {
        if ready_replicas >= config.replicas {
            // Publish the endpoint for benchmark drivers to mount.
            let info = TargetInfo {
                name: config.name.clone(),
                namespace: ns.clone(),
                address: address.clone(),
                replicas: config.replicas,
            };
            apply_config_map(
                cx.clone(),
                &ns,
                orefs.clone(),
                &targets_config_map_name(&config.name),
                targets_config_map_data(&info),
            )
            .await?;
        }
    }

    let status = HttpTargetStatus {
        replicas: config.replicas,
        ready_replicas,
        address,
        message: None,
    };
    let targets: Api<HttpTarget> = Api::namespaced(cx.k_client.clone(), &ns);
    let _patched = targets
        .patch_status(
            &target.name_any(),
            &PatchParams::default(),
            &Patch::Merge(serde_json::json!({ "status": status })),
        )
        .await?;

    if ready {
        Ok(Action::requeue(Duration::from_secs(60)))
    } else {
        Ok(Action::requeue(Duration::from_secs(10)))
    }
}

/// Record a rejected target definition in the CR status and park.
///
/// Invalid parameters are never retried automatically, reconciliation resumes
/// once the user corrects the definition.
async fn definition_error(
    cx: Arc<Context>,
    target: &HttpTarget,
    config: &TargetConfig,
    message: String,
) -> Result<Action, Error> {
    let ns = target.namespace().unwrap();
    let status = HttpTargetStatus {
        replicas: config.replicas,
        ready_replicas: 0,
        address: None,
        message: Some(message),
    };
    let targets: Api<HttpTarget> = Api::namespaced(cx.k_client.clone(), &ns);
    let _patched = targets
        .patch_status(
            &target.name_any(),
            &PatchParams::default(),
            &Patch::Merge(serde_json::json!({ "status": status })),
        )
        .await?;
    Ok(Action::await_change())
}
