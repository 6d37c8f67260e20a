//! Helper methods only available for tests
use expect_test::{expect_file, ExpectFile};
use k8s_openapi::api::{apps::v1::Deployment, core::v1::Service};
use kube::Resource;
use tokio::task::JoinHandle;

use crate::{
    target::{HttpTarget, HttpTargetSpec, HttpTargetStatus},
    utils::test::{ApiServerVerifier, WithStatus},
};

// Add test specific implementation to the HttpTarget
impl HttpTarget {
    /// A normal test target
    pub fn test() -> Self {
        let mut target = HttpTarget::new("test", HttpTargetSpec::default());
        let meta = target.meta_mut();
        meta.namespace = Some("test".to_owned());
        target
    }
    /// Modify a target to have an expected spec
    pub fn with_spec(self, spec: HttpTargetSpec) -> Self {
        Self { spec, ..self }
    }
}

impl WithStatus for HttpTarget {
    type Status = HttpTargetStatus;
    /// Modify a target to have an expected status
    fn with_status(self, status: HttpTargetStatus) -> Self {
        Self {
            status: Some(status),
            ..self
        }
    }
}

/// Stub of expected requests during reconciliation.
///
/// Default expectations are found in `./testdata/default_stubs`.
/// Use `UPDATE_EXPECT=1 cargo test` to update all expect![[]] data.
#[derive(Debug)]
pub struct Stub {
    target: HttpTarget,
    pub site_config_map: Option<ExpectFile>,
    pub deployment: Option<ExpectFile>,
    pub service: Option<ExpectFile>,
    pub deployment_status: Option<(ExpectFile, Option<Deployment>)>,
    pub service_status: Option<(ExpectFile, Option<Service>)>,
    pub targets_config_map: Option<ExpectFile>,
    pub status: ExpectFile,
}

impl Default for Stub {
    fn default() -> Self {
        Self {
            target: HttpTarget::test(),
            site_config_map: Some(expect_file!["./testdata/default_stubs/site_config_map"]),
            deployment: Some(expect_file!["./testdata/default_stubs/deployment"]),
            service: Some(expect_file!["./testdata/default_stubs/service"]),
            deployment_status: Some((
                expect_file!["./testdata/default_stubs/deployment_status"],
                Some(Deployment::default()),
            )),
            service_status: Some((
                expect_file!["./testdata/default_stubs/service_status"],
                Some(Service::default()),
            )),
            targets_config_map: None,
            status: expect_file!["./testdata/default_stubs/status"],
        }
    }
}

impl Stub {
    pub fn with_target(self, target: HttpTarget) -> Self {
        Self { target, ..self }
    }

    /// A stub expecting only the status patch, as happens when the target
    /// definition is rejected before anything is applied.
    pub fn definition_error(status: ExpectFile) -> Self {
        Self {
            target: HttpTarget::test(),
            site_config_map: None,
            deployment: None,
            service: None,
            deployment_status: None,
            service_status: None,
            targets_config_map: None,
            status,
        }
    }

    /// Run a test against the provided server.
    ///
    /// NB: If the controller is making more calls than we are handling in the stub,
    /// you then typically see a `KubeError(Service(Closed(())))` from the reconciler.
    ///
    /// You should await the `JoinHandle` (with a timeout) from this function to ensure that the
    /// stub runs to completion (i.e. all expected calls were responded to),
    /// using the timeout to catch missing api calls to Kubernetes.
    pub fn run(self, mut fakeserver: ApiServerVerifier) -> JoinHandle<()> {
        tokio::spawn(async move {
            // We need to handle each expected call in sequence
            if let Some(site_config_map) = self.site_config_map {
                fakeserver
                    .handle_apply(site_config_map)
                    .await
                    .expect("site configmap should apply");
            }
            if let Some(deployment) = self.deployment {
                fakeserver
                    .handle_apply(deployment)
                    .await
                    .expect("deployment should apply");
            }
            if let Some(service) = self.service {
                fakeserver
                    .handle_apply(service)
                    .await
                    .expect("service should apply");
            }

            // Next we handle the status queries
            if let Some((expected, deployment)) = self.deployment_status {
                fakeserver
                    .handle_request_response(expected, deployment.as_ref())
                    .await
                    .expect("deployment status should be reported");
            }
            if let Some((expected, service)) = self.service_status {
                fakeserver
                    .handle_request_response(expected, service.as_ref())
                    .await
                    .expect("service status should be reported");
            }

            if let Some(targets_config_map) = self.targets_config_map {
                fakeserver
                    .handle_apply(targets_config_map)
                    .await
                    .expect("targets configmap should apply");
            }

            // Finally we handle the patch status call
            fakeserver
                .handle_patch_status(self.status, self.target.clone())
                .await
                .expect("status should patch");
        })
    }
}
