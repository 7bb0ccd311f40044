//! Process-wide registry mapping service name to its ordered workflows, and
//! owning the `axum::Router` the host HTTP server mounts.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, OnceLock};

use axum::routing::get;
use axum::{Json, Router};

use crate::binding;
use crate::client::EngineClient;
use crate::discovery;
use crate::workflow::{AnyWorkflow, RegistryError, WorkflowMeta};

struct Inner {
    services: BTreeMap<String, Vec<Arc<dyn AnyWorkflow>>>,
    router: Router,
}

impl Inner {
    fn new() -> Self {
        Self {
            services: BTreeMap::new(),
            router: Router::new(),
        }
    }
}

/// The process-wide workflow registry. Discovery is a process property, so
/// unlike the rest of this crate — which avoids ambient globals — this is
/// the one place a singleton is appropriate; see `ServiceRegistry::global`.
pub struct ServiceRegistry {
    inner: Mutex<Inner>,
}

static GLOBAL: OnceLock<ServiceRegistry> = OnceLock::new();

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
        }
    }

    /// The process-wide instance, created lazily on first access.
    pub fn global() -> &'static ServiceRegistry {
        GLOBAL.get_or_init(ServiceRegistry::new)
    }

    /// Test-only: resets the global registry's state.
    #[doc(hidden)]
    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("registry mutex poisoned");
        *inner = Inner::new();
    }

    /// Registers `workflow` under `service_name`, creating the service entry
    /// on first use. Fails if the name is empty or a workflow with the same
    /// name is already registered in that service.
    pub fn register_workflow(
        &self,
        service_name: &str,
        workflow: Arc<dyn AnyWorkflow>,
    ) -> Result<(), RegistryError> {
        if service_name.is_empty() {
            return Err(RegistryError::InvalidArgument);
        }
        let mut inner = self.inner.lock().expect("registry mutex poisoned");
        let workflows = inner.services.entry(service_name.to_string()).or_default();
        if workflows.iter().any(|w| w.meta().name == workflow.meta().name) {
            return Err(RegistryError::DuplicateWorkflow(workflow.meta().name));
        }
        workflows.push(workflow);
        Ok(())
    }

    /// Mounts `POST /execute/{service_name}/{workflow_name}` for `workflow`,
    /// bound to `engine` for its engine-client calls.
    pub fn register_route(
        &self,
        service_name: &str,
        workflow: Arc<dyn AnyWorkflow>,
        engine: Arc<EngineClient>,
    ) {
        let path = format!("/execute/{}/{}", service_name, workflow.meta().name);
        let mut inner = self.inner.lock().expect("registry mutex poisoned");
        let router = std::mem::take(&mut inner.router);
        inner.router = router.route(&path, binding::route(workflow, engine));
    }

    /// Defensive copy of the registered services and their workflows, in
    /// registration order, for the discovery endpoint.
    pub fn services(&self) -> BTreeMap<String, Vec<WorkflowMeta>> {
        let inner = self.inner.lock().expect("registry mutex poisoned");
        inner
            .services
            .iter()
            .map(|(name, workflows)| (name.clone(), workflows.iter().map(|w| w.meta()).collect()))
            .collect()
    }

    /// The routing table assembled from every `register_route` call so far,
    /// plus `GET /discover` reflecting the registry's state as of this call,
    /// ready to be merged into the host application's `axum::Router`.
    pub fn router(&self) -> Router {
        let inner = self.inner.lock().expect("registry mutex poisoned");
        let services = inner
            .services
            .iter()
            .map(|(name, workflows)| (name.clone(), workflows.iter().map(|w| w.meta()).collect()))
            .collect();
        let discover_response = discovery::describe_services(services);
        inner.router.clone().route(
            "/discover",
            get(move || {
                let discover_response = discover_response.clone();
                async move { Json(discover_response) }
            }),
        )
    }
}
