//! `GET /discover`: reports every registered service and workflow, with
//! input/output type descriptors and retention, for the host HTTP server to
//! expose to callers deciding what they can invoke.

use std::collections::BTreeMap;

use axum::routing::{get, MethodRouter};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::registry::ServiceRegistry;
use crate::workflow::WorkflowMeta;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServiceDescriptor {
    pub name: String,
    pub workflows: Vec<WorkflowMeta>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DiscoverResponse {
    pub services: Vec<ServiceDescriptor>,
}

/// Builds the `DiscoverResponse` body from a registry's defensive copy of its
/// services (see [`ServiceRegistry::services`]). Split out from [`describe`]
/// so `ServiceRegistry::router` can bake a response from an already-held lock
/// without taking it a second time.
pub(crate) fn describe_services(services: BTreeMap<String, Vec<WorkflowMeta>>) -> DiscoverResponse {
    let services = services
        .into_iter()
        .map(|(name, workflows)| ServiceDescriptor { name, workflows })
        .collect();
    DiscoverResponse { services }
}

/// Builds the `DiscoverResponse` body from the registry's current state.
pub fn describe(registry: &ServiceRegistry) -> DiscoverResponse {
    describe_services(registry.services())
}

/// `GET /discover` mounted against the process-wide registry. Application
/// code that keeps its own [`ServiceRegistry`] instance instead of the
/// global one gets an equivalent route for free from
/// [`ServiceRegistry::router`], which bakes `/discover` in alongside every
/// `register_route` mount.
pub fn route() -> MethodRouter {
    get(|| async { Json(describe(ServiceRegistry::global())) })
}
