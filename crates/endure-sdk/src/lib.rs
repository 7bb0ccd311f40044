//! # Endure Durable Execution SDK
//!
//! A client library that lets application code declare long-running business
//! workflows as ordinary async functions whose intermediate steps ("actions")
//! are recorded in, and coordinated by, an external durable execution engine
//! over HTTP. The SDK guarantees each action executes effectively once across
//! process crashes, retries, and concurrent invocations.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ServiceRegistry                         │
//! │  (process-wide: service → workflows, owns the axum router)  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Workflow / binding::route                  │
//! │  (parses the request envelope, builds a WorkflowContext)    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      WorkflowContext                         │
//! │  (the action-execution protocol, driven by EngineClient)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use endure_sdk::prelude::*;
//!
//! async fn process_order(ctx: WorkflowContext, input: OrderInput) -> Result<OrderOutput, WorkflowError> {
//!     let charge = ctx
//!         .execute_action(
//!             Some("charge_card"),
//!             |amount: u64| async move { charge_card(amount).await.map_err(ActionError::from) },
//!             input.amount,
//!             3,
//!             RetryMechanism::Exponential,
//!         )
//!         .await?;
//!     Ok(OrderOutput { charge })
//! }
//! ```

pub mod binding;
pub mod client;
pub mod config;
pub mod context;
pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod telemetry;
pub mod workflow;

/// Common imports for embedding this SDK into a host application.
pub mod prelude {
    pub use crate::binding::ExecuteRequest;
    pub use crate::client::{EngineClient, EngineClientError};
    pub use crate::config::{ConfigError, EngineClientConfig};
    pub use crate::context::{ActionError, ExecuteActionError, WorkflowContext};
    pub use crate::descriptor::{Describe, TypeDescriptor};
    pub use crate::discovery::{DiscoverResponse, ServiceDescriptor};
    pub use crate::error::EndureError;
    pub use crate::protocol::{EngineResponse, Log, LogStatus, RetryMechanism};
    pub use crate::registry::ServiceRegistry;
    pub use crate::workflow::{AnyWorkflow, RegistryError, Workflow, WorkflowError, WorkflowMeta};
}

pub use client::{EngineClient, EngineClientError};
pub use config::{ConfigError, EngineClientConfig};
pub use context::{ActionError, ExecuteActionError, WorkflowContext};
pub use error::EndureError;
pub use protocol::{EngineResponse, Log, LogStatus, RetryMechanism};
pub use registry::ServiceRegistry;
pub use workflow::{AnyWorkflow, RegistryError, Workflow, WorkflowError, WorkflowMeta};
