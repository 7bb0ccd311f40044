//! Optional `tracing` subscriber bootstrap for host binaries.
//!
//! Nothing in this crate calls `init_tracing` itself — an embedding
//! application already has its own subscriber in most deployments, and this
//! SDK must not fight it for the global default.

use tracing_subscriber::EnvFilter;

/// Installs a `tracing_subscriber::fmt` subscriber driven by `RUST_LOG`
/// (default `info`), matching the small bootstrap helpers the host API
/// binary uses. Intended for standalone binaries and examples, not library
/// code embedding this SDK.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
