//! Demo Partition Service
//!
//! Serves an `InMemorySource` over the JSON protocol of `source::protocol`, so the CLI
//! and the HTTP client can be exercised end to end without a cloud account.
//!
//! ## Routes
//! - `GET /partitions?home=<id>`: the partition set.
//! - `POST /partitions/:id/records`: records of one partition matching the posted filters.

pub mod handlers;

#[cfg(test)]
mod tests;

use crate::source::memory::InMemorySource;
use crate::source::protocol::{ENDPOINT_PARTITIONS, ENDPOINT_RECORDS};
use axum::routing::{get, post};
use axum::{Extension, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

pub fn router(source: Arc<InMemorySource>) -> Router {
    Router::new()
        .route(ENDPOINT_PARTITIONS, get(handlers::handle_list_partitions))
        .route(ENDPOINT_RECORDS, post(handlers::handle_fetch_records))
        .layer(Extension(source))
}

/// Binds `bind_addr` and serves until the process exits.
pub async fn serve(bind_addr: SocketAddr, source: Arc<InMemorySource>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(
        "Partition service listening on {} ({} partitions)",
        listener.local_addr()?,
        source.partition_ids().len()
    );
    axum::serve(listener, router(source)).await?;
    Ok(())
}

/// Binds `bind_addr` (port 0 picks a free port) and serves in the background.
/// Returns the bound address.
pub async fn spawn(
    bind_addr: SocketAddr,
    source: Arc<InMemorySource>,
) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let local_addr = listener.local_addr()?;
    let app = router(source);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Partition service stopped: {}", e);
        }
    });

    Ok((local_addr, handle))
}
