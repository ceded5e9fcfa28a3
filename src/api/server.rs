//! API server setup.

use std::future::Future;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::info;

use crate::error::ServiceError;
use crate::gateway::Gateway;
use crate::service::Service;

use super::{
    handlers::{health_handler, query_handler, submit_handler},
    types::ApiState,
};

/// Create the API router.
///
/// Public so the routes can be nested inside a larger application.
pub fn create_router(gateway: Gateway, max_upload_bytes: usize) -> Router {
    let state = ApiState { gateway };

    Router::new()
        .route("/submit", post(submit_handler))
        .route("/query/{id}", get(query_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve `service` until `shutdown` resolves.
///
/// Workers start before the listener accepts its first request. On shutdown
/// the listener stops first, then workers finish their current job.
pub async fn serve<F>(service: Service, shutdown: F) -> Result<(), ServiceError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let config = service.config();
    let addr = config.listen_addr()?;

    let app = create_router(service.gateway().clone(), config.max_upload_bytes);
    let workers = service.start_workers();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        "Listening on http://{} ({} workers)",
        listener.local_addr()?,
        workers.len()
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    info!("HTTP listener stopped; draining workers");
    workers.shutdown().await;

    served.map_err(ServiceError::Io)
}
