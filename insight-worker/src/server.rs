use std::sync::Arc;

use aide::openapi::OpenApi;
use axum::{Extension, Router};
use datadog_tracing::axum::{OtelAxumLayer, OtelInResponseLayer};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::producer::QueueProducer;
use crate::routes;
use crate::types::Environment;

/// Builds the application router with its shared state
pub fn router(environment: Environment, producer: Arc<QueueProducer>) -> Router {
    let mut openapi = OpenApi::default();

    routes::handler()
        .finish_api(&mut openapi)
        .layer(Extension(openapi))
        .layer(Extension(environment))
        .layer(Extension(producer))
        // Include trace context as header into the response
        .layer(OtelInResponseLayer)
        // Start OpenTelemetry trace on incoming request
        .layer(OtelAxumLayer::default())
        .layer(tower_http::timeout::TimeoutLayer::new(
            std::time::Duration::from_secs(5),
        ))
}

/// Starts the server with the given environment and dependencies
///
/// # Errors
///
/// Returns an error if the server fails to start or bind to the port
pub async fn start(
    environment: Environment,
    producer: Arc<QueueProducer>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let router = router(environment, producer);

    let addr = std::net::SocketAddr::from((
        [0, 0, 0, 0],
        std::env::var("PORT").map_or(Ok(8000), |p| p.parse())?,
    ));

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🔄 Insight Worker started on http://{addr}");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(anyhow::Error::from)
}
