use crate::config::Listener as ListenerConfig;
use crate::errors::{InvalidMethodError, RelayServiceError};
use crate::relay::Relay;
use crate::types::{ProxyRequest, ProxyResponse};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;

pub const EXECUTE_PATH: &str = "/api/v1/proxy/execute";

pub fn router(relay: Arc<Relay>) -> Router {
    Router::new()
        .route(EXECUTE_PATH, post(execute))
        .route("/health", get(health))
        .with_state(relay)
}

pub async fn serve(listener: &ListenerConfig, relay: Relay) -> Result<(), RelayServiceError> {
    let app = router(Arc::new(relay));

    let addr = format!("{}:{}", listener.host, listener.port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn execute(
    State(relay): State<Arc<Relay>>,
    Json(request): Json<ProxyRequest>,
) -> Result<Json<ProxyResponse>, InvalidMethodError> {
    relay.execute(request).await.map(Json)
}

async fn health() -> &'static str {
    "ok\n"
}

#[derive(Serialize)]
struct ApiErrorResponse {
    error_message: String,
}

impl IntoResponse for InvalidMethodError {
    fn into_response(self) -> Response {
        let body = Json(ApiErrorResponse {
            error_message: self.to_string(),
        });

        (StatusCode::BAD_REQUEST, body).into_response()
    }
}
