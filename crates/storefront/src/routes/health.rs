//! Health check endpoints for load balancers and orchestrators.

use axum::{extract::State, http::StatusCode};

use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies the session database and the hosted backend are reachable.
/// Returns 503 Service Unavailable if either is not.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    let products = state.backend().anon().products();
    let (database, backend) = tokio::join!(
        sqlx::query("SELECT 1").fetch_one(state.pool()),
        products.count(),
    );

    match (database, backend) {
        (Ok(_), Ok(_)) => StatusCode::OK,
        (Err(e), _) => {
            tracing::warn!(error = %e, "Readiness: session database unreachable");
            StatusCode::SERVICE_UNAVAILABLE
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Readiness: backend unreachable");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
