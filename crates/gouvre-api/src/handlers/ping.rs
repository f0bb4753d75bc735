use axum::http::StatusCode;

/// Liveness check.
pub async fn ping() -> StatusCode {
    StatusCode::OK
}
