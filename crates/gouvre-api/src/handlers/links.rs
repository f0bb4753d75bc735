use crate::error::{HttpAppError, ValidatedJson, ValidatedQuery};
use crate::handlers::{ExpiresQuery, LinkResponse};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use gouvre_core::AppError;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct LinkRequest {
    pub filename: String,
    #[serde(default)]
    pub encryption_secret: Option<String>,
}

/// Issue a read link for a stored file.
#[tracing::instrument(skip(state, request), fields(operation = "create_link"))]
pub async fn create_link(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<ExpiresQuery>,
    ValidatedJson(request): ValidatedJson<LinkRequest>,
) -> Result<Json<LinkResponse>, HttpAppError> {
    let expires_at = state.expires_at(query.expires);
    let link = state
        .access
        .create_link(
            &request.filename,
            request.encryption_secret.as_deref(),
            expires_at,
        )
        .await?;

    Ok(Json(LinkResponse {
        url: state.link_url(&link.token),
        expires_at: link.expires_at,
    }))
}

/// Serve the file behind a read link.
#[tracing::instrument(skip(state, token), fields(operation = "get_link"))]
pub async fn get_link(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Response, HttpAppError> {
    let file = state.access.resolve_link(&token).await?;

    tracing::debug!(
        filename = %file.filename,
        content_type = %file.content_type,
        size_bytes = file.data.len(),
        "Serving file"
    );

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, file.content_type.as_str())
        .header(
            header::CACHE_CONTROL,
            format!("private, max-age={}", file.max_age_secs),
        )
        .body(Body::from(file.data))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            AppError::Internal(e.to_string())
        })?;

    Ok(response)
}
