use crate::error::{HttpAppError, ValidatedJson, ValidatedQuery};
use crate::handlers::{ExpiresQuery, LinkResponse};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct UploadLinkRequest {
    pub filename: String,
    #[serde(default)]
    pub encryption_secret: Option<String>,
    /// Square thumbnails to generate once the upload arrives.
    #[serde(default)]
    pub resolutions: Vec<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
    pub thumbnails: Vec<String>,
}

/// Issue a single-use upload link.
#[tracing::instrument(skip(state, request), fields(operation = "create_upload_link"))]
pub async fn create_upload_link(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<ExpiresQuery>,
    ValidatedJson(request): ValidatedJson<UploadLinkRequest>,
) -> Result<Json<LinkResponse>, HttpAppError> {
    let expires_at = state.expires_at(query.expires);
    let link = state
        .access
        .create_upload_link(
            &request.filename,
            request.encryption_secret.as_deref(),
            &request.resolutions,
            expires_at,
        )
        .await?;

    Ok(Json(LinkResponse {
        url: state.upload_url(&link.token),
        expires_at: link.expires_at,
    }))
}

/// Accept the raw body of an upload made through a single-use link.
#[tracing::instrument(skip(state, token, body), fields(operation = "upload_file", size_bytes = body.len()))]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResponse>), HttpAppError> {
    let outcome = state.access.upload(&token, body).await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            filename: outcome.filename,
            thumbnails: outcome.thumbnails,
        }),
    ))
}
