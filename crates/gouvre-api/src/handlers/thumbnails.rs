use crate::error::{HttpAppError, ValidatedJson, ValidatedQuery};
use crate::state::AppState;
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct ThumbnailsQuery {
    pub expires: Option<u64>,
    #[serde(default)]
    pub square: bool,
}

#[derive(Debug, Deserialize)]
pub struct ThumbnailsRequest {
    pub filenames: Vec<String>,
    pub resolution: u32,
    #[serde(default)]
    pub encryption_secret: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ThumbnailsResponse {
    pub expires_at: DateTime<Utc>,
    /// Only files whose thumbnail could be produced appear here.
    pub filename_to_url: BTreeMap<String, String>,
}

/// Issue read links to thumbnails of several files at once.
#[tracing::instrument(skip(state, request), fields(operation = "create_thumbnail_links"))]
pub async fn create_thumbnail_links(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<ThumbnailsQuery>,
    ValidatedJson(request): ValidatedJson<ThumbnailsRequest>,
) -> Result<Json<ThumbnailsResponse>, HttpAppError> {
    let expires_at = state.expires_at(query.expires);
    let links = state
        .access
        .create_thumbnail_links(
            &request.filenames,
            request.resolution,
            query.square,
            request.encryption_secret.as_deref(),
            expires_at,
        )
        .await?;

    let filename_to_url = links
        .filename_to_token
        .into_iter()
        .map(|(filename, token)| {
            let url = state.link_url(&token);
            (filename, url)
        })
        .collect();

    Ok(Json(ThumbnailsResponse {
        expires_at: links.expires_at,
        filename_to_url,
    }))
}
