use axum::{extract::State, http::StatusCode, routing::post, Extension, Json, Router};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::CurrentPrincipal;
use crate::models::PublicFeedEntry;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/chat/public", post(post_public).get(get_feed))
}

#[derive(Debug, Deserialize, Validate)]
pub struct PublicPostRequest {
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
}

/// Moderated public post: a negative classification rejects the post
/// before anything is persisted.
async fn post_public(
    State(state): State<AppState>,
    Extension(principal): Extension<CurrentPrincipal>,
    Json(payload): Json<PublicPostRequest>,
) -> Result<(StatusCode, Json<PublicFeedEntry>)> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let entry = state.router.post_public(&principal.0, &payload.text).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn get_feed(State(state): State<AppState>) -> Result<Json<Vec<PublicFeedEntry>>> {
    Ok(Json(state.router.public_feed().await?))
}
