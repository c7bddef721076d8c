use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Extension, Json, Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::CurrentPrincipal;
use crate::models::ChatMessage;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/messages/:peer", post(send_message).get(get_history))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
}

async fn send_message(
    State(state): State<AppState>,
    Extension(principal): Extension<CurrentPrincipal>,
    Path(peer): Path<String>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessage>)> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    // The receiver must be a known principal; threads are not created
    // toward accounts that do not exist.
    if state.identity.find_by_principal(&peer).await?.is_none() {
        return Err(AppError::NotFound(format!("no such user: {peer}")));
    }

    let message = state.router.send(&principal.0, &peer, &payload.text).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Insertion-ordered history with `peer`; an empty sequence when the pair
/// has never exchanged a message.
async fn get_history(
    State(state): State<AppState>,
    Extension(principal): Extension<CurrentPrincipal>,
    Path(peer): Path<String>,
) -> Result<Json<Vec<ChatMessage>>> {
    Ok(Json(state.router.history(&principal.0, &peer).await?))
}
