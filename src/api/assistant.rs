use axum::{extract::State, routing::post, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::CurrentPrincipal;
use crate::models::AssistantExchange;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/assistant", post(converse).get(get_history))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssistantRequest {
    #[validate(length(min = 1, max = 4000))]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AssistantResponse {
    pub reply: String,
    pub conversation_log: Vec<AssistantExchange>,
}

async fn converse(
    State(state): State<AppState>,
    Extension(principal): Extension<CurrentPrincipal>,
    Json(payload): Json<AssistantRequest>,
) -> Result<Json<AssistantResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let (reply, conversation_log) = state
        .assistant
        .converse(&principal.0, &payload.message)
        .await?;
    Ok(Json(AssistantResponse {
        reply,
        conversation_log,
    }))
}

async fn get_history(
    State(state): State<AppState>,
    Extension(principal): Extension<CurrentPrincipal>,
) -> Result<Json<Vec<AssistantExchange>>> {
    Ok(Json(state.assistant.history(&principal.0).await?))
}
