pub mod assistant;
pub mod auth;
pub mod chat;
pub mod messages;

use axum::{routing::get, Router};

use crate::middleware::auth::require_session;
use crate::state::AppState;
use crate::websocket::handlers::ws_handler;

pub fn routes(state: AppState) -> Router<AppState> {
    // Everything past the auth endpoints resolves a session first; the
    // middleware also carries the silent-renewal side effect.
    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        .merge(chat::routes())
        .merge(messages::routes())
        .merge(assistant::routes())
        .route("/ws", get(ws_handler))
        .layer(axum::middleware::from_fn_with_state(state, require_session));

    Router::new().merge(auth::routes()).merge(protected)
}
