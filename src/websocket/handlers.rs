use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    Extension,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::unbounded_channel;

use crate::middleware::auth::CurrentPrincipal;
use crate::state::AppState;

/// Upgrade handler: the session middleware has already resolved the
/// principal, so the socket is bound to that identity.
pub async fn ws_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<CurrentPrincipal>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, principal.0, socket))
}

async fn handle_socket(state: AppState, principal: String, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = unbounded_channel();
    let connection_id = state.registry.register(&principal, tx).await;
    tracing::info!(%principal, "live connection opened");

    loop {
        tokio::select! {
            outbound = rx.recv() => match outbound {
                Some(message) => {
                    // A Close frame also arrives here when a newer
                    // connection for the same principal displaces this one.
                    let closing = matches!(message, Message::Close(_));
                    if sink.send(message).await.is_err() || closing {
                        break;
                    }
                }
                None => break,
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Inbound frames are unconsumed; the channel exists for
                // outbound push only.
                Some(Ok(_)) => {}
            },
        }
    }

    // Exactly once per closed channel; a no-op if this connection was
    // already replaced in the registry.
    state.registry.unregister(&principal, connection_id).await;
    tracing::info!(%principal, "live connection closed");
}
