use std::sync::Arc;

use axum::extract::ws::Message;

use crate::error::{AppError, Result};
use crate::models::{ChatMessage, PublicFeedEntry};
use crate::services::conversation::ConversationStore;
use crate::services::moderation::{ModerationOracle, Verdict};
use crate::websocket::{ConnectionRegistry, PushFrame};

/// Orchestrates message flow: durable persistence first, then best-effort
/// live delivery through the connection registry.
pub struct MessageRouter {
    store: Arc<dyn ConversationStore>,
    registry: ConnectionRegistry,
    moderation: Arc<dyn ModerationOracle>,
}

impl MessageRouter {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        registry: ConnectionRegistry,
        moderation: Arc<dyn ModerationOracle>,
    ) -> Self {
        Self {
            store,
            registry,
            moderation,
        }
    }

    /// Persist into the pair thread, then push to the receiver's live
    /// channel if one exists. Persistence completing is what makes the send
    /// a success; a failed push is logged and never rolls anything back.
    pub async fn send(&self, sender: &str, receiver: &str, body: &str) -> Result<ChatMessage> {
        let message = self.store.append_private(sender, receiver, body).await?;

        if let Some(channel) = self.registry.lookup(receiver).await {
            let frame = PushFrame {
                message: body.to_string(),
                sender: sender.to_string(),
                receiver: receiver.to_string(),
            };
            match serde_json::to_string(&frame) {
                Ok(payload) => {
                    if channel.send(Message::Text(payload)).is_err() {
                        tracing::warn!(%receiver, "live push failed, receiver catches up via history");
                    }
                }
                Err(e) => tracing::error!(%receiver, error = %e, "failed to serialize push frame"),
            }
        }

        Ok(message)
    }

    pub async fn history(&self, a: &str, b: &str) -> Result<Vec<ChatMessage>> {
        self.store.private_history(a, b).await
    }

    /// Public-feed variant: no receiver, no push, but a moderation gate
    /// that runs before anything is persisted.
    pub async fn post_public(&self, sender: &str, body: &str) -> Result<PublicFeedEntry> {
        if self.moderation.classify(body).await? == Verdict::Negative {
            return Err(AppError::PolicyViolation(
                "Message flagged as negative by moderation".into(),
            ));
        }
        self.store.append_public(sender, body).await
    }

    pub async fn public_feed(&self) -> Result<Vec<PublicFeedEntry>> {
        self.store.public_feed().await
    }
}
