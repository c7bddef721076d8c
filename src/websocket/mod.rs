use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc::UnboundedSender, RwLock};
use uuid::Uuid;

pub mod handlers;

/// Wire shape of a live-delivery frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushFrame {
    pub message: String,
    pub sender: String,
    pub receiver: String,
}

struct LiveConnection {
    id: Uuid,
    sender: UnboundedSender<Message>,
}

/// In-memory map from a connected principal to its live channel, used only
/// for best-effort push. One channel per principal: registering over an
/// existing entry closes the displaced channel. Rebuilt empty on restart.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<HashMap<String, LiveConnection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a channel for `principal`, returning a connection id the
    /// caller must present to `unregister`. A displaced prior channel is
    /// sent a close frame so it does not linger as a leaked socket.
    pub async fn register(&self, principal: &str, sender: UnboundedSender<Message>) -> Uuid {
        let id = Uuid::new_v4();
        let displaced = self
            .inner
            .write()
            .await
            .insert(principal.to_string(), LiveConnection { id, sender });
        if let Some(old) = displaced {
            tracing::debug!(%principal, "replacing live connection");
            let _ = old.sender.send(Message::Close(None));
        }
        id
    }

    /// Idempotent: removes the entry only if it still belongs to
    /// `connection_id`, so a connection torn down after being replaced
    /// cannot evict its successor.
    pub async fn unregister(&self, principal: &str, connection_id: Uuid) {
        let mut guard = self.inner.write().await;
        if guard.get(principal).map(|c| c.id) == Some(connection_id) {
            guard.remove(principal);
        }
    }

    pub async fn lookup(&self, principal: &str) -> Option<UnboundedSender<Message>> {
        self.inner
            .read()
            .await
            .get(principal)
            .map(|c| c.sender.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test]
    async fn register_replaces_and_closes_prior_channel() {
        let registry = ConnectionRegistry::new();
        let (tx1, mut rx1) = unbounded_channel();
        let (tx2, _rx2) = unbounded_channel();

        registry.register("alice", tx1).await;
        registry.register("alice", tx2.clone()).await;

        // The displaced channel was told to close.
        assert!(matches!(rx1.recv().await, Some(Message::Close(None))));

        // Lookup now resolves to the second channel.
        let found = registry.lookup("alice").await.unwrap();
        found.send(Message::Text("ping".into())).unwrap();
        assert!(!tx2.is_closed());
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = unbounded_channel();

        let id = registry.register("alice", tx).await;
        registry.unregister("alice", id).await;
        assert!(registry.lookup("alice").await.is_none());

        // Second unregister of the same connection is a no-op.
        registry.unregister("alice", id).await;
        assert!(registry.lookup("alice").await.is_none());
    }

    #[tokio::test]
    async fn stale_unregister_does_not_evict_successor() {
        let registry = ConnectionRegistry::new();
        let (tx1, _rx1) = unbounded_channel();
        let (tx2, _rx2) = unbounded_channel();

        let first = registry.register("alice", tx1).await;
        let _second = registry.register("alice", tx2).await;

        // The replaced connection cleaning up must not remove the new one.
        registry.unregister("alice", first).await;
        assert!(registry.lookup("alice").await.is_some());
    }

    #[tokio::test]
    async fn lookup_of_unknown_principal_is_absent() {
        let registry = ConnectionRegistry::new();
        assert!(registry.lookup("nobody").await.is_none());
    }
}
