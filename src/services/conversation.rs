use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{ChatMessage, PublicFeedEntry};

/// Canonical form of the unordered participant pair: the lexicographically
/// smaller name first. Storing and querying this single orientation replaces
/// the mirrored either-way lookup.
pub fn canonical_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Durable persistence boundary for the two message collections: the shared
/// public feed and per-pair private threads.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Append to the thread for the unordered `{sender, receiver}` pair,
    /// creating the thread lazily on the first message.
    async fn append_private(
        &self,
        sender: &str,
        receiver: &str,
        body: &str,
    ) -> Result<ChatMessage>;

    /// Thread messages in insertion order. Empty when no thread exists yet.
    async fn private_history(&self, a: &str, b: &str) -> Result<Vec<ChatMessage>>;

    async fn append_public(&self, sender: &str, body: &str) -> Result<PublicFeedEntry>;

    async fn public_feed(&self) -> Result<Vec<PublicFeedEntry>>;
}

pub struct PgConversationStore {
    db: Pool<Postgres>,
}

impl PgConversationStore {
    pub fn new(db: Pool<Postgres>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConversationStore for PgConversationStore {
    async fn append_private(
        &self,
        sender: &str,
        receiver: &str,
        body: &str,
    ) -> Result<ChatMessage> {
        let (low, high) = canonical_pair(sender, receiver);
        let mut tx = self.db.begin().await?;

        let thread_id: Uuid = sqlx::query_scalar(
            "INSERT INTO private_threads (id, participant_low, participant_high, last_updated) \
             VALUES ($1, $2, $3, NOW()) \
             ON CONFLICT (participant_low, participant_high) \
             DO UPDATE SET last_updated = NOW() \
             RETURNING id",
        )
        .bind(Uuid::new_v4())
        .bind(low)
        .bind(high)
        .fetch_one(&mut *tx)
        .await?;

        let message = sqlx::query_as::<_, ChatMessage>(
            "INSERT INTO private_messages (id, thread_id, sender, body) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, sender, body, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(thread_id)
        .bind(sender)
        .bind(body)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(message)
    }

    async fn private_history(&self, a: &str, b: &str) -> Result<Vec<ChatMessage>> {
        let (low, high) = canonical_pair(a, b);
        let messages = sqlx::query_as::<_, ChatMessage>(
            "SELECT m.id, m.sender, m.body, m.created_at \
             FROM private_messages m \
             JOIN private_threads t ON t.id = m.thread_id \
             WHERE t.participant_low = $1 AND t.participant_high = $2 \
             ORDER BY m.seq",
        )
        .bind(low)
        .bind(high)
        .fetch_all(&self.db)
        .await?;
        Ok(messages)
    }

    async fn append_public(&self, sender: &str, body: &str) -> Result<PublicFeedEntry> {
        let entry = sqlx::query_as::<_, PublicFeedEntry>(
            "INSERT INTO public_feed (id, sender, body) \
             VALUES ($1, $2, $3) \
             RETURNING id, sender, body, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(sender)
        .bind(body)
        .fetch_one(&self.db)
        .await?;
        Ok(entry)
    }

    async fn public_feed(&self) -> Result<Vec<PublicFeedEntry>> {
        let entries = sqlx::query_as::<_, PublicFeedEntry>(
            "SELECT id, sender, body, created_at FROM public_feed ORDER BY seq",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(entries)
    }
}
