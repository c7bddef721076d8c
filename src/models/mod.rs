use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account record owned by the identity store. The messaging core never
/// creates or deletes these, it only resolves usernames to them.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub profession: String,
    pub address: String,
    pub pincode: String,
    #[serde(skip_serializing)]
    pub contact_hash: String,
    pub email: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub profession: String,
    pub address: String,
    pub pincode: String,
    pub contact_hash: String,
    pub email: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Immutable once persisted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatMessage {
    pub id: Uuid,
    pub sender: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// One user-message/bot-reply turn in a user's assistant conversation log.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AssistantExchange {
    pub id: Uuid,
    pub user_message: String,
    pub bot_reply: String,
    pub created_at: DateTime<Utc>,
}

/// Public feed entry: a chat message with no designated receiver,
/// append-only, totally ordered by insertion.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PublicFeedEntry {
    pub id: Uuid,
    pub sender: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}
