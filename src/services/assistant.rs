use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::AssistantExchange;

/// First contact gets a fixed greeting instead of a free-form completion.
const GREETING_PROMPT: &str =
    "Ask only the content given in the backticks `Hello! How can I assist you today?`";

/// Scopes the completion to the product domain: answer locator questions,
/// redirect everything else, refuse the inappropriate.
fn scoped_prompt(user_message: &str) -> String {
    format!(
        "Role: You are the assistant for a proximity-based professional locator. \
         Users search for nearby professionals (plumbers, electricians, tutors, doctors) \
         by location and service category, browse verified profiles, and contact or book \
         them directly.\n\
         Guidelines:\n\
         1. Answer only questions about the locator, accurately and concisely.\n\
         2. For unrelated questions, redirect: \"I specialize in the professional \
         locator. How can I assist you with it?\"\n\
         3. Decline unethical or illegal requests.\n\
         Respond directly to the query without follow-up questions.\n\n\
         User Query: {user_message}"
    )
}

/// Text-completion backend for the assistant. External collaborator,
/// consumed at this boundary only.
#[async_trait]
pub trait AssistantOracle: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct CompleteResponse {
    reply: String,
}

/// HTTP-backed completion: POST {"prompt": ...} -> {"reply": ...}.
pub struct HttpAssistant {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAssistant {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl AssistantOracle for HttpAssistant {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "prompt": prompt }))
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("assistant request failed: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("assistant endpoint error: {e}")))?;

        let completion: CompleteResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("assistant response invalid: {e}")))?;

        Ok(completion.reply)
    }
}

/// Fallback used when no endpoint is configured: every request is refused,
/// unlike moderation, which degrades to letting content through. A missing
/// classifier loses screening; a missing completion backend has nothing to
/// answer with.
pub struct Unavailable;

#[async_trait]
impl AssistantOracle for Unavailable {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(AppError::Unavailable(
            "Assistant is not configured on this deployment".into(),
        ))
    }
}

/// Durable per-user conversation log.
#[async_trait]
pub trait AssistantLogStore: Send + Sync {
    async fn history(&self, username: &str) -> Result<Vec<AssistantExchange>>;
    async fn append(
        &self,
        username: &str,
        user_message: &str,
        bot_reply: &str,
    ) -> Result<AssistantExchange>;
}

pub struct PgAssistantLog {
    pool: PgPool,
}

impl PgAssistantLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssistantLogStore for PgAssistantLog {
    async fn history(&self, username: &str) -> Result<Vec<AssistantExchange>> {
        let log = sqlx::query_as::<_, AssistantExchange>(
            "SELECT id, user_message, bot_reply, created_at
             FROM assistant_exchanges
             WHERE username = $1
             ORDER BY seq",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        Ok(log)
    }

    async fn append(
        &self,
        username: &str,
        user_message: &str,
        bot_reply: &str,
    ) -> Result<AssistantExchange> {
        let exchange = sqlx::query_as::<_, AssistantExchange>(
            "INSERT INTO assistant_exchanges (id, username, user_message, bot_reply)
             VALUES ($1, $2, $3, $4)
             RETURNING id, user_message, bot_reply, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(user_message)
        .bind(bot_reply)
        .fetch_one(&self.pool)
        .await?;

        Ok(exchange)
    }
}

/// Assistant conversation flow: an empty log marks the first contact and
/// yields the greeting; afterwards the user query rides the scoped prompt.
/// Each successful completion is appended to the log before returning.
pub struct AssistantService {
    oracle: Arc<dyn AssistantOracle>,
    log: Arc<dyn AssistantLogStore>,
}

impl AssistantService {
    pub fn new(oracle: Arc<dyn AssistantOracle>, log: Arc<dyn AssistantLogStore>) -> Self {
        Self { oracle, log }
    }

    pub async fn converse(
        &self,
        username: &str,
        message: &str,
    ) -> Result<(String, Vec<AssistantExchange>)> {
        let mut log = self.log.history(username).await?;
        let prompt = if log.is_empty() {
            GREETING_PROMPT.to_string()
        } else {
            scoped_prompt(message)
        };

        let reply = self.oracle.complete(&prompt).await?;
        let exchange = self.log.append(username, message, &reply).await?;
        log.push(exchange);

        Ok((reply, log))
    }

    pub async fn history(&self, username: &str) -> Result<Vec<AssistantExchange>> {
        self.log.history(username).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryLog {
        entries: Mutex<HashMap<String, Vec<AssistantExchange>>>,
    }

    #[async_trait]
    impl AssistantLogStore for MemoryLog {
        async fn history(&self, username: &str) -> Result<Vec<AssistantExchange>> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .get(username)
                .cloned()
                .unwrap_or_default())
        }

        async fn append(
            &self,
            username: &str,
            user_message: &str,
            bot_reply: &str,
        ) -> Result<AssistantExchange> {
            let exchange = AssistantExchange {
                id: Uuid::new_v4(),
                user_message: user_message.to_string(),
                bot_reply: bot_reply.to_string(),
                created_at: Utc::now(),
            };
            self.entries
                .lock()
                .unwrap()
                .entry(username.to_string())
                .or_default()
                .push(exchange.clone());
            Ok(exchange)
        }
    }

    /// Replies with a fixed string and records every prompt it was given.
    struct Scripted {
        reply: &'static str,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn replying(reply: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply,
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl AssistantOracle for Scripted {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.to_string())
        }
    }

    fn service_with(oracle: Arc<Scripted>) -> AssistantService {
        AssistantService::new(oracle, Arc::new(MemoryLog::default()))
    }

    #[tokio::test]
    async fn first_message_yields_the_greeting_prompt() {
        let oracle = Scripted::replying("Hello! How can I assist you today?");
        let service = service_with(oracle.clone());

        let (reply, log) = service.converse("alice", "hi").await.unwrap();

        assert_eq!(oracle.last_prompt(), GREETING_PROMPT);
        assert_eq!(reply, "Hello! How can I assist you today?");
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].user_message, "hi");
        assert_eq!(log[0].bot_reply, reply);
    }

    #[tokio::test]
    async fn later_messages_ride_the_scoped_prompt() {
        let oracle = Scripted::replying("Search by category and pincode.");
        let service = service_with(oracle.clone());

        service.converse("alice", "hi").await.unwrap();
        let (_, log) = service
            .converse("alice", "how do I find a plumber?")
            .await
            .unwrap();

        let prompt = oracle.last_prompt();
        assert!(prompt.contains("User Query: how do I find a plumber?"));
        assert!(prompt.contains("professional locator"));
        assert_eq!(log.len(), 2);
    }

    #[tokio::test]
    async fn logs_are_kept_per_user() {
        let oracle = Scripted::replying("ok");
        let service = service_with(oracle);

        service.converse("alice", "hi").await.unwrap();

        assert_eq!(service.history("alice").await.unwrap().len(), 1);
        assert!(service.history("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_completion_leaves_the_log_untouched() {
        let service = AssistantService::new(Arc::new(Unavailable), Arc::new(MemoryLog::default()));

        let err = service.converse("alice", "hi").await.unwrap_err();
        assert!(matches!(err, AppError::Unavailable(_)));
        assert!(service.history("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_for_a_new_user_is_empty() {
        let service = service_with(Scripted::replying("ok"));
        assert!(service.history("nobody").await.unwrap().is_empty());
    }
}
