use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Negative,
    NotNegative,
}

/// Content moderation oracle for the public feed. External collaborator,
/// consumed at this boundary only.
#[async_trait]
pub trait ModerationOracle: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Verdict>;
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    negative: bool,
}

/// HTTP-backed classifier: POST {"text": ...} -> {"negative": bool}.
pub struct HttpModeration {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpModeration {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl ModerationOracle for HttpModeration {
    async fn classify(&self, text: &str) -> Result<Verdict> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("moderation request failed: {e}")))?
            .error_for_status()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("moderation endpoint error: {e}")))?;

        let verdict: ClassifyResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("moderation response invalid: {e}")))?;

        Ok(if verdict.negative {
            Verdict::Negative
        } else {
            Verdict::NotNegative
        })
    }
}

/// Fallback used when no endpoint is configured: everything passes.
pub struct Permissive;

#[async_trait]
impl ModerationOracle for Permissive {
    async fn classify(&self, _text: &str) -> Result<Verdict> {
        Ok(Verdict::NotNegative)
    }
}
