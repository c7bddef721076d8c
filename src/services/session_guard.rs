use std::sync::Arc;

use chrono::Duration;

use crate::error::{AppError, Result};
use crate::services::identity::IdentityStore;
use crate::services::token_service::{TokenError, TokenService};

/// Outcome of a successful resolution. `renewed_access` is set when a
/// silent renewal happened; the transport layer must attach it to the
/// outbound response so the renewal stays invisible to the caller.
#[derive(Debug)]
pub struct SessionResolution {
    pub principal: String,
    pub renewed_access: Option<String>,
}

/// Per-request authentication state machine:
/// verify -> {resolved | renew-once -> {resolved | failed}} | failed.
///
/// Only an `Expired` access token with a usable refresh token triggers the
/// renewal branch, and at most one renewal attempt occurs per request.
pub struct SessionGuard {
    tokens: Arc<TokenService>,
    identity: Arc<dyn IdentityStore>,
    access_ttl: Duration,
}

impl SessionGuard {
    pub fn new(
        tokens: Arc<TokenService>,
        identity: Arc<dyn IdentityStore>,
        access_ttl: Duration,
    ) -> Self {
        Self {
            tokens,
            identity,
            access_ttl,
        }
    }

    pub async fn resolve(
        &self,
        access: Option<&str>,
        refresh: Option<&str>,
    ) -> Result<SessionResolution> {
        let access = access.ok_or(AppError::Unauthenticated)?;

        let (principal, renewed_access) = match self.tokens.verify(access) {
            Ok(principal) => (principal, None),
            Err(TokenError::Expired) => self.renew_once(refresh)?,
            Err(_) => return Err(AppError::Unauthenticated),
        };

        // The token may outlive the account it names.
        if self
            .identity
            .find_by_principal(&principal)
            .await?
            .is_none()
        {
            return Err(AppError::Unauthenticated);
        }

        Ok(SessionResolution {
            principal,
            renewed_access,
        })
    }

    /// Single renewal attempt: mint a fresh access token from the refresh
    /// token's subject and re-verify it exactly once. Any failure here is
    /// terminal; there is no further loop.
    fn renew_once(&self, refresh: Option<&str>) -> Result<(String, Option<String>)> {
        let refresh = refresh.ok_or(AppError::SessionExpired)?;
        let subject = self
            .tokens
            .verify(refresh)
            .map_err(|_| AppError::SessionExpired)?;

        let fresh = self.tokens.issue(&subject, self.access_ttl)?;
        tracing::debug!(principal = %subject, "access token silently renewed");

        match self.tokens.verify(&fresh) {
            Ok(principal) => Ok((principal, Some(fresh))),
            Err(TokenError::Expired) => Err(AppError::SessionExpired),
            Err(_) => Err(AppError::Unauthenticated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashSet;

    use crate::models::{NewUser, UserRecord};

    struct FakeIdentity {
        known: HashSet<String>,
    }

    impl FakeIdentity {
        fn with(users: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                known: users.iter().map(|u| u.to_string()).collect(),
            })
        }
    }

    #[async_trait]
    impl IdentityStore for FakeIdentity {
        async fn find_by_principal(&self, username: &str) -> Result<Option<UserRecord>> {
            Ok(self.known.contains(username).then(|| UserRecord {
                id: uuid::Uuid::new_v4(),
                username: username.to_string(),
                password_hash: String::new(),
                profession: "plumber".into(),
                address: String::new(),
                pincode: String::new(),
                contact_hash: String::new(),
                email: String::new(),
                latitude: None,
                longitude: None,
                created_at: Utc::now(),
            }))
        }

        async fn insert(&self, _user: NewUser) -> Result<UserRecord> {
            unimplemented!("not used by guard tests")
        }
    }

    fn guard_with(identity: Arc<FakeIdentity>, access_ttl: Duration) -> (SessionGuard, Arc<TokenService>) {
        let tokens = Arc::new(TokenService::new("guard-test-secret"));
        (
            SessionGuard::new(tokens.clone(), identity, access_ttl),
            tokens,
        )
    }

    #[tokio::test]
    async fn valid_access_token_resolves_without_renewal() {
        let (guard, tokens) = guard_with(FakeIdentity::with(&["alice"]), Duration::minutes(30));
        let access = tokens.issue("alice", Duration::minutes(30)).unwrap();

        let res = guard.resolve(Some(&access), None).await.unwrap();
        assert_eq!(res.principal, "alice");
        assert!(res.renewed_access.is_none());
    }

    #[tokio::test]
    async fn missing_access_token_is_unauthenticated() {
        let (guard, _) = guard_with(FakeIdentity::with(&["alice"]), Duration::minutes(30));
        assert!(matches!(
            guard.resolve(None, None).await.unwrap_err(),
            AppError::Unauthenticated
        ));
    }

    #[tokio::test]
    async fn expired_access_with_valid_refresh_renews_silently() {
        let (guard, tokens) = guard_with(FakeIdentity::with(&["alice"]), Duration::minutes(30));
        let stale = tokens.issue("alice", Duration::seconds(-60)).unwrap();
        let refresh = tokens.issue("alice", Duration::days(365)).unwrap();

        let res = guard.resolve(Some(&stale), Some(&refresh)).await.unwrap();
        assert_eq!(res.principal, "alice");
        let renewed = res.renewed_access.expect("renewal side effect");
        assert_eq!(tokens.verify(&renewed).unwrap(), "alice");
    }

    #[tokio::test]
    async fn expired_access_without_refresh_is_session_expired() {
        let (guard, tokens) = guard_with(FakeIdentity::with(&["alice"]), Duration::minutes(30));
        let stale = tokens.issue("alice", Duration::seconds(-60)).unwrap();

        assert!(matches!(
            guard.resolve(Some(&stale), None).await.unwrap_err(),
            AppError::SessionExpired
        ));
    }

    #[tokio::test]
    async fn both_tokens_expired_is_session_expired() {
        let (guard, tokens) = guard_with(FakeIdentity::with(&["alice"]), Duration::minutes(30));
        let stale = tokens.issue("alice", Duration::seconds(-60)).unwrap();
        let dead_refresh = tokens.issue("alice", Duration::seconds(-60)).unwrap();

        assert!(matches!(
            guard
                .resolve(Some(&stale), Some(&dead_refresh))
                .await
                .unwrap_err(),
            AppError::SessionExpired
        ));
    }

    #[tokio::test]
    async fn invalid_signature_never_triggers_renewal() {
        let (guard, tokens) = guard_with(FakeIdentity::with(&["alice"]), Duration::minutes(30));
        let forged = TokenService::new("someone-elses-secret")
            .issue("alice", Duration::minutes(30))
            .unwrap();
        let refresh = tokens.issue("alice", Duration::days(365)).unwrap();

        // A valid refresh token must not rescue a non-expiry failure.
        assert!(matches!(
            guard.resolve(Some(&forged), Some(&refresh)).await.unwrap_err(),
            AppError::Unauthenticated
        ));
    }

    #[tokio::test]
    async fn renewal_happens_at_most_once() {
        // Guard configured so the renewed token is itself already expired:
        // the single retry must fail terminally instead of looping.
        let (guard, tokens) = guard_with(FakeIdentity::with(&["alice"]), Duration::seconds(-1));
        let stale = tokens.issue("alice", Duration::seconds(-60)).unwrap();
        let refresh = tokens.issue("alice", Duration::days(365)).unwrap();

        assert!(matches!(
            guard.resolve(Some(&stale), Some(&refresh)).await.unwrap_err(),
            AppError::SessionExpired
        ));
    }

    #[tokio::test]
    async fn vanished_account_is_unauthenticated() {
        let (guard, tokens) = guard_with(FakeIdentity::with(&[]), Duration::minutes(30));
        let access = tokens.issue("ghost", Duration::minutes(30)).unwrap();

        assert!(matches!(
            guard.resolve(Some(&access), None).await.unwrap_err(),
            AppError::Unauthenticated
        ));
    }
}
