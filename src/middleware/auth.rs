use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::error::{AppError, Result};
use crate::state::AppState;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Identity resolved by the session guard, available to handlers through
/// request extensions.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub String);

/// The access cookie value conventionally carries a `Bearer ` prefix.
pub fn strip_bearer(value: &str) -> &str {
    value.strip_prefix("Bearer ").unwrap_or(value)
}

pub fn auth_cookie(name: &'static str, value: String, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").build()
}

/// Session middleware for every protected route: pulls both credentials
/// from cookies, runs the guard (which may renew the access token once),
/// and attaches a renewed credential to the response so renewal stays
/// invisible to the caller.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let jar = CookieJar::from_headers(req.headers());
    let access = jar
        .get(ACCESS_COOKIE)
        .map(|c| strip_bearer(c.value()).to_string());
    let refresh = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string());

    let resolution = state
        .guard
        .resolve(access.as_deref(), refresh.as_deref())
        .await?;

    req.extensions_mut()
        .insert(CurrentPrincipal(resolution.principal));

    let mut response = next.run(req).await;

    if let Some(token) = resolution.renewed_access {
        let max_age = state.config.jwt.access_ttl_minutes * 60;
        let cookie = auth_cookie(ACCESS_COOKIE, format!("Bearer {token}"), max_age);
        let value = HeaderValue::from_str(&cookie.to_string())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid cookie header: {e}")))?;
        response.headers_mut().append(header::SET_COOKIE, value);
    }

    Ok(response)
}
