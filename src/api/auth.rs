use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::{
    auth_cookie, removal_cookie, CurrentPrincipal, ACCESS_COOKIE, REFRESH_COOKIE,
};
use crate::models::{NewUser, UserRecord};
use crate::security::password;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", get(refresh))
        .route("/auth/logout", post(logout))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(length(min = 6))]
    pub password: String,
    #[validate(length(min = 1))]
    pub profession: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub pincode: String,
    #[serde(default)]
    pub contact_number: String,
    #[validate(email)]
    pub email: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub username: String,
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let password_hash = password::hash_password(&payload.password)?;
    // Contact numbers are stored hashed, like passwords: the service only
    // ever needs to confirm one, never to display it.
    let contact_hash = password::hash_password(&payload.contact_number)?;

    let record = state
        .identity
        .insert(NewUser {
            username: payload.username,
            password_hash,
            profession: payload.profession,
            address: payload.address,
            pincode: payload.pincode,
            contact_hash,
            email: payload.email,
            latitude: payload.latitude,
            longitude: payload.longitude,
        })
        .await?;

    tracing::info!(username = %record.username, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: record.id,
            username: record.username,
        }),
    ))
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<MessageResponse>)> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user = state
        .identity
        .find_by_principal(&payload.username)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    password::verify_password(&payload.password, &user.password_hash)?;

    let jwt = &state.config.jwt;
    let access = state
        .tokens
        .issue(&user.username, Duration::minutes(jwt.access_ttl_minutes))?;
    let refresh = state
        .tokens
        .issue(&user.username, Duration::days(jwt.refresh_ttl_days))?;

    let jar = jar
        .add(auth_cookie(
            ACCESS_COOKIE,
            format!("Bearer {access}"),
            jwt.access_ttl_minutes * 60,
        ))
        .add(auth_cookie(
            REFRESH_COOKIE,
            refresh,
            jwt.refresh_ttl_days * 24 * 3600,
        ));

    tracing::info!(username = %user.username, "user logged in");

    Ok((
        jar,
        Json(MessageResponse {
            message: "User logged in successfully".into(),
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Explicit renewal from the refresh cookie. The silent in-request renewal
/// in the session middleware covers the common path; this endpoint lets a
/// client refresh proactively.
async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<RefreshResponse>)> {
    let refresh = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(AppError::SessionExpired)?;
    let subject = state
        .tokens
        .verify(&refresh)
        .map_err(|_| AppError::SessionExpired)?;

    let jwt = &state.config.jwt;
    let access = state
        .tokens
        .issue(&subject, Duration::minutes(jwt.access_ttl_minutes))?;

    let jar = jar.add(auth_cookie(
        ACCESS_COOKIE,
        format!("Bearer {access}"),
        jwt.access_ttl_minutes * 60,
    ));

    Ok((jar, Json(RefreshResponse {
        access_token: access,
    })))
}

async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    let jar = jar
        .remove(removal_cookie(ACCESS_COOKIE))
        .remove(removal_cookie(REFRESH_COOKIE));
    (
        jar,
        Json(MessageResponse {
            message: "Successfully logged out".into(),
        }),
    )
}

/// Protected probe: proves the session resolves to a live account.
pub async fn me(
    State(state): State<AppState>,
    Extension(principal): Extension<CurrentPrincipal>,
) -> Result<Json<UserRecord>> {
    let user = state
        .identity
        .find_by_principal(&principal.0)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    Ok(Json(user))
}
