// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account registration and login.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use axum::{
    extract::{FromRequest, Request, State},
    http::{header, StatusCode},
    routing::post,
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::create_jwt;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

// ─── Registration ────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    password: String,
}

/// Create an account and log it in. Duplicate emails are rejected with 409.
async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>)> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let email = req.email.trim().to_lowercase();
    let password_hash = hash_password(req.password).await?;
    let user = state.db.create_user(&email, &password_hash).await?;

    let response = issue_session(&state, user.id)?;
    tracing::info!(user_id = user.id, "User registered");
    Ok((StatusCode::CREATED, Json(response)))
}

// ─── Login ───────────────────────────────────────────────────

/// Login credentials. `username` is accepted as an alias for `email` so
/// OAuth2 password-style form posts work unchanged.
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "username")]
    email: String,
    password: String,
}

/// Session token response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Extracts [`LoginRequest`] from either a JSON or a urlencoded form body.
pub struct LoginForm(LoginRequest);

impl<S> FromRequest<S> for LoginForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        let body = if is_form {
            Form::<LoginRequest>::from_request(req, state)
                .await
                .map(|Form(body)| body)
                .map_err(|e| AppError::BadRequest(e.body_text()))?
        } else {
            Json::<LoginRequest>::from_request(req, state)
                .await
                .map(|Json(body)| body)
                .map_err(|e| AppError::BadRequest(e.body_text()))?
        };
        Ok(LoginForm(body))
    }
}

/// Exchange email and password for a session JWT.
async fn login(
    State(state): State<Arc<AppState>>,
    LoginForm(req): LoginForm,
) -> Result<Json<TokenResponse>> {
    let email = req.email.trim().to_lowercase();

    let Some(user) = state.db.get_user_by_email(&email).await? else {
        tracing::info!("Login attempt for unknown email");
        return Err(AppError::Unauthorized);
    };

    if !verify_password(req.password, user.password_hash.clone()).await? {
        tracing::info!(user_id = user.id, "Login attempt with wrong password");
        return Err(AppError::Unauthorized);
    }

    let response = issue_session(&state, user.id)?;
    tracing::info!(user_id = user.id, "User logged in");
    Ok(Json(response))
}

fn issue_session(state: &AppState, user_id: i64) -> Result<TokenResponse> {
    let access_token = create_jwt(
        user_id,
        &state.config.jwt_signing_key,
        state.config.session_ttl_minutes,
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    Ok(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    })
}

// ─── Password Hashing ────────────────────────────────────────

/// Hash a password with Argon2id into a PHC string.
///
/// Hashing is CPU-bound, so it runs on the blocking pool.
pub async fn hash_password(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))
    })
    .await
    .map_err(|e| AppError::Internal(e.into()))?
}

/// Check a password against a stored PHC string.
pub async fn verify_password(password: String, stored_hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&stored_hash).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Stored password hash is malformed: {}", e))
        })?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| AppError::Internal(e.into()))?
}
