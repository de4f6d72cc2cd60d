// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile routes for the authenticated user.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::User;
use crate::routes::auth::hash_password;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/users/me", get(get_me).put(update_me))
}

/// Current user response. Tokens never leave the server.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: i64,
    pub email: String,
    pub spotify_connected: bool,
    pub spotify_token_expiry: Option<String>,
    pub created_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            spotify_connected: user.spotify_connected(),
            spotify_token_expiry: user.spotify_token_expiry.map(format_utc_rfc3339),
            created_at: format_utc_rfc3339(user.created_at),
        }
    }
}

/// Load the authenticated user's row.
pub(crate) async fn load_user(state: &AppState, user_id: i64) -> Result<User> {
    state
        .db
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
}

/// Get current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let user = load_user(&state, auth.user_id).await?;
    Ok(Json(UserResponse::from(&user)))
}

#[derive(Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email)]
    email: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    password: Option<String>,
}

/// Update email and/or password.
async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let email = req.email.map(|e| e.trim().to_lowercase());
    let password_hash = match req.password {
        Some(password) => Some(hash_password(password).await?),
        None => None,
    };

    state
        .db
        .update_user_profile(auth.user_id, email.as_deref(), password_hash.as_deref())
        .await?;

    tracing::info!(user_id = auth.user_id, "User profile updated");
    let user = load_user(&state, auth.user_id).await?;
    Ok(Json(UserResponse::from(&user)))
}
