// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use chrono::{DateTime, Utc};

/// User account row, including Spotify credentials.
///
/// Access token and expiry are written together; the refresh token is
/// absent only for accounts that never completed authorization.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub spotify_access_token: Option<String>,
    pub spotify_refresh_token: Option<String>,
    pub spotify_token_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Whether the account has ever completed the Spotify authorization flow.
    pub fn spotify_connected(&self) -> bool {
        self.spotify_access_token.is_some() && self.spotify_token_expiry.is_some()
    }
}

/// Token bundle returned by the provider for a code exchange or refresh.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: String,
    /// Providers may omit this on refresh, meaning the old one stays valid.
    pub refresh_token: Option<String>,
    /// Lifetime in seconds
    pub expires_in: i64,
}
