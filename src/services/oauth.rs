// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spotify OAuth lifecycle: authorization requests, code exchange and
//! lazy token refresh.

use crate::config::{Config, SPOTIFY_SCOPES};
use crate::db::Database;
use crate::error::AppError;
use crate::models::User;
use crate::services::spotify::SpotifyApi;
use crate::services::state_store::{generate_state, StateStore};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Per-user mutexes serializing refreshes within this process.
pub type RefreshLocks = Arc<DashMap<i64, Arc<Mutex<()>>>>;

/// URL the user is sent to, plus the state bound to them.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AuthorizationRequest {
    pub auth_url: String,
    pub state: String,
}

/// Owns every write to a user's Spotify credentials.
#[derive(Clone)]
pub struct OAuthManager {
    spotify: Arc<dyn SpotifyApi>,
    states: Arc<dyn StateStore>,
    db: Database,
    client_id: String,
    redirect_uri: String,
    accounts_url: String,
    refresh_locks: RefreshLocks,
}

impl OAuthManager {
    pub fn new(
        config: &Config,
        spotify: Arc<dyn SpotifyApi>,
        states: Arc<dyn StateStore>,
        db: Database,
    ) -> Self {
        Self {
            spotify,
            states,
            db,
            client_id: config.spotify_client_id.clone(),
            redirect_uri: config.spotify_redirect_uri.clone(),
            accounts_url: config.spotify_accounts_url.trim_end_matches('/').to_string(),
            refresh_locks: Arc::new(DashMap::new()),
        }
    }

    // ─── Authorization Code Flow ─────────────────────────────────────────────

    /// Issue a fresh state for `user_id` and build the provider URL.
    pub async fn begin_authorization(
        &self,
        user_id: i64,
    ) -> Result<AuthorizationRequest, AppError> {
        let state = generate_state()?;
        self.states.put(&state, user_id).await?;

        let auth_url = format!(
            "{}/authorize?\
             client_id={}&\
             response_type=code&\
             redirect_uri={}&\
             state={}&\
             scope={}",
            self.accounts_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            state,
            urlencoding::encode(SPOTIFY_SCOPES),
        );

        tracing::info!(user_id, "Issued Spotify authorization request");
        Ok(AuthorizationRequest { auth_url, state })
    }

    /// Consume `state` and store the tokens obtained for `code`.
    ///
    /// Returns the user the state was bound to. The state is spent even if
    /// the exchange fails; stored credentials only change on success.
    pub async fn complete_authorization(&self, code: &str, state: &str) -> Result<i64, AppError> {
        let user_id = self.take_state(state).await?;

        let grant = self.spotify.exchange_code(code).await.map_err(|e| {
            tracing::error!(user_id, error = %e, "Spotify code exchange failed");
            e
        })?;

        let expires_at = expiry_after(grant.expires_in)?;
        self.db
            .set_spotify_tokens(
                user_id,
                &grant.access_token,
                grant.refresh_token.as_deref(),
                expires_at,
            )
            .await?;

        tracing::info!(user_id, %expires_at, "Spotify account connected");
        Ok(user_id)
    }

    /// Consume `state` without exchanging a code (provider reported an error).
    pub async fn take_state(&self, state: &str) -> Result<i64, AppError> {
        self.states.take(state).await?.ok_or_else(|| {
            tracing::warn!("Unknown, expired or reused OAuth state");
            AppError::InvalidState
        })
    }

    // ─── Token Management ────────────────────────────────────────────────────

    /// Return a usable access token for `user_id`, refreshing it if expired.
    pub async fn valid_access_token(&self, user_id: i64) -> Result<String, AppError> {
        let user = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))?;
        self.ensure_token_valid(&user).await
    }

    /// Return `user`'s access token, refreshing it first if it has expired.
    ///
    /// Provider failures leave stored credentials untouched.
    pub async fn ensure_token_valid(&self, user: &User) -> Result<String, AppError> {
        let (Some(access_token), Some(expires_at)) = (
            user.spotify_access_token.as_ref(),
            user.spotify_token_expiry,
        ) else {
            return Err(AppError::NotAuthorized(
                "Spotify account not connected".to_string(),
            ));
        };

        if Utc::now() < expires_at {
            return Ok(access_token.clone());
        }

        let lock = self
            .refresh_locks
            .entry(user.id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let result = {
            let _guard = lock.lock().await;
            self.refresh_locked(user.id).await
        };

        // Drop the entry once nobody else holds or waits on it.
        self.refresh_locks
            .remove_if(&user.id, |_, held| Arc::strong_count(held) == 2);
        result
    }

    /// Number of users with a refresh lock currently allocated.
    pub fn refresh_lock_count(&self) -> usize {
        self.refresh_locks.len()
    }

    async fn refresh_locked(&self, user_id: i64) -> Result<String, AppError> {
        // Another task may have refreshed while we waited.
        let current = self
            .db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))?;
        if let (Some(token), Some(expiry)) = (
            current.spotify_access_token.as_ref(),
            current.spotify_token_expiry,
        ) {
            if Utc::now() < expiry {
                return Ok(token.clone());
            }
        }

        let Some(refresh_token) = current.spotify_refresh_token.as_deref() else {
            return Err(AppError::NotAuthorized(
                "Spotify session expired".to_string(),
            ));
        };

        tracing::info!(user_id, "Spotify access token expired, refreshing");

        let grant = self.spotify.refresh_token(refresh_token).await.map_err(|e| {
            tracing::warn!(user_id, error = %e, "Spotify token refresh failed");
            e
        })?;

        let new_expiry = expiry_after(grant.expires_in)?;
        self.db
            .set_spotify_tokens(
                user_id,
                &grant.access_token,
                grant.refresh_token.as_deref(),
                new_expiry,
            )
            .await?;

        tracing::info!(user_id, "Spotify token refreshed");
        Ok(grant.access_token)
    }
}

/// Absolute expiry for a grant valid for `expires_in` seconds from now.
fn expiry_after(expires_in: i64) -> Result<DateTime<Utc>, AppError> {
    Duration::try_seconds(expires_in)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
        .ok_or_else(|| {
            AppError::ProviderError(format!("Token lifetime out of range: {}s", expires_in))
        })
}
