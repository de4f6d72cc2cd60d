// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honoured for local development.

use std::env;
use std::time::Duration;

/// Default Spotify endpoints. Overridable so tests can run against a stub.
pub const SPOTIFY_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
pub const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";

/// Scopes requested during authorization.
pub const SPOTIFY_SCOPES: &str = "user-read-recently-played user-modify-playback-state";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Spotify OAuth ---
    /// Spotify OAuth client ID (public)
    pub spotify_client_id: String,
    /// Spotify OAuth client secret
    pub spotify_client_secret: String,
    /// Callback registered with Spotify
    pub spotify_redirect_uri: String,
    pub spotify_accounts_url: String,
    pub spotify_api_url: String,

    // --- Upstream services ---
    /// Base URL of the mood classifier / recommender
    pub ai_api_url: String,
    pub lyrics_primary_url: String,
    /// `None` disables the fallback lyrics source
    pub lyrics_fallback_url: Option<String>,
    /// Per-call timeout for every outbound HTTP request
    pub http_timeout: Duration,

    // --- Storage ---
    pub database_url: String,
    /// Shared OAuth state store; in-process map when unset
    pub redis_url: Option<String>,

    // --- Server ---
    /// Frontend URL for CORS and OAuth completion redirects
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    pub session_ttl_minutes: i64,
    pub oauth_state_ttl: Duration,

    // --- Mood ---
    /// Default decay rate (per minute) for the current-mood aggregate
    pub mood_decay_rate: f64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let lyrics_fallback_url = match env::var("LYRICS_FALLBACK_URL") {
            Ok(url) if url.trim().is_empty() => None,
            Ok(url) => Some(url),
            Err(_) => Some("https://lrclib.net/api".to_string()),
        };

        Ok(Self {
            spotify_client_id: require("SPOTIFY_CLIENT_ID")?,
            spotify_client_secret: require("SPOTIFY_CLIENT_SECRET")?.trim().to_string(),
            spotify_redirect_uri: env::var("SPOTIFY_REDIRECT_URI").unwrap_or_else(|_| {
                "http://localhost:8080/api/v1/spotify/callback".to_string()
            }),
            spotify_accounts_url: env::var("SPOTIFY_ACCOUNTS_URL")
                .unwrap_or_else(|_| SPOTIFY_ACCOUNTS_URL.to_string()),
            spotify_api_url: env::var("SPOTIFY_API_URL")
                .unwrap_or_else(|_| SPOTIFY_API_URL.to_string()),
            ai_api_url: env::var("AI_API_URL")
                .unwrap_or_else(|_| "http://localhost:5000".to_string()),
            lyrics_primary_url: env::var("LYRICS_PRIMARY_URL")
                .unwrap_or_else(|_| "https://api.lyrics.ovh/v1".to_string()),
            lyrics_fallback_url,
            http_timeout: Duration::from_secs(parse_or("HTTP_TIMEOUT_SECS", 10)),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:moodtrack.db".to_string()),
            redis_url: env::var("REDIS_URL").ok().filter(|u| !u.trim().is_empty()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:4200".to_string()),
            port: parse_or("PORT", 8080),
            jwt_signing_key: require("JWT_SIGNING_KEY")?.into_bytes(),
            session_ttl_minutes: parse_or("SESSION_TTL_MINUTES", 60 * 24 * 7),
            oauth_state_ttl: Duration::from_secs(parse_or("OAUTH_STATE_TTL_SECS", 600)),
            mood_decay_rate: parse_or("MOOD_DECAY_RATE", 0.01),
        })
    }

    /// Deterministic config for tests.
    pub fn test_default() -> Self {
        Self {
            spotify_client_id: "test_client_id".to_string(),
            spotify_client_secret: "test_secret".to_string(),
            spotify_redirect_uri: "http://localhost:8080/api/v1/spotify/callback".to_string(),
            spotify_accounts_url: SPOTIFY_ACCOUNTS_URL.to_string(),
            spotify_api_url: SPOTIFY_API_URL.to_string(),
            ai_api_url: "http://localhost:5000".to_string(),
            lyrics_primary_url: "https://api.lyrics.ovh/v1".to_string(),
            lyrics_fallback_url: None,
            http_timeout: Duration::from_secs(5),
            database_url: "sqlite::memory:".to_string(),
            redis_url: None,
            frontend_url: "http://localhost:4200".to_string(),
            port: 8080,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            session_ttl_minutes: 60,
            oauth_state_ttl: Duration::from_secs(600),
            mood_decay_rate: 0.01,
        }
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
