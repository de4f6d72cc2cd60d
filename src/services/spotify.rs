// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spotify Web API client.
//!
//! Handles:
//! - Authorization-code exchange and token refresh
//! - Recently-played history, normalized into [`TrackPlay`]
//! - Track search and queueing
//!
//! Raw provider payloads never leave this module.

use crate::config::Config;
use crate::error::AppError;
use crate::models::{TokenGrant, TrackPlay};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Provider operations used by the OAuth manager and the ingestion pipeline.
#[async_trait]
pub trait SpotifyApi: Send + Sync {
    /// Exchange an authorization code for a token bundle.
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AppError>;

    /// Obtain a fresh access token from a refresh token.
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, AppError>;

    /// Recently played tracks, newest first, optionally bounded below by `after`.
    async fn recently_played(
        &self,
        access_token: &str,
        limit: u32,
        after: Option<DateTime<Utc>>,
    ) -> Result<Vec<TrackPlay>, AppError>;

    /// URI of the best match for a title/artist pair, if any.
    async fn search_track(
        &self,
        access_token: &str,
        title: &str,
        artist: &str,
    ) -> Result<Option<String>, AppError>;

    /// Append a track to the user's playback queue.
    async fn add_to_queue(&self, access_token: &str, track_uri: &str) -> Result<(), AppError>;
}

/// Spotify API client.
#[derive(Clone)]
pub struct SpotifyClient {
    http: reqwest::Client,
    accounts_url: String,
    api_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl SpotifyClient {
    /// Create a new Spotify client with OAuth credentials.
    pub fn new(config: &Config, http: reqwest::Client) -> Self {
        Self {
            http,
            accounts_url: config.spotify_accounts_url.trim_end_matches('/').to_string(),
            api_url: config.spotify_api_url.trim_end_matches('/').to_string(),
            client_id: config.spotify_client_id.clone(),
            client_secret: config.spotify_client_secret.clone(),
            redirect_uri: config.spotify_redirect_uri.clone(),
        }
    }

    /// POST to the token endpoint with the given grant parameters.
    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenGrant, AppError> {
        let mut form = vec![
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        form.extend_from_slice(params);

        let response = self
            .http
            .post(format!("{}/api/token", self.accounts_url))
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::ProviderError(format!("Token request failed: {}", e)))?;

        let body: TokenResponse = check_response_json(response).await?;
        Ok(TokenGrant {
            access_token: body.access_token,
            refresh_token: body.refresh_token.filter(|t| !t.is_empty()),
            expires_in: body.expires_in,
        })
    }
}

#[async_trait]
impl SpotifyApi for SpotifyClient {
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AppError> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ])
        .await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, AppError> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn recently_played(
        &self,
        access_token: &str,
        limit: u32,
        after: Option<DateTime<Utc>>,
    ) -> Result<Vec<TrackPlay>, AppError> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(after) = after {
            query.push(("after", after.timestamp_millis().to_string()));
        }

        let response = self
            .http
            .get(format!("{}/me/player/recently-played", self.api_url))
            .bearer_auth(access_token)
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::ProviderError(e.to_string()))?;

        let body: RecentlyPlayedResponse = check_response_json(response).await?;
        body.items.into_iter().map(normalize_play).collect()
    }

    async fn search_track(
        &self,
        access_token: &str,
        title: &str,
        artist: &str,
    ) -> Result<Option<String>, AppError> {
        let q = format!("track:{} artist:{}", title, artist);
        let response = self
            .http
            .get(format!("{}/search", self.api_url))
            .bearer_auth(access_token)
            .query(&[("q", q.as_str()), ("type", "track"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| AppError::ProviderError(e.to_string()))?;

        let body: SearchResponse = check_response_json(response).await?;
        Ok(body
            .tracks
            .and_then(|t| t.items.into_iter().next())
            .and_then(|track| track.uri))
    }

    async fn add_to_queue(&self, access_token: &str, track_uri: &str) -> Result<(), AppError> {
        let response = self
            .http
            .post(format!("{}/me/player/queue", self.api_url))
            .bearer_auth(access_token)
            .query(&[("uri", track_uri)])
            .header(reqwest::header::CONTENT_LENGTH, 0)
            .send()
            .await
            .map_err(|e| AppError::ProviderError(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(
                "No active Spotify device. Start playback on a device first.".to_string(),
            ));
        }
        check_response(response).await
    }
}

/// Check response status and return error if not successful.
async fn check_response(response: reqwest::Response) -> Result<(), AppError> {
    if response.status().is_success() {
        return Ok(());
    }
    Err(status_error(response).await)
}

/// Check response and parse JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    if !response.status().is_success() {
        return Err(status_error(response).await);
    }

    response
        .json()
        .await
        .map_err(|e| AppError::ProviderError(format!("JSON parse error: {}", e)))
}

async fn status_error(response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if status.as_u16() == 429 {
        tracing::warn!("Spotify rate limit hit (429)");
        return AppError::ProviderError("Spotify rate limit exceeded".to_string());
    }

    tracing::warn!(status = %status, body = %body, "Spotify request failed");
    AppError::ProviderError(format!("Spotify HTTP {}: {}", status, body))
}

/// Map one raw history item onto the fixed [`TrackPlay`] shape.
fn normalize_play(item: PlayHistoryItem) -> Result<TrackPlay, AppError> {
    let played_at = DateTime::parse_from_rfc3339(&item.played_at)
        .map_err(|e| {
            AppError::ProviderError(format!("Invalid played_at '{}': {}", item.played_at, e))
        })?
        .with_timezone(&Utc);

    let track = item.track;
    let artist = track
        .artists
        .into_iter()
        .filter_map(|a| a.name)
        .collect::<Vec<_>>()
        .join(", ");

    Ok(TrackPlay {
        id: track.id.unwrap_or_default(),
        name: track.name.unwrap_or_default(),
        artist,
        album: track.album.and_then(|a| a.name).unwrap_or_default(),
        uri: track.uri.unwrap_or_default(),
        played_at,
        preview_url: track.preview_url,
    })
}

// ─── Raw provider payloads ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct RecentlyPlayedResponse {
    #[serde(default)]
    items: Vec<PlayHistoryItem>,
}

#[derive(Debug, Deserialize)]
struct PlayHistoryItem {
    track: RawTrack,
    played_at: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawTrack {
    id: Option<String>,
    name: Option<String>,
    #[serde(default)]
    artists: Vec<RawArtist>,
    album: Option<RawAlbum>,
    uri: Option<String>,
    preview_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawArtist {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAlbum {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Option<SearchTracks>,
}

#[derive(Debug, Deserialize)]
struct SearchTracks {
    #[serde(default)]
    items: Vec<RawTrack>,
}
