// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spotify routes: account linking, listening history and mood analysis.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::TrackPlay;
use crate::routes::users::load_user;
use crate::services::oauth::AuthorizationRequest;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;

/// Largest page the provider returns for recently played tracks.
const MAX_HISTORY_LIMIT: u32 = 50;

/// Routes reached by the provider's browser redirect.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/spotify/callback", get(auth_callback))
}

/// Routes that require a session.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/spotify/auth", get(auth_start))
        .route("/spotify/recent-tracks", get(recent_tracks))
        .route("/spotify/analyze", post(analyze))
        .route("/spotify/queue-song", post(queue_song))
}

// ─── Authorization ───────────────────────────────────────────

/// Start OAuth flow - return the Spotify authorization URL.
async fn auth_start(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<AuthorizationRequest>> {
    let request = state.oauth.begin_authorization(auth.user_id).await?;
    Ok(Json(request))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    state: String,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code for tokens, then return to the frontend.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect> {
    let home = format!("{}/main/home", state.config.frontend_url);

    // Check for OAuth errors. The state is spent either way.
    if let Some(error) = params.error {
        let user_id = state.oauth.take_state(&params.state).await?;
        tracing::warn!(user_id, error = %error, "OAuth error from Spotify");
        let redirect = format!("{}?spotify_error={}", home, urlencoding::encode(&error));
        return Ok(Redirect::temporary(&redirect));
    }

    let code = params
        .code
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    let user_id = state
        .oauth
        .complete_authorization(&code, &params.state)
        .await?;
    tracing::info!(user_id, "OAuth successful, redirecting to frontend");

    Ok(Redirect::temporary(&home))
}

// ─── Listening History ───────────────────────────────────────

#[derive(Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    limit: u32,
    #[serde(default = "default_time_limit_minutes")]
    time_limit_minutes: i64,
}

fn default_history_limit() -> u32 {
    20
}

fn default_time_limit_minutes() -> i64 {
    30
}

/// One recently played track.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RecentTrack {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub album: String,
    pub uri: String,
    pub played_at: String,
    pub preview_url: Option<String>,
}

impl From<TrackPlay> for RecentTrack {
    fn from(play: TrackPlay) -> Self {
        Self {
            id: play.id,
            name: play.name,
            artist: play.artist,
            album: play.album,
            uri: play.uri,
            played_at: format_utc_rfc3339(play.played_at),
            preview_url: play.preview_url,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RecentTracksResponse {
    pub tracks: Vec<RecentTrack>,
    pub count: usize,
}

fn check_limit(limit: u32) -> Result<()> {
    if limit == 0 || limit > MAX_HISTORY_LIMIT {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_HISTORY_LIMIT
        )));
    }
    Ok(())
}

/// A non-positive window means "no lower bound".
fn time_window(minutes: i64) -> Result<Option<Duration>> {
    if minutes <= 0 {
        return Ok(None);
    }
    Duration::try_minutes(minutes)
        .filter(|window| Utc::now().checked_sub_signed(*window).is_some())
        .map(Some)
        .ok_or_else(|| AppError::BadRequest("time_limit_minutes is too large".to_string()))
}

/// Recently played tracks within the time window.
async fn recent_tracks(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<RecentTracksResponse>> {
    check_limit(query.limit)?;
    let window = time_window(query.time_limit_minutes)?;
    let user = load_user(&state, auth.user_id).await?;

    let plays = state
        .ingest
        .fetch_recent_plays(&user, query.limit, window)
        .await?;

    let tracks: Vec<RecentTrack> = plays.into_iter().map(RecentTrack::from).collect();
    Ok(Json(RecentTracksResponse {
        count: tracks.len(),
        tracks,
    }))
}

// ─── Mood Analysis ───────────────────────────────────────────

#[derive(Deserialize)]
pub struct AnalyzeQuery {
    #[serde(default = "default_analyze_limit")]
    limit: u32,
    #[serde(default = "default_time_limit_minutes")]
    time_limit_minutes: i64,
    /// Run off the request path and answer 202 immediately.
    #[serde(default)]
    background: bool,
}

fn default_analyze_limit() -> u32 {
    10
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeAccepted {
    pub status: String,
}

/// Turn recent plays into mood records.
async fn analyze(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<AnalyzeQuery>,
) -> Result<Response> {
    check_limit(query.limit)?;
    let window = time_window(query.time_limit_minutes)?;
    let user = load_user(&state, auth.user_id).await?;

    if query.background {
        // Surface a missing connection now rather than only in the logs.
        if !user.spotify_connected() {
            return Err(AppError::NotAuthorized(
                "Spotify account not connected".to_string(),
            ));
        }
        tracing::info!(user_id = user.id, "Queueing background mood analysis");
        state.ingest.spawn_ingest(user, query.limit, window);
        let body = AnalyzeAccepted {
            status: "accepted".to_string(),
        };
        return Ok((StatusCode::ACCEPTED, Json(body)).into_response());
    }

    let report = state
        .ingest
        .ingest_recent_plays(&user, query.limit, window)
        .await?;
    Ok(Json(report).into_response())
}

// ─── Playback Queue ──────────────────────────────────────────

#[derive(Deserialize)]
pub struct QueueSongRequest {
    artist: String,
    title: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct QueueSongResponse {
    pub queued: bool,
    pub uri: String,
}

/// Look a song up and append it to the user's playback queue.
async fn queue_song(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<QueueSongRequest>,
) -> Result<Json<QueueSongResponse>> {
    let user = load_user(&state, auth.user_id).await?;
    let access_token = state.oauth.ensure_token_valid(&user).await?;

    let uri = state
        .spotify
        .search_track(&access_token, &req.title, &req.artist)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("No Spotify track for {} by {}", req.title, req.artist))
        })?;

    state.spotify.add_to_queue(&access_token, &uri).await?;
    tracing::info!(user_id = user.id, uri = %uri, "Track queued");

    Ok(Json(QueueSongResponse { queued: true, uri }))
}
