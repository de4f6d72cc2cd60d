// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Mood recording and aggregation routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{MoodRecord, MoodVector, NewMoodRecord};
use crate::services::MoodStatistics;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Default aggregation window: one day.
pub const DEFAULT_WINDOW_MINUTES: i64 = 24 * 60;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/mood/record", post(record_mood))
        .route("/mood/statistics", get(statistics))
        .route("/mood/current", get(current_mood))
}

// ─── Manual Entry ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RecordMoodRequest {
    #[serde(flatten)]
    mood: MoodVector,
    #[serde(default)]
    notes: Option<String>,
}

async fn record_mood(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<RecordMoodRequest>,
) -> Result<(StatusCode, Json<MoodRecord>)> {
    if !req.mood.is_valid() {
        return Err(AppError::BadRequest(
            "Mood components must be between 0 and 1".to_string(),
        ));
    }

    let record = state
        .db
        .insert_mood_record(&NewMoodRecord::manual(auth.user_id, req.mood, req.notes))
        .await?;

    tracing::info!(user_id = auth.user_id, record_id = record.id, "Mood recorded");
    Ok((StatusCode::CREATED, Json(record)))
}

// ─── Statistics ──────────────────────────────────────────────

#[derive(Deserialize)]
pub struct StatisticsQuery {
    #[serde(default = "default_days")]
    days: i64,
}

fn default_days() -> i64 {
    7
}

async fn statistics(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<StatisticsQuery>,
) -> Result<Json<MoodStatistics>> {
    if !(1..=30).contains(&query.days) {
        return Err(AppError::BadRequest(
            "days must be between 1 and 30".to_string(),
        ));
    }

    let stats = state.aggregator.statistics(auth.user_id, query.days).await?;
    Ok(Json(stats))
}

// ─── Current Mood ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CurrentMoodQuery {
    #[serde(default = "default_window_minutes")]
    window_minutes: i64,
    decay_rate: Option<f64>,
}

fn default_window_minutes() -> i64 {
    DEFAULT_WINDOW_MINUTES
}

/// Decayed mood aggregate.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CurrentMoodResponse {
    pub mood: MoodVector,
    pub window_minutes: i64,
    pub decay_rate: f64,
    pub computed_at: String,
}

async fn current_mood(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<CurrentMoodQuery>,
) -> Result<Json<CurrentMoodResponse>> {
    let decay_rate = query.decay_rate.unwrap_or(state.config.mood_decay_rate);
    let window = Duration::try_minutes(query.window_minutes)
        .ok_or_else(|| AppError::BadRequest("window_minutes is too large".to_string()))?;
    let now = Utc::now();

    let mood = state
        .aggregator
        .compute_current_mood_at(auth.user_id, window, decay_rate, now)
        .await?;

    Ok(Json(CurrentMoodResponse {
        mood,
        window_minutes: query.window_minutes,
        decay_rate,
        computed_at: format_utc_rfc3339(now),
    }))
}
