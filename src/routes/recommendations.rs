// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Song recommendations for a mood.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{MoodVector, RecommendedSong};
use crate::routes::mood::DEFAULT_WINDOW_MINUTES;
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Extension, Json, Router,
};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/recommendations", get(get_recommendations))
}

#[derive(Deserialize)]
pub struct RecommendationsQuery {
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default = "default_use_current_mood")]
    use_current_mood: bool,
    happy: Option<f64>,
    sad: Option<f64>,
    angry: Option<f64>,
    relaxed: Option<f64>,
}

fn default_limit() -> usize {
    5
}

fn default_use_current_mood() -> bool {
    true
}

impl RecommendationsQuery {
    /// Explicit mood from the query; all four components are required.
    fn explicit_mood(&self) -> Result<MoodVector> {
        let (Some(happy), Some(sad), Some(angry), Some(relaxed)) =
            (self.happy, self.sad, self.angry, self.relaxed)
        else {
            return Err(AppError::BadRequest(
                "happy, sad, angry and relaxed are required when use_current_mood is false"
                    .to_string(),
            ));
        };

        let mood = MoodVector::new(happy, sad, angry, relaxed);
        if !mood.is_valid() {
            return Err(AppError::BadRequest(
                "Mood components must be between 0 and 1".to_string(),
            ));
        }
        Ok(mood)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RecommendationsResponse {
    pub mood: MoodVector,
    pub songs: Vec<RecommendedSong>,
}

async fn get_recommendations(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<RecommendationsQuery>,
) -> Result<Json<RecommendationsResponse>> {
    if !(1..=10).contains(&query.limit) {
        return Err(AppError::BadRequest(
            "limit must be between 1 and 10".to_string(),
        ));
    }

    let mood = if query.use_current_mood {
        state
            .aggregator
            .compute_current_mood(
                auth.user_id,
                Duration::minutes(DEFAULT_WINDOW_MINUTES),
                state.config.mood_decay_rate,
            )
            .await?
    } else {
        query.explicit_mood()?
    };

    let songs = state
        .recommender
        .get_recommendations(&mood, query.limit)
        .await?;

    tracing::debug!(user_id = auth.user_id, count = songs.len(), "Recommendations served");
    Ok(Json(RecommendationsResponse { mood, songs }))
}
