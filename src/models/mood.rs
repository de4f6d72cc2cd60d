// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Mood vectors and stored mood observations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Four independent emotion scores, each in [0, 1].
///
/// The components are not a distribution and are never renormalized.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, sqlx::FromRow)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MoodVector {
    pub happy: f64,
    pub sad: f64,
    pub angry: f64,
    pub relaxed: f64,
}

impl MoodVector {
    pub fn new(happy: f64, sad: f64, angry: f64, relaxed: f64) -> Self {
        Self {
            happy,
            sad,
            angry,
            relaxed,
        }
    }

    /// Components in fixed order: happy, sad, angry, relaxed.
    pub fn components(&self) -> [f64; 4] {
        [self.happy, self.sad, self.angry, self.relaxed]
    }

    pub fn from_components([happy, sad, angry, relaxed]: [f64; 4]) -> Self {
        Self::new(happy, sad, angry, relaxed)
    }

    /// True if every component is a finite value in [0, 1].
    pub fn is_valid(&self) -> bool {
        self.components()
            .iter()
            .all(|c| c.is_finite() && (0.0..=1.0).contains(c))
    }
}

/// A stored mood observation. Immutable once written.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MoodRecord {
    pub id: i64,
    pub user_id: i64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub mood: MoodVector,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
    pub source_track_id: Option<String>,
    pub source_played_at: Option<DateTime<Utc>>,
}

/// A mood observation staged for insertion.
#[derive(Debug, Clone)]
pub struct NewMoodRecord {
    pub user_id: i64,
    pub mood: MoodVector,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
    /// Dedup key half; set together with `source_played_at` for ingested plays.
    pub source_track_id: Option<String>,
    pub source_played_at: Option<DateTime<Utc>>,
}

impl NewMoodRecord {
    /// A user-entered observation with no source track.
    pub fn manual(user_id: i64, mood: MoodVector, notes: Option<String>) -> Self {
        Self {
            user_id,
            mood,
            notes,
            recorded_at: Utc::now(),
            source_track_id: None,
            source_played_at: None,
        }
    }
}

/// A candidate song from the recommender, with its own predicted mood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RecommendedSong {
    pub artist: String,
    pub title: String,
    pub prediction: MoodVector,
}
