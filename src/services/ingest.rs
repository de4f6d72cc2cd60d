// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Mood ingestion from listening history.
//!
//! Handles the core workflow:
//! 1. Make sure the user's Spotify token is valid (refreshing if needed)
//! 2. Fetch recently played tracks
//! 3. Skip plays that already produced a mood record
//! 4. Resolve lyrics and classify them
//! 5. Store all new records in one transaction

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{NewMoodRecord, TrackPlay, User};
use crate::services::lyrics::LyricsResolver;
use crate::services::mood_api::MoodClassifier;
use crate::services::oauth::OAuthManager;
use crate::services::spotify::SpotifyApi;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Outcome counts for one ingestion run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct IngestReport {
    pub fetched: usize,
    pub inserted: usize,
    pub skipped_duplicate: usize,
    pub skipped_no_lyrics: usize,
    pub failed_classification: usize,
}

/// Turns recent plays into mood records.
#[derive(Clone)]
pub struct IngestionPipeline {
    oauth: OAuthManager,
    spotify: Arc<dyn SpotifyApi>,
    lyrics: LyricsResolver,
    classifier: Arc<dyn MoodClassifier>,
    db: Database,
}

impl IngestionPipeline {
    pub fn new(
        oauth: OAuthManager,
        spotify: Arc<dyn SpotifyApi>,
        lyrics: LyricsResolver,
        classifier: Arc<dyn MoodClassifier>,
        db: Database,
    ) -> Self {
        Self {
            oauth,
            spotify,
            lyrics,
            classifier,
            db,
        }
    }

    /// Fetch the user's recent plays, refreshing the token first if needed.
    pub async fn fetch_recent_plays(
        &self,
        user: &User,
        limit: u32,
        time_window: Option<Duration>,
    ) -> Result<Vec<TrackPlay>> {
        let after = time_window
            .map(|window| {
                Utc::now()
                    .checked_sub_signed(window)
                    .ok_or_else(|| AppError::BadRequest("time window is too large".to_string()))
            })
            .transpose()?;
        let access_token = self.oauth.ensure_token_valid(user).await?;
        self.spotify
            .recently_played(&access_token, limit, after)
            .await
    }

    /// Ingest recent plays for `user`.
    ///
    /// Per-track failures (no lyrics, classifier error) are logged and
    /// skipped. Only token, fetch and commit failures abort the run; a failed
    /// commit writes nothing.
    pub async fn ingest_recent_plays(
        &self,
        user: &User,
        limit: u32,
        time_window: Option<Duration>,
    ) -> Result<IngestReport> {
        let plays = self.fetch_recent_plays(user, limit, time_window).await?;
        self.ingest_plays(user.id, &plays).await
    }

    /// Classify and store `plays` in provider order.
    pub async fn ingest_plays(&self, user_id: i64, plays: &[TrackPlay]) -> Result<IngestReport> {
        let mut report = IngestReport {
            fetched: plays.len(),
            ..Default::default()
        };

        if plays.is_empty() {
            tracing::info!(user_id, "No recent plays to ingest");
            return Ok(report);
        }

        let mut seen: HashSet<(&str, DateTime<Utc>)> = HashSet::new();
        let mut staged: Vec<NewMoodRecord> = Vec::new();

        for play in plays {
            if !seen.insert((play.id.as_str(), play.played_at))
                || self.already_ingested(user_id, play).await?
            {
                tracing::debug!(user_id, track_id = %play.id, "Play already ingested (idempotent skip)");
                report.skipped_duplicate += 1;
                continue;
            }

            let Some(lyrics) = self.lyrics.resolve_lyrics(&play.name, &play.artist).await else {
                tracing::info!(user_id, track_id = %play.id, title = %play.name, "No lyrics, skipping track");
                report.skipped_no_lyrics += 1;
                continue;
            };

            let mood = match self
                .classifier
                .predict_mood(&lyrics, &play.artist, &play.name)
                .await
            {
                Ok(mood) => mood,
                Err(e) => {
                    tracing::warn!(user_id, track_id = %play.id, error = %e, "Mood classification failed, skipping track");
                    report.failed_classification += 1;
                    continue;
                }
            };

            staged.push(NewMoodRecord {
                user_id,
                mood,
                notes: Some(build_note(play)),
                recorded_at: Utc::now(),
                source_track_id: Some(play.id.clone()),
                source_played_at: Some(play.played_at),
            });
        }

        report.inserted = self.db.insert_mood_records_atomic(&staged).await?;
        // Rows lost to a concurrent run are duplicates too.
        report.skipped_duplicate += staged.len() - report.inserted;

        tracing::info!(
            user_id,
            fetched = report.fetched,
            inserted = report.inserted,
            skipped_duplicate = report.skipped_duplicate,
            skipped_no_lyrics = report.skipped_no_lyrics,
            failed_classification = report.failed_classification,
            "Ingestion finished"
        );
        Ok(report)
    }

    /// Run ingestion off the request path. Errors are only logged.
    pub fn spawn_ingest(&self, user: User, limit: u32, time_window: Option<Duration>) {
        let pipeline = self.clone();
        tokio::spawn(async move {
            if let Err(e) = pipeline.ingest_recent_plays(&user, limit, time_window).await {
                tracing::warn!(user_id = user.id, error = %e, "Background ingestion failed");
            }
        });
    }

    async fn already_ingested(&self, user_id: i64, play: &TrackPlay) -> Result<bool> {
        Ok(self
            .db
            .find_mood_record_by_source(user_id, &play.id, play.played_at)
            .await?
            .is_some())
    }
}

/// Note stored alongside an ingested record.
fn build_note(play: &TrackPlay) -> String {
    if play.artist.is_empty() {
        format!("Mood generated from track: {}", play.name)
    } else {
        format!("Mood generated from track: {} by {}", play.name, play.artist)
    }
}
