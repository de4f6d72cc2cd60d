// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client for the external mood classifier and recommender.

use crate::error::AppError;
use crate::models::{MoodVector, RecommendedSong};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Predicts a mood vector from song lyrics.
#[async_trait]
pub trait MoodClassifier: Send + Sync {
    async fn predict_mood(
        &self,
        lyrics: &str,
        artist: &str,
        title: &str,
    ) -> Result<MoodVector, AppError>;
}

/// Suggests songs close to a mood vector.
#[async_trait]
pub trait Recommender: Send + Sync {
    /// Up to `limit` songs, in the order the service ranked them.
    async fn get_recommendations(
        &self,
        mood: &MoodVector,
        limit: usize,
    ) -> Result<Vec<RecommendedSong>, AppError>;
}

/// HTTP client for the mood service.
///
/// - `POST {base}/` with `{lyrics, artist, title}` → mood vector
/// - `POST {base}/closest` with a mood vector and `limit` → ranked songs
#[derive(Clone)]
pub struct MoodApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl MoodApiClient {
    pub fn new(base_url: &str, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post_json<B: Serialize + ?Sized, T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, AppError> {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::ProviderError(format!("Mood API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "Mood API request failed");
            return Err(AppError::ProviderError(format!("Mood API HTTP {}", status)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::ProviderError(format!("Malformed mood API response: {}", e)))
    }
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    lyrics: &'a str,
    artist: &'a str,
    title: &'a str,
}

#[derive(Serialize)]
struct ClosestRequest<'a> {
    #[serde(flatten)]
    mood: &'a MoodVector,
    limit: usize,
}

#[async_trait]
impl MoodClassifier for MoodApiClient {
    async fn predict_mood(
        &self,
        lyrics: &str,
        artist: &str,
        title: &str,
    ) -> Result<MoodVector, AppError> {
        // Deserializing into MoodVector rejects payloads missing any component.
        let mood: MoodVector = self
            .post_json(
                &format!("{}/", self.base_url),
                &PredictRequest {
                    lyrics,
                    artist,
                    title,
                },
            )
            .await?;

        if !mood.is_valid() {
            return Err(AppError::ProviderError(format!(
                "Mood components out of range: {:?}",
                mood
            )));
        }
        Ok(mood)
    }
}

#[async_trait]
impl Recommender for MoodApiClient {
    async fn get_recommendations(
        &self,
        mood: &MoodVector,
        limit: usize,
    ) -> Result<Vec<RecommendedSong>, AppError> {
        let mut songs: Vec<RecommendedSong> = self
            .post_json(
                &format!("{}/closest", self.base_url),
                &ClosestRequest { mood, limit },
            )
            .await?;

        songs.truncate(limit);
        Ok(songs)
    }
}
