// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod aggregator;
pub mod ingest;
pub mod lyrics;
pub mod mood_api;
pub mod oauth;
pub mod spotify;
pub mod state_store;

pub use aggregator::{decayed_mean, MoodAggregator, MoodStatistics};
pub use ingest::{IngestReport, IngestionPipeline};
pub use lyrics::{LrclibLyrics, LyricsResolver, LyricsSource, OvhLyrics};
pub use mood_api::{MoodApiClient, MoodClassifier, Recommender};
pub use oauth::{AuthorizationRequest, OAuthManager};
pub use spotify::{SpotifyApi, SpotifyClient};
pub use state_store::{MemoryStateStore, RedisStateStore, StateStore};
