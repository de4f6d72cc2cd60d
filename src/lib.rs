// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Moodtrack: mood tracking from Spotify listening history
//!
//! This crate provides the backend API that links a Spotify account,
//! derives mood vectors from the lyrics of recently played tracks, and
//! turns a time-decayed mood aggregate into song recommendations.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Database;
use services::{IngestionPipeline, MoodAggregator, OAuthManager, Recommender, SpotifyApi};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub oauth: OAuthManager,
    pub spotify: Arc<dyn SpotifyApi>,
    pub ingest: IngestionPipeline,
    pub aggregator: MoodAggregator,
    pub recommender: Arc<dyn Recommender>,
}
