// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Moodtrack API Server
//!
//! Links a Spotify account, derives moods from the lyrics of recently
//! played tracks and recommends songs for the user's current mood.

use moodtrack::{
    config::Config,
    db::Database,
    services::{
        IngestionPipeline, LrclibLyrics, LyricsResolver, LyricsSource, MemoryStateStore,
        MoodAggregator, MoodApiClient, OAuthManager, OvhLyrics, RedisStateStore, SpotifyApi,
        SpotifyClient, StateStore,
    },
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Moodtrack API");

    // Open the database and apply migrations
    let db = Database::connect(&config.database_url).await?;
    tracing::info!(url = %config.database_url, "Database ready");

    // One HTTP client shared by every upstream adapter
    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?;

    // OAuth state store: shared via Redis when configured
    let states: Arc<dyn StateStore> = match &config.redis_url {
        Some(url) => {
            tracing::info!("Using Redis OAuth state store");
            Arc::new(RedisStateStore::new(url, config.oauth_state_ttl)?)
        }
        None => {
            tracing::info!("Using in-process OAuth state store");
            Arc::new(MemoryStateStore::new(config.oauth_state_ttl))
        }
    };

    let spotify: Arc<dyn SpotifyApi> = Arc::new(SpotifyClient::new(&config, http.clone()));
    let oauth = OAuthManager::new(&config, spotify.clone(), states, db.clone());

    let primary: Arc<dyn LyricsSource> =
        Arc::new(OvhLyrics::new(&config.lyrics_primary_url, http.clone()));
    let fallback = config
        .lyrics_fallback_url
        .as_deref()
        .map(|url| Arc::new(LrclibLyrics::new(url, http.clone())) as Arc<dyn LyricsSource>);
    tracing::info!(
        primary = primary.name(),
        fallback = fallback.as_ref().map(|f| f.name()),
        "Lyrics sources configured"
    );
    let lyrics = LyricsResolver::new(primary, fallback);

    let mood_api = Arc::new(MoodApiClient::new(&config.ai_api_url, http));

    let ingest = IngestionPipeline::new(
        oauth.clone(),
        spotify.clone(),
        lyrics,
        mood_api.clone(),
        db.clone(),
    );
    let aggregator = MoodAggregator::new(db.clone());

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        oauth,
        spotify,
        ingest,
        aggregator,
        recommender: mood_api,
    });

    // Build router
    let app = moodtrack::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("moodtrack=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
