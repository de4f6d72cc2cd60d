// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use moodtrack::config::Config;
use moodtrack::db::Database;
use moodtrack::error::AppError;
use moodtrack::middleware::auth::create_jwt;
use moodtrack::models::{MoodVector, RecommendedSong, TokenGrant, TrackPlay, User};
use moodtrack::routes::create_router;
use moodtrack::services::{
    IngestionPipeline, LyricsResolver, LyricsSource, MemoryStateStore, MoodAggregator,
    MoodClassifier, OAuthManager, Recommender, SpotifyApi,
};
use moodtrack::AppState;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Check if a Redis server is available via environment variable.
#[allow(dead_code)]
pub fn redis_available() -> bool {
    std::env::var("REDIS_URL").is_ok()
}

/// Skip test with message if Redis is not available.
#[macro_export]
macro_rules! require_redis {
    () => {
        if !crate::common::redis_available() {
            eprintln!("⚠️  Skipping: REDIS_URL not set");
            return;
        }
    };
}

// ─── Fake Spotify ────────────────────────────────────────────

/// In-memory provider. Issues numbered tokens and records which access
/// tokens the data endpoints were called with.
#[derive(Default)]
pub struct FakeSpotify {
    pub plays: Mutex<Vec<TrackPlay>>,
    pub fail_exchange: AtomicBool,
    pub fail_refresh: AtomicBool,
    /// Omit the refresh token from refresh grants.
    pub reuse_refresh_token: AtomicBool,
    pub exchange_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub used_tokens: Mutex<Vec<String>>,
    pub search_results: Mutex<HashMap<String, String>>,
    pub queued: Mutex<Vec<String>>,
    /// Overrides `expires_in` on issued grants.
    pub grant_lifetime: Mutex<Option<i64>>,
}

#[allow(dead_code)]
impl FakeSpotify {
    pub fn set_plays(&self, plays: Vec<TrackPlay>) {
        *self.plays.lock().unwrap() = plays;
    }

    pub fn used_tokens(&self) -> Vec<String> {
        self.used_tokens.lock().unwrap().clone()
    }

    fn expires_in(&self) -> i64 {
        self.grant_lifetime.lock().unwrap().unwrap_or(3600)
    }

    fn record_token(&self, token: &str) {
        self.used_tokens.lock().unwrap().push(token.to_string());
    }
}

#[async_trait]
impl SpotifyApi for FakeSpotify {
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, AppError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_exchange.load(Ordering::SeqCst) {
            return Err(AppError::ProviderError("Spotify HTTP 400: invalid_grant".to_string()));
        }
        Ok(TokenGrant {
            access_token: format!("access-for-{}", code),
            refresh_token: Some(format!("refresh-for-{}", code)),
            expires_in: self.expires_in(),
        })
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenGrant, AppError> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(AppError::ProviderError("Spotify HTTP 400: invalid_grant".to_string()));
        }
        let refresh_token = if self.reuse_refresh_token.load(Ordering::SeqCst) {
            None
        } else {
            Some(format!("{}-r{}", refresh_token, n))
        };
        Ok(TokenGrant {
            access_token: format!("refreshed-access-{}", n),
            refresh_token,
            expires_in: self.expires_in(),
        })
    }

    async fn recently_played(
        &self,
        access_token: &str,
        limit: u32,
        after: Option<DateTime<Utc>>,
    ) -> Result<Vec<TrackPlay>, AppError> {
        self.record_token(access_token);
        Ok(self
            .plays
            .lock()
            .unwrap()
            .iter()
            .filter(|p| after.map_or(true, |after| p.played_at > after))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn search_track(
        &self,
        access_token: &str,
        title: &str,
        _artist: &str,
    ) -> Result<Option<String>, AppError> {
        self.record_token(access_token);
        Ok(self.search_results.lock().unwrap().get(title).cloned())
    }

    async fn add_to_queue(&self, access_token: &str, track_uri: &str) -> Result<(), AppError> {
        self.record_token(access_token);
        self.queued.lock().unwrap().push(track_uri.to_string());
        Ok(())
    }
}

// ─── Fake lyrics / classifier / recommender ──────────────────

/// Lyrics keyed by title; unknown titles have none.
#[derive(Default)]
pub struct FakeLyrics {
    pub lyrics: Mutex<HashMap<String, String>>,
}

#[allow(dead_code)]
impl FakeLyrics {
    pub fn with(titles: &[&str]) -> Self {
        let lyrics = titles
            .iter()
            .map(|t| (t.to_string(), format!("lyrics of {}", t)))
            .collect();
        Self {
            lyrics: Mutex::new(lyrics),
        }
    }
}

#[async_trait]
impl LyricsSource for FakeLyrics {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn fetch(&self, title: &str, _artist: &str) -> Result<Option<String>, AppError> {
        Ok(self.lyrics.lock().unwrap().get(title).cloned())
    }
}

/// Returns `mood` for every track except titles listed in `fail_titles`.
pub struct FakeClassifier {
    pub mood: MoodVector,
    pub fail_titles: Mutex<HashSet<String>>,
    pub calls: AtomicUsize,
}

impl Default for FakeClassifier {
    fn default() -> Self {
        Self {
            mood: MoodVector::new(0.7, 0.1, 0.05, 0.4),
            fail_titles: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MoodClassifier for FakeClassifier {
    async fn predict_mood(
        &self,
        _lyrics: &str,
        _artist: &str,
        title: &str,
    ) -> Result<MoodVector, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_titles.lock().unwrap().contains(title) {
            return Err(AppError::ProviderError("Mood API HTTP 500".to_string()));
        }
        Ok(self.mood)
    }
}

/// Returns a fixed ranked list and remembers the last mood it was asked for.
#[derive(Default)]
pub struct FakeRecommender {
    pub last_mood: Mutex<Option<MoodVector>>,
}

#[async_trait]
impl Recommender for FakeRecommender {
    async fn get_recommendations(
        &self,
        mood: &MoodVector,
        limit: usize,
    ) -> Result<Vec<RecommendedSong>, AppError> {
        *self.last_mood.lock().unwrap() = Some(*mood);
        Ok((1..=10)
            .map(|i| RecommendedSong {
                artist: format!("Artist {}", i),
                title: format!("Song {}", i),
                prediction: *mood,
            })
            .take(limit)
            .collect())
    }
}

// ─── Test application ────────────────────────────────────────

/// Fully wired application over an in-memory database and fakes.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub db: Database,
    pub spotify: Arc<FakeSpotify>,
    pub lyrics: Arc<FakeLyrics>,
    pub classifier: Arc<FakeClassifier>,
    pub recommender: Arc<FakeRecommender>,
    pub states: Arc<MemoryStateStore>,
}

#[allow(dead_code)]
impl TestApp {
    /// Session token for `user_id`.
    pub fn bearer(&self, user_id: i64) -> String {
        let token = create_jwt(user_id, &self.state.config.jwt_signing_key, 60).unwrap();
        format!("Bearer {}", token)
    }
}

/// Create a test app with offline fake dependencies.
#[allow(dead_code)]
pub async fn create_test_app() -> TestApp {
    create_test_app_with_lyrics(FakeLyrics::default()).await
}

#[allow(dead_code)]
pub async fn create_test_app_with_lyrics(lyrics: FakeLyrics) -> TestApp {
    let config = Config::test_default();
    let db = Database::connect_in_memory()
        .await
        .expect("Failed to open in-memory database");

    let spotify = Arc::new(FakeSpotify::default());
    let lyrics = Arc::new(lyrics);
    let classifier = Arc::new(FakeClassifier::default());
    let recommender = Arc::new(FakeRecommender::default());
    let states = Arc::new(MemoryStateStore::new(config.oauth_state_ttl));

    let oauth = OAuthManager::new(&config, spotify.clone(), states.clone(), db.clone());
    let ingest = IngestionPipeline::new(
        oauth.clone(),
        spotify.clone(),
        LyricsResolver::new(lyrics.clone(), None),
        classifier.clone(),
        db.clone(),
    );

    let state = Arc::new(AppState {
        config,
        db: db.clone(),
        oauth,
        spotify: spotify.clone(),
        ingest,
        aggregator: MoodAggregator::new(db.clone()),
        recommender: recommender.clone(),
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        spotify,
        lyrics,
        classifier,
        recommender,
        states,
    }
}

// ─── Fixtures ────────────────────────────────────────────────

/// Insert a user with a placeholder password hash.
#[allow(dead_code)]
pub async fn create_user(db: &Database, email: &str) -> User {
    db.create_user(email, "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA")
        .await
        .expect("Failed to create user")
}

/// Give `user_id` Spotify credentials expiring at `expires_at`.
#[allow(dead_code)]
pub async fn connect_spotify(db: &Database, user_id: i64, expires_at: DateTime<Utc>) -> User {
    db.set_spotify_tokens(user_id, "stored-access", Some("stored-refresh"), expires_at)
        .await
        .expect("Failed to set tokens");
    db.get_user(user_id).await.unwrap().unwrap()
}

/// User with credentials valid for the next hour.
#[allow(dead_code)]
pub async fn connected_user(db: &Database, email: &str) -> User {
    let user = create_user(db, email).await;
    connect_spotify(db, user.id, Utc::now() + Duration::hours(1)).await
}

#[allow(dead_code)]
pub fn track_play(id: &str, name: &str, played_at: DateTime<Utc>) -> TrackPlay {
    TrackPlay {
        id: id.to_string(),
        name: name.to_string(),
        artist: "Test Artist".to_string(),
        album: "Test Album".to_string(),
        uri: format!("spotify:track:{}", id),
        played_at,
        preview_url: None,
    }
}

// ─── Stub HTTP servers ───────────────────────────────────────

/// Serve `router` on an ephemeral local port and return its base URL.
#[allow(dead_code)]
pub async fn spawn_stub(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub server");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
