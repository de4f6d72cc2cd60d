// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Lyrics lookup with a primary and an optional fallback source.
//!
//! Missing lyrics are an expected outcome, so resolution never fails: every
//! source error is logged and reported as "no lyrics".

use crate::error::AppError;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

/// A single lyrics provider.
#[async_trait]
pub trait LyricsSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Lyrics text, `None` if the provider has no match.
    async fn fetch(&self, title: &str, artist: &str) -> Result<Option<String>, AppError>;
}

/// Tries the primary source, then the fallback.
#[derive(Clone)]
pub struct LyricsResolver {
    primary: Arc<dyn LyricsSource>,
    fallback: Option<Arc<dyn LyricsSource>>,
}

impl LyricsResolver {
    pub fn new(primary: Arc<dyn LyricsSource>, fallback: Option<Arc<dyn LyricsSource>>) -> Self {
        Self { primary, fallback }
    }

    /// Resolve lyrics for a track. Blank text counts as a miss.
    pub async fn resolve_lyrics(&self, title: &str, artist: &str) -> Option<String> {
        if let Some(lyrics) = try_source(self.primary.as_ref(), title, artist).await {
            return Some(lyrics);
        }

        match &self.fallback {
            Some(fallback) => try_source(fallback.as_ref(), title, artist).await,
            None => None,
        }
    }
}

async fn try_source(source: &dyn LyricsSource, title: &str, artist: &str) -> Option<String> {
    match source.fetch(title, artist).await {
        Ok(Some(text)) if !text.trim().is_empty() => Some(text),
        Ok(_) => {
            tracing::debug!(source = source.name(), title, artist, "No lyrics found");
            None
        }
        Err(e) => {
            tracing::warn!(source = source.name(), title, artist, error = %e, "Lyrics lookup failed");
            None
        }
    }
}

// ─── lyrics.ovh ──────────────────────────────────────────────────────────────

/// `GET {base}/{artist}/{title}` returning `{"lyrics": "..."}`.
#[derive(Clone)]
pub struct OvhLyrics {
    http: reqwest::Client,
    base_url: String,
}

impl OvhLyrics {
    pub fn new(base_url: &str, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Deserialize)]
struct OvhResponse {
    lyrics: Option<String>,
}

#[async_trait]
impl LyricsSource for OvhLyrics {
    fn name(&self) -> &'static str {
        "lyrics.ovh"
    }

    async fn fetch(&self, title: &str, artist: &str) -> Result<Option<String>, AppError> {
        let url = format!(
            "{}/{}/{}",
            self.base_url,
            urlencoding::encode(artist),
            urlencoding::encode(title)
        );
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::ProviderError(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(AppError::ProviderError(format!(
                "lyrics.ovh HTTP {}",
                response.status()
            )));
        }

        let body: OvhResponse = response
            .json()
            .await
            .map_err(|e| AppError::ProviderError(format!("JSON parse error: {}", e)))?;
        Ok(body.lyrics)
    }
}

// ─── LRCLIB ──────────────────────────────────────────────────────────────────

/// `GET {base}/get?artist_name=..&track_name=..` returning `{"plainLyrics": "..."}`.
#[derive(Clone)]
pub struct LrclibLyrics {
    http: reqwest::Client,
    base_url: String,
}

impl LrclibLyrics {
    pub fn new(base_url: &str, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LrclibResponse {
    plain_lyrics: Option<String>,
    #[serde(default)]
    instrumental: bool,
}

#[async_trait]
impl LyricsSource for LrclibLyrics {
    fn name(&self) -> &'static str {
        "lrclib"
    }

    async fn fetch(&self, title: &str, artist: &str) -> Result<Option<String>, AppError> {
        let response = self
            .http
            .get(format!("{}/get", self.base_url))
            .query(&[("artist_name", artist), ("track_name", title)])
            .send()
            .await
            .map_err(|e| AppError::ProviderError(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(AppError::ProviderError(format!(
                "lrclib HTTP {}",
                response.status()
            )));
        }

        let body: LrclibResponse = response
            .json()
            .await
            .map_err(|e| AppError::ProviderError(format!("JSON parse error: {}", e)))?;

        if body.instrumental {
            return Ok(None);
        }
        Ok(body.plain_lyrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Canned {
        result: fn() -> Result<Option<String>, AppError>,
        calls: AtomicUsize,
    }

    impl Canned {
        fn new(result: fn() -> Result<Option<String>, AppError>) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LyricsSource for Canned {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn fetch(&self, _title: &str, _artist: &str) -> Result<Option<String>, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    #[tokio::test]
    async fn test_primary_hit_skips_fallback() {
        let primary = Canned::new(|| Ok(Some("la la".to_string())));
        let fallback = Canned::new(|| Ok(Some("other".to_string())));
        let resolver = LyricsResolver::new(primary.clone(), Some(fallback.clone()));

        assert_eq!(resolver.resolve_lyrics("t", "a").await.as_deref(), Some("la la"));
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_primary_error_uses_fallback() {
        let primary = Canned::new(|| Err(AppError::ProviderError("boom".to_string())));
        let fallback = Canned::new(|| Ok(Some("from fallback".to_string())));
        let resolver = LyricsResolver::new(primary, Some(fallback));

        assert_eq!(
            resolver.resolve_lyrics("t", "a").await.as_deref(),
            Some("from fallback")
        );
    }

    #[tokio::test]
    async fn test_blank_primary_counts_as_miss() {
        let primary = Canned::new(|| Ok(Some("   \n".to_string())));
        let fallback = Canned::new(|| Ok(None));
        let resolver = LyricsResolver::new(primary, Some(fallback.clone()));

        assert_eq!(resolver.resolve_lyrics("t", "a").await, None);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_fallback_configured() {
        let primary = Canned::new(|| Ok(None));
        let resolver = LyricsResolver::new(primary, None);

        assert_eq!(resolver.resolve_lyrics("t", "a").await, None);
    }
}
