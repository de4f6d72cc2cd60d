// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Short-lived OAuth state storage.
//!
//! A state token binds the provider callback to the user who started the
//! authorization. Stores only need an atomic put and an atomic
//! take-if-present; entries expire after a fixed TTL.

use crate::error::AppError;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use dashmap::DashMap;
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::Arc;
use std::time::{Duration, Instant};

const STATE_BYTES: usize = 32;
const REDIS_KEY_PREFIX: &str = "moodtrack:oauth_state:";

/// Keyed store for pending authorization states.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Record `state -> user_id`.
    async fn put(&self, state: &str, user_id: i64) -> Result<(), AppError>;

    /// Remove and return the user bound to `state`.
    ///
    /// Must be atomic: of two concurrent calls with the same state, at most
    /// one sees `Some`. Expired entries are reported as absent.
    async fn take(&self, state: &str) -> Result<Option<i64>, AppError>;
}

/// Generate an unpredictable URL-safe state token.
pub fn generate_state() -> Result<String, AppError> {
    let mut bytes = [0u8; STATE_BYTES];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

// ─── In-process store ────────────────────────────────────────────────────────

/// Single-instance store backed by a concurrent map.
#[derive(Clone)]
pub struct MemoryStateStore {
    entries: Arc<DashMap<String, PendingState>>,
    ttl: Duration,
}

#[derive(Clone, Copy)]
struct PendingState {
    user_id: i64,
    issued_at: Instant,
}

impl MemoryStateStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Drop entries older than the TTL.
    pub fn purge_expired(&self) {
        let ttl = self.ttl;
        self.entries.retain(|_, pending| pending.issued_at.elapsed() < ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn put(&self, state: &str, user_id: i64) -> Result<(), AppError> {
        self.purge_expired();
        self.entries.insert(
            state.to_string(),
            PendingState {
                user_id,
                issued_at: Instant::now(),
            },
        );
        Ok(())
    }

    async fn take(&self, state: &str) -> Result<Option<i64>, AppError> {
        // DashMap::remove holds the shard lock, so only one caller wins.
        let Some((_, pending)) = self.entries.remove(state) else {
            return Ok(None);
        };

        if pending.issued_at.elapsed() >= self.ttl {
            tracing::info!(user_id = pending.user_id, "OAuth state expired");
            return Ok(None);
        }
        Ok(Some(pending.user_id))
    }
}

// ─── Redis store ─────────────────────────────────────────────────────────────

/// Store shared between server instances.
#[derive(Clone)]
pub struct RedisStateStore {
    client: redis::Client,
    ttl: Duration,
}

impl RedisStateStore {
    pub fn new(redis_url: &str, ttl: Duration) -> Result<Self, AppError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid Redis URL: {}", e)))?;
        Ok(Self { client, ttl })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, AppError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Redis connection failed: {}", e)))
    }
}

#[async_trait]
impl StateStore for RedisStateStore {
    async fn put(&self, state: &str, user_id: i64) -> Result<(), AppError> {
        let mut conn = self.connection().await?;
        let ttl_secs = self.ttl.as_secs().max(1);
        redis::cmd("SET")
            .arg(format!("{}{}", REDIS_KEY_PREFIX, state))
            .arg(user_id)
            .arg("EX")
            .arg(ttl_secs)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Redis SET failed: {}", e)))
    }

    async fn take(&self, state: &str) -> Result<Option<i64>, AppError> {
        let mut conn = self.connection().await?;
        // GETDEL is a single atomic command; Redis expiry covers the TTL.
        redis::cmd("GETDEL")
            .arg(format!("{}{}", REDIS_KEY_PREFIX, state))
            .query_async::<Option<i64>>(&mut conn)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Redis GETDEL failed: {}", e)))
    }
}
