// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SQLite client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (account and Spotify credentials)
//! - Mood records (manual entries and ingested track plays)

use crate::error::AppError;
use crate::models::{MoodRecord, NewMoodRecord, User};
use chrono::{DateTime, Utc};
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{Sqlite, SqlitePool, SqlitePoolOptions};

const MAX_CONNECTIONS: u32 = 5;

const MOOD_RECORD_COLUMNS: &str = "id, user_id, happy, sad, angry, relaxed, notes, \
     recorded_at, source_track_id, source_played_at";

/// Relational store client.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the database, creating it if needed, and run migrations.
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
            Sqlite::create_database(database_url)
                .await
                .map_err(|e| AppError::Database(format!("Failed to create database: {}", e)))?;
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect: {}", e)))?;

        let db = Self { pool };
        db.migrate().await?;

        tracing::info!(url = database_url, "Connected to database");
        Ok(db)
    }

    /// Private in-memory database for tests.
    ///
    /// Pinned to a single connection that never expires, since every SQLite
    /// memory connection is its own database.
    pub async fn connect_in_memory() -> Result<Self, AppError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| AppError::Database(format!("Failed to open in-memory db: {}", e)))?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Migration failed: {}", e)))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Create a user account. Fails with `Conflict` if the email is taken.
    pub async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, AppError> {
        let result = sqlx::query(
            "INSERT INTO users (email, password_hash, created_at) VALUES (?, ?, ?)",
        )
        .bind(email)
        .bind(password_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation("A user with this email already exists"))?;

        self.get_user(result.last_insert_rowid())
            .await?
            .ok_or_else(|| AppError::Database("Inserted user vanished".to_string()))
    }

    /// Get a user by ID.
    pub async fn get_user(&self, user_id: i64) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a user by email address.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update email and/or password hash; `None` leaves a field unchanged.
    pub async fn update_user_profile(
        &self,
        user_id: i64,
        email: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE users SET email = COALESCE(?, email), \
             password_hash = COALESCE(?, password_hash) WHERE id = ?",
        )
        .bind(email)
        .bind(password_hash)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation("A user with this email already exists"))?;
        Ok(())
    }

    // ─── Token Operations ────────────────────────────────────────

    /// Store Spotify credentials in a single statement.
    ///
    /// A `None` refresh token keeps the stored one, since providers may
    /// reuse refresh tokens across grants.
    pub async fn set_spotify_tokens(
        &self,
        user_id: i64,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE users SET spotify_access_token = ?, \
             spotify_refresh_token = COALESCE(?, spotify_refresh_token), \
             spotify_token_expiry = ? WHERE id = ?",
        )
        .bind(access_token)
        .bind(refresh_token)
        .bind(expires_at)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {}", user_id)));
        }
        Ok(())
    }

    // ─── Mood Record Operations ──────────────────────────────────

    /// Insert a single mood record and return it.
    pub async fn insert_mood_record(&self, record: &NewMoodRecord) -> Result<MoodRecord, AppError> {
        let result = bind_mood_record(sqlx::query(INSERT_MOOD_RECORD), record)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let sql = format!("SELECT {} FROM mood_records WHERE id = ?", MOOD_RECORD_COLUMNS);
        sqlx::query_as::<_, MoodRecord>(&sql)
            .bind(result.last_insert_rowid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Look up an ingested record by its dedup key.
    pub async fn find_mood_record_by_source(
        &self,
        user_id: i64,
        track_id: &str,
        played_at: DateTime<Utc>,
    ) -> Result<Option<MoodRecord>, AppError> {
        let sql = format!(
            "SELECT {} FROM mood_records \
             WHERE user_id = ? AND source_track_id = ? AND source_played_at = ?",
            MOOD_RECORD_COLUMNS
        );
        sqlx::query_as::<_, MoodRecord>(&sql)
            .bind(user_id)
            .bind(track_id)
            .bind(played_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Records with `recorded_at` in `[start, end]`, oldest first.
    pub async fn mood_records_between(
        &self,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<MoodRecord>, AppError> {
        let sql = format!(
            "SELECT {} FROM mood_records \
             WHERE user_id = ? AND recorded_at >= ? AND recorded_at <= ? \
             ORDER BY recorded_at ASC, id ASC",
            MOOD_RECORD_COLUMNS
        );
        sqlx::query_as::<_, MoodRecord>(&sql)
            .bind(user_id)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Atomic Batch Insert ───────────────────────────────────────

    /// Insert a batch of mood records in one transaction.
    ///
    /// Rows whose dedup key already exists are skipped, so a concurrent
    /// ingestion of the same plays cannot fail the batch. Any other error
    /// rolls back every row. Returns the number of rows inserted.
    pub async fn insert_mood_records_atomic(
        &self,
        records: &[NewMoodRecord],
    ) -> Result<usize, AppError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let mut inserted = 0usize;
        for record in records {
            let result = bind_mood_record(sqlx::query(INSERT_MOOD_RECORD_IGNORE_DUPLICATE), record)
                .execute(&mut *transaction)
                .await
                .map_err(|e| {
                    AppError::Database(format!("Failed to stage mood record: {}", e))
                })?;
            inserted += result.rows_affected() as usize;
        }

        // Dropping an uncommitted transaction rolls it back.
        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        Ok(inserted)
    }
}

const INSERT_MOOD_RECORD: &str = "INSERT INTO mood_records \
     (user_id, happy, sad, angry, relaxed, notes, recorded_at, source_track_id, source_played_at) \
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)";

const INSERT_MOOD_RECORD_IGNORE_DUPLICATE: &str = "INSERT INTO mood_records \
     (user_id, happy, sad, angry, relaxed, notes, recorded_at, source_track_id, source_played_at) \
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
     ON CONFLICT (user_id, source_track_id, source_played_at) DO NOTHING";

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>;

fn bind_mood_record<'q>(query: SqliteQuery<'q>, record: &'q NewMoodRecord) -> SqliteQuery<'q> {
    query
        .bind(record.user_id)
        .bind(record.mood.happy)
        .bind(record.mood.sad)
        .bind(record.mood.angry)
        .bind(record.mood.relaxed)
        .bind(record.notes.as_deref())
        .bind(record.recorded_at)
        .bind(record.source_track_id.as_deref())
        .bind(record.source_played_at)
}

fn map_unique_violation(message: &'static str) -> impl Fn(sqlx::Error) -> AppError {
    move |e| match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(e.to_string()),
    }
}
