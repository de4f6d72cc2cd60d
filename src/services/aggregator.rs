// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Time-decayed aggregation of stored mood records.
//!
//! Each record in the window is weighted by `exp(-decay_rate * age_minutes)`
//! and the result is the weighted mean per component. A rate of zero gives
//! the plain arithmetic mean.

use crate::db::Database;
use crate::error::AppError;
use crate::models::{MoodRecord, MoodVector};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Weighted mean of `records` as seen from `now`.
///
/// Returns `None` for an empty slice. Records dated after `now` are treated
/// as age zero.
pub fn decayed_mean(records: &[MoodRecord], now: DateTime<Utc>, decay_rate: f64) -> Option<MoodVector> {
    let ages: Vec<f64> = records.iter().map(|r| age_minutes(now, r.recorded_at)).collect();
    let youngest = ages.iter().copied().reduce(f64::min)?;

    // Weights are taken relative to the youngest record. The ratio is the
    // same, but the largest weight is exactly 1 so the sum cannot underflow.
    let mut sums = [0.0f64; 4];
    let mut total_weight = 0.0f64;
    for (record, age) in records.iter().zip(&ages) {
        let weight = (-decay_rate * (age - youngest)).exp();
        for (sum, component) in sums.iter_mut().zip(record.mood.components()) {
            *sum += weight * component;
        }
        total_weight += weight;
    }

    Some(MoodVector::from_components(sums.map(|s| s / total_weight)))
}

fn age_minutes(now: DateTime<Utc>, recorded_at: DateTime<Utc>) -> f64 {
    let millis = (now - recorded_at).num_milliseconds().max(0);
    millis as f64 / 60_000.0
}

/// Mood summary over a period, with unweighted averages.
#[derive(Debug, Clone, Serialize)]
pub struct MoodStatistics {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub records: Vec<MoodRecord>,
    pub average: MoodVector,
}

/// Reads mood records and reduces them to a single vector.
#[derive(Clone)]
pub struct MoodAggregator {
    db: Database,
}

impl MoodAggregator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Current mood for `user_id` over the last `window`.
    pub async fn compute_current_mood(
        &self,
        user_id: i64,
        window: Duration,
        decay_rate: f64,
    ) -> Result<MoodVector, AppError> {
        self.compute_current_mood_at(user_id, window, decay_rate, Utc::now())
            .await
    }

    /// Same as [`Self::compute_current_mood`] with an explicit clock.
    pub async fn compute_current_mood_at(
        &self,
        user_id: i64,
        window: Duration,
        decay_rate: f64,
        now: DateTime<Utc>,
    ) -> Result<MoodVector, AppError> {
        if !decay_rate.is_finite() || decay_rate < 0.0 {
            return Err(AppError::BadRequest(
                "decay_rate must be a non-negative number".to_string(),
            ));
        }
        if window <= Duration::zero() {
            return Err(AppError::BadRequest("window must be positive".to_string()));
        }

        let since = now
            .checked_sub_signed(window)
            .ok_or_else(|| AppError::BadRequest("window is too large".to_string()))?;
        let records = self.db.mood_records_between(user_id, since, now).await?;

        let mood = decayed_mean(&records, now, decay_rate).ok_or_else(|| {
            AppError::NoData(format!(
                "No mood records in the last {} minutes",
                window.num_minutes()
            ))
        })?;

        tracing::debug!(
            user_id,
            records = records.len(),
            decay_rate,
            "Computed current mood"
        );
        Ok(mood)
    }

    /// Records and unweighted averages over the last `days` days.
    ///
    /// An empty period yields zero averages rather than an error.
    pub async fn statistics(&self, user_id: i64, days: i64) -> Result<MoodStatistics, AppError> {
        let end_date = Utc::now();
        let start_date = end_date - Duration::days(days);

        let records = self
            .db
            .mood_records_between(user_id, start_date, end_date)
            .await?;
        let average = decayed_mean(&records, end_date, 0.0).unwrap_or_default();

        Ok(MoodStatistics {
            start_date,
            end_date,
            records,
            average,
        })
    }
}
