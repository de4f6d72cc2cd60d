// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Normalized play events from the streaming provider.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One recently-played item. Built at the adapter boundary and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackPlay {
    pub id: String,
    pub name: String,
    /// Artist names joined with ", "
    pub artist: String,
    pub album: String,
    pub uri: String,
    pub played_at: DateTime<Utc>,
    pub preview_url: Option<String>,
}
