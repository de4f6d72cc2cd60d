// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod mood;
pub mod track;
pub mod user;

pub use mood::{MoodRecord, MoodVector, NewMoodRecord, RecommendedSong};
pub use track::TrackPlay;
pub use user::{TokenGrant, User};
