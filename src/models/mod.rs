//! Data models for spinstats
//!
//! This module contains the core data structures shared across the application.

mod track;

pub use track::{Rank, TrackCollection, TrackEntry};
