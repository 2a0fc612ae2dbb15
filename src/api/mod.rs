//! HTTP routes for spinstats

pub mod music;

use actix_web::web;

use crate::core::{SyncEngine, TrackCache};

/// Per-process state handed to the route handlers
pub struct AppState {
    pub cache: TrackCache,
    pub engine: SyncEngine,
}

/// Configure all routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(music::landing).service(music::music);
}
