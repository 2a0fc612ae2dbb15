//! Upstream service clients for spinstats
//!
//! Thin wrappers around the scrobbling service (Last.fm) and the catalog
//! service (Spotify), each owning its own HTTP client and credentials.

pub mod lastfm;
pub mod spotify;

pub use lastfm::{LastFmClient, Period, RawTrack, ScrobblerError};
pub use spotify::{CatalogError, SpotifyClient, TrackMatch};
