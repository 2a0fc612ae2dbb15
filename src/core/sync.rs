//! Sync engine - full refresh of the track cache from both upstreams
//!
//! One run authenticates with the catalog, pulls both ranked period lists
//! from the scrobbler, enriches every entry with artwork and a page link,
//! and atomically replaces the cache file. Step-level failures degrade to
//! partial data; only an auth failure aborts the run outright.

use std::time::Duration;

use thiserror::Error;
use tokio::time;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::core::cache::{CacheError, TrackCache};
use crate::models::{TrackCollection, TrackEntry};
use crate::plugins::{CatalogError, LastFmClient, Period, RawTrack, SpotifyClient, TrackMatch};

/// Pause after each track lookup to stay under the catalog's rate ceiling.
/// Unconditional, not adaptive.
const ENRICH_DELAY: Duration = Duration::from_millis(50);

/// Failure that escapes a sync run. The gatekeeper logs and absorbs it;
/// the previous cache file stays untouched either way.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("catalog authentication failed: {0}")]
    Auth(#[source] CatalogError),
    #[error("persisting cache file failed: {0}")]
    Persist(#[source] CacheError),
}

/// Orchestrates one full cache refresh
pub struct SyncEngine {
    lastfm: LastFmClient,
    spotify: SpotifyClient,
    cache: TrackCache,
}

impl SyncEngine {
    pub fn from_config(config: &Config) -> Self {
        Self {
            lastfm: LastFmClient::from_config(config),
            spotify: SpotifyClient::from_config(config),
            cache: TrackCache::from_config(config),
        }
    }

    /// Run one full sync and overwrite the cache file.
    ///
    /// Auth failure aborts before anything is fetched or written. Fetch and
    /// enrichment failures degrade to empty periods or fallback fields and
    /// the run still persists its result.
    pub async fn sync(&self) -> Result<(), SyncError> {
        let token = self.spotify.request_token().await.map_err(SyncError::Auth)?;

        let recent = self.collect_period(Period::Recent, &token).await;
        let alltime = self.collect_period(Period::Alltime, &token).await;

        let collection = TrackCollection { recent, alltime };
        if collection.is_empty() {
            warn!("sync produced an empty collection, writing it anyway");
        }

        self.cache.store(&collection).map_err(SyncError::Persist)?;

        info!(
            "sync complete: {} recent / {} all-time tracks written to {}",
            collection.recent.len(),
            collection.alltime.len(),
            self.cache.path().display()
        );

        Ok(())
    }

    /// Fetch and enrich one period. Failures here are period-local: the
    /// other period is unaffected.
    async fn collect_period(&self, period: Period, token: &str) -> Vec<TrackEntry> {
        let raw = match self.lastfm.top_tracks(period).await {
            Ok(tracks) => tracks,
            Err(e) => {
                error!("fetching {} top tracks failed: {}", period, e);
                return Vec::new();
            }
        };

        info!("fetched {} tracks for period {}", raw.len(), period);

        let mut entries = Vec::with_capacity(raw.len());
        for track in raw {
            let lookup = match self
                .spotify
                .search_track(&track.artist, &track.title, token)
                .await
            {
                Ok(lookup) => lookup,
                Err(e) => {
                    warn!("catalog lookup for '{}' failed: {}", track.title, e);
                    None
                }
            };

            entries.push(compose_entry(track, lookup));
            time::sleep(ENRICH_DELAY).await;
        }

        entries
    }
}

/// Merge a raw scrobbler record with an optional catalog match.
///
/// No catalog artwork falls back to the scrobbler's own image (empty string
/// when it has none); no catalog link falls back to the scrobbler's track
/// page, which is always present.
fn compose_entry(raw: RawTrack, lookup: Option<TrackMatch>) -> TrackEntry {
    let (image, link) = match lookup {
        Some(m) => (m.image, m.link),
        None => (raw.image, raw.url),
    };

    TrackEntry {
        rank: raw.rank,
        title: raw.title,
        artist: raw.artist,
        playcount: raw.playcount,
        image,
        link,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Rank;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn raw_track() -> RawTrack {
        RawTrack {
            rank: Rank::Text("1".to_string()),
            title: "Song Title".to_string(),
            artist: "Band".to_string(),
            playcount: 123,
            image: "l.jpg".to_string(),
            url: "http://x/track".to_string(),
        }
    }

    #[test]
    fn test_compose_entry_fallbacks() {
        let entry = compose_entry(raw_track(), None);
        assert_eq!(entry.image, "l.jpg");
        assert_eq!(entry.link, "http://x/track");
        assert_eq!(entry.playcount, 123);
    }

    #[test]
    fn test_compose_entry_prefers_catalog_match() {
        let lookup = Some(TrackMatch {
            image: "http://img/640.jpg".to_string(),
            link: "http://open/track/abc".to_string(),
        });

        let entry = compose_entry(raw_track(), lookup);
        assert_eq!(entry.image, "http://img/640.jpg");
        assert_eq!(entry.link, "http://open/track/abc");
        assert_eq!(entry.rank, Rank::Text("1".to_string()));
    }

    #[test]
    fn test_compose_entry_empty_scrobbler_image() {
        let mut raw = raw_track();
        raw.image = String::new();

        let entry = compose_entry(raw, None);
        assert_eq!(entry.image, "");
        assert_eq!(entry.link, "http://x/track");
    }

    // minimal canned-response http server, one response per connection
    async fn spawn_server<F>(respond: F) -> String
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let respond = Arc::new(respond);

        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let respond = Arc::clone(&respond);
                tokio::spawn(async move {
                    handle_connection(socket, respond).await;
                });
            }
        });

        format!("http://{}", addr)
    }

    async fn handle_connection(
        mut socket: TcpStream,
        respond: Arc<dyn Fn(&str) -> String + Send + Sync>,
    ) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        let header_end = loop {
            let n = match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            if buf.len() > 64 * 1024 {
                return;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let target = head
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .unwrap_or("/")
            .to_string();

        // drain any request body before answering
        let content_length: usize = head
            .lines()
            .find_map(|line| {
                let (key, value) = line.split_once(':')?;
                key.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse().ok())
                    .flatten()
            })
            .unwrap_or(0);

        let mut body_read = buf.len() - header_end;
        while body_read < content_length {
            match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => body_read += n,
            }
        }

        let body = respond(&target);
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
    }

    fn engine_against(base: &str, cache: TrackCache) -> SyncEngine {
        SyncEngine {
            lastfm: LastFmClient::with_endpoint(format!("{}/lastfm", base)),
            spotify: SpotifyClient::with_endpoints(
                format!("{}/token", base),
                format!("{}/search", base),
            ),
            cache,
        }
    }

    fn cache_in(dir: &TempDir) -> TrackCache {
        let config = Config {
            cache_file: dir.path().join("songs.json"),
            ..Config::default()
        };
        TrackCache::from_config(&config)
    }

    fn top_tracks_payload() -> String {
        serde_json::json!({
            "toptracks": {
                "track": [{
                    "name": "Song Title",
                    "artist": { "name": "Band" },
                    "playcount": "123",
                    "url": "http://x/track",
                    "image": [
                        { "size": "small", "#text": "s.jpg" },
                        { "size": "medium", "#text": "m.jpg" },
                        { "size": "large", "#text": "l.jpg" }
                    ],
                    "@attr": { "rank": "1" }
                }]
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_sync_degrades_failed_period_and_falls_back() {
        // all-time fetch errors out, catalog search finds nothing
        let base = spawn_server(|target| {
            if target.starts_with("/token") {
                r#"{"access_token":"tok"}"#.to_string()
            } else if target.starts_with("/lastfm") {
                if target.contains("period=overall") {
                    r#"{"error":8,"message":"Operation failed"}"#.to_string()
                } else {
                    top_tracks_payload()
                }
            } else {
                r#"{"tracks":{"items":[]}}"#.to_string()
            }
        })
        .await;

        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        let engine = engine_against(&base, cache.clone());

        engine.sync().await.unwrap();

        let collection = cache.load();
        assert_eq!(collection.recent.len(), 1);
        assert!(collection.alltime.is_empty());

        let entry = &collection.recent[0];
        assert_eq!(entry.rank, Rank::Text("1".to_string()));
        assert_eq!(entry.image, "l.jpg");
        assert_eq!(entry.link, "http://x/track");
    }

    #[tokio::test]
    async fn test_sync_applies_catalog_enrichment() {
        let base = spawn_server(|target| {
            if target.starts_with("/token") {
                r#"{"access_token":"tok"}"#.to_string()
            } else if target.starts_with("/lastfm") {
                top_tracks_payload()
            } else {
                serde_json::json!({
                    "tracks": {
                        "items": [{
                            "album": { "images": [{ "url": "http://img/640.jpg" }] },
                            "external_urls": { "spotify": "http://open/track/abc" }
                        }]
                    }
                })
                .to_string()
            }
        })
        .await;

        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        let engine = engine_against(&base, cache.clone());

        engine.sync().await.unwrap();

        let collection = cache.load();
        let entry = &collection.recent[0];
        assert_eq!(entry.image, "http://img/640.jpg");
        assert_eq!(entry.link, "http://open/track/abc");
        // scrobbler fields survive enrichment untouched
        assert_eq!(entry.title, "Song Title");
        assert_eq!(entry.playcount, 123);
    }

    #[tokio::test]
    async fn test_auth_failure_aborts_without_write() {
        let base = spawn_server(|target| {
            if target.starts_with("/token") {
                r#"{"error":"invalid_client"}"#.to_string()
            } else {
                top_tracks_payload()
            }
        })
        .await;

        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        let engine = engine_against(&base, cache.clone());

        let err = engine.sync().await.unwrap_err();
        assert!(matches!(err, SyncError::Auth(_)));
        assert!(!cache.path().exists());
        assert_eq!(cache.load(), TrackCollection::default());
    }
}
