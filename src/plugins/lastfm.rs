//! Last.fm client - fetches a user's ranked top tracks per period

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::config::Config;
use crate::models::Rank;

const LASTFM_API_URL: &str = "https://ws.audioscrobbler.com/2.0/";

/// Upstream cap on entries per period
const TRACK_LIMIT: u32 = 50;

/// Named listening-history window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// Trailing 7 days
    Recent,
    /// All-time
    Alltime,
}

impl Period {
    /// The period name the Last.fm API expects
    pub fn api_name(&self) -> &'static str {
        match self {
            Period::Recent => "7day",
            Period::Alltime => "overall",
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.api_name())
    }
}

/// Scrobbler fetch failure, logged by the sync engine and degraded to an
/// empty sequence for the affected period.
#[derive(Debug, Error)]
pub enum ScrobblerError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("scrobbler error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("top tracks missing from response")]
    MalformedResponse,
}

/// One raw ranked track record, before catalog enrichment
#[derive(Debug, Clone)]
pub struct RawTrack {
    pub rank: Rank,
    pub title: String,
    pub artist: String,
    pub playcount: u64,
    /// Scrobbler's own artwork URL (largest size), may be empty
    pub image: String,
    /// Scrobbler's canonical track page URL
    pub url: String,
}

/// Last.fm API response for user.gettoptracks
#[derive(Debug, Deserialize)]
struct TopTracksResponse {
    toptracks: Option<TopTracks>,
    #[serde(default)]
    error: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TopTracks {
    #[serde(default)]
    track: Vec<TopTrack>,
}

#[derive(Debug, Deserialize)]
struct TopTrack {
    name: String,
    artist: ArtistRef,
    #[serde(default)]
    playcount: Option<Playcount>,
    url: String,
    #[serde(default)]
    image: Vec<ImageRef>,
    #[serde(rename = "@attr")]
    attr: RankAttr,
}

#[derive(Debug, Deserialize)]
struct ArtistRef {
    name: String,
}

// the API sends playcount as a string; tolerate numbers too
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Playcount {
    Number(u64),
    Text(String),
}

impl Playcount {
    fn as_count(&self) -> u64 {
        match self {
            Playcount::Number(n) => *n,
            Playcount::Text(s) => s.trim().parse().unwrap_or(0),
        }
    }
}

/// Image URLs come size-ordered, smallest first
#[derive(Debug, Deserialize)]
struct ImageRef {
    #[serde(rename = "#text", default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct RankAttr {
    rank: Rank,
}

/// Last.fm client for top-track retrieval
pub struct LastFmClient {
    client: Client,
    api_url: String,
    api_key: String,
    username: String,
}

impl LastFmClient {
    pub fn from_config(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_url: LASTFM_API_URL.to_string(),
            api_key: config.lastfm_api_key.clone(),
            username: config.lastfm_username.clone(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_endpoint(api_url: String) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key: "test-key".to_string(),
            username: "listener".to_string(),
        }
    }

    /// Fetch the user's ranked top tracks for a period, capped at 50 by the
    /// API's own limit.
    pub async fn top_tracks(&self, period: Period) -> Result<Vec<RawTrack>, ScrobblerError> {
        let limit = TRACK_LIMIT.to_string();
        let resp = self
            .client
            .get(&self.api_url)
            .query(&[
                ("method", "user.gettoptracks"),
                ("user", self.username.as_str()),
                ("api_key", self.api_key.as_str()),
                ("format", "json"),
                ("period", period.api_name()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        let payload: TopTracksResponse = resp.json().await?;
        parse_top_tracks(payload)
    }
}

fn parse_top_tracks(payload: TopTracksResponse) -> Result<Vec<RawTrack>, ScrobblerError> {
    if let Some(code) = payload.error {
        return Err(ScrobblerError::Api {
            code,
            message: payload.message.unwrap_or_default(),
        });
    }

    let tracks = payload.toptracks.ok_or(ScrobblerError::MalformedResponse)?;

    Ok(tracks
        .track
        .into_iter()
        .map(|t| RawTrack {
            rank: t.attr.rank,
            title: t.name,
            artist: t.artist.name,
            playcount: t.playcount.map(|p| p.as_count()).unwrap_or(0),
            image: t.image.last().map(|i| i.text.clone()).unwrap_or_default(),
            url: t.url,
        })
        .collect())
}
