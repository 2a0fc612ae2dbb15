//! Spotify client - client-credentials auth and best-effort track lookup

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::config::Config;
use crate::utils::parsers::clean_search_title;

const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const SPOTIFY_SEARCH_URL: &str = "https://api.spotify.com/v1/search";

/// Catalog failure. An auth failure aborts the whole sync; a search failure
/// is soft and degrades to the scrobbler's own art and link.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no access token in response")]
    MissingToken,
}

/// Artwork and page link resolved from the catalog for one track
#[derive(Debug, Clone, PartialEq)]
pub struct TrackMatch {
    /// First (highest-resolution) album artwork URL
    pub image: String,
    /// Canonical catalog page URL
    pub link: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: Option<SearchTracks>,
}

#[derive(Debug, Deserialize)]
struct SearchTracks {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    album: AlbumRef,
    #[serde(default)]
    external_urls: ExternalUrls,
}

#[derive(Debug, Default, Deserialize)]
struct AlbumRef {
    #[serde(default)]
    images: Vec<ImageRef>,
}

#[derive(Debug, Deserialize)]
struct ImageRef {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalUrls {
    #[serde(default)]
    spotify: Option<String>,
}

/// Spotify client for track enrichment
pub struct SpotifyClient {
    client: Client,
    token_url: String,
    search_url: String,
    client_id: String,
    client_secret: String,
}

impl SpotifyClient {
    pub fn from_config(config: &Config) -> Self {
        Self {
            client: Client::new(),
            token_url: SPOTIFY_TOKEN_URL.to_string(),
            search_url: SPOTIFY_SEARCH_URL.to_string(),
            client_id: config.spotify_client_id.clone(),
            client_secret: config.spotify_client_secret.clone(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_endpoints(token_url: String, search_url: String) -> Self {
        Self {
            client: Client::new(),
            token_url,
            search_url,
            client_id: "test-id".to_string(),
            client_secret: "test-secret".to_string(),
        }
    }

    /// Exchange client credentials for a bearer token
    pub async fn request_token(&self) -> Result<String, CatalogError> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let resp = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await?;

        let payload: TokenResponse = resp.json().await?;
        payload
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(CatalogError::MissingToken)
    }

    /// Search the catalog for a track and return its artwork and page link.
    ///
    /// The title is normalized for the query only; the first result wins.
    /// `Ok(None)` means no usable match, which the caller resolves through
    /// the scrobbler-side fallbacks.
    pub async fn search_track(
        &self,
        artist: &str,
        title: &str,
        token: &str,
    ) -> Result<Option<TrackMatch>, CatalogError> {
        let query = format!("track:{} artist:{}", clean_search_title(title), artist);

        let resp = self
            .client
            .get(&self.search_url)
            .query(&[("q", query.as_str()), ("type", "track"), ("limit", "1")])
            .bearer_auth(token)
            .send()
            .await?;

        let payload: SearchResponse = resp.json().await?;
        Ok(first_match(payload))
    }
}

// a match needs both the artwork and the page link; anything less falls
// back to the scrobbler's own data
fn first_match(payload: SearchResponse) -> Option<TrackMatch> {
    let item = payload.tracks?.items.into_iter().next()?;
    let image = item.album.images.into_iter().next()?.url;
    let link = item.external_urls.spotify?;
    Some(TrackMatch { image, link })
}
