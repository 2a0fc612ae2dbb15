//! Ranked track models - the shape of the cache file and the /music payload

use serde::{Deserialize, Serialize};

/// Rank of a track within its listening period.
///
/// Last.fm reports the rank as a JSON string; older cache files may hold
/// numbers. The value is carried through untouched rather than coerced,
/// so a stored file always round-trips byte-compatibly with upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rank {
    Number(u64),
    Text(String),
}

impl Default for Rank {
    fn default() -> Self {
        Rank::Number(0)
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rank::Number(n) => write!(f, "{}", n),
            Rank::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One ranked listening record, enriched with art and a page link.
///
/// Every field has a serde default: cache entries are loaded as-is without
/// per-entry schema validation, so a partially-shaped entry yields empty
/// strings and zeroes instead of failing the whole file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackEntry {
    #[serde(default)]
    pub rank: Rank,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub playcount: u64,
    /// Artwork URL, empty when neither source resolved any
    #[serde(default)]
    pub image: String,
    /// Catalog page URL, or the scrobbler's own track page as fallback
    #[serde(default)]
    pub link: String,
}

/// The two-keyed persisted structure holding ranked, enriched track entries.
///
/// Both keys are always present in serialized output, even when empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackCollection {
    #[serde(default)]
    pub recent: Vec<TrackEntry>,
    #[serde(default)]
    pub alltime: Vec<TrackEntry>,
}

impl TrackCollection {
    pub fn is_empty(&self) -> bool {
        self.recent.is_empty() && self.alltime.is_empty()
    }
}
