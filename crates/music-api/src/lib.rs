mod aggregator;

use serde::{Deserialize, Deserializer, Serialize};

pub use aggregator::*;

/// Kind of lookup understood by the aggregator's `/api/` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Search,
    Url,
    Toplists,
    Toplist,
    Playlist,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Search => "search",
            RequestType::Url => "url",
            RequestType::Toplists => "toplists",
            RequestType::Toplist => "toplist",
            RequestType::Playlist => "playlist",
        }
    }
}

/// Upstream answer forwarded as-is to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackUrl {
    Redirect {
        url: String,
        source_switch: Option<String>,
    },
    Upstream(RawResponse),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistTrack {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaylistInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaylistDetails {
    #[serde(default)]
    pub info: PlaylistInfo,
    #[serde(default)]
    pub list: Vec<PlaylistTrack>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistLookup {
    Found(PlaylistDetails),
    Upstream(RawResponse),
}

// Some providers send numeric track ids.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}
