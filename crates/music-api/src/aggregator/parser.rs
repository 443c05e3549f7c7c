use crate::{PlaylistDetails, PlaylistLookup, RawResponse, TrackUrl};
use serde::Deserialize;

const SUCCESS_CODE: i64 = 200;
const REDIRECT_STATUS: u16 = 302;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Unable to parse playlist response: {0}")]
    Json(#[from] serde_json::Error),
}

pub(crate) fn parse_track_url(
    status: u16,
    location: Option<&str>,
    source_switch: Option<&str>,
    body: Vec<u8>,
) -> TrackUrl {
    if status != REDIRECT_STATUS {
        return TrackUrl::Upstream(RawResponse { status, body });
    }

    TrackUrl::Redirect {
        url: location.unwrap_or_default().to_string(),
        source_switch: source_switch
            .filter(|value| !value.is_empty())
            .map(ToString::to_string),
    }
}

pub(crate) fn parse_playlist(status: u16, body: Vec<u8>) -> Result<PlaylistLookup, ParseError> {
    #[derive(Deserialize)]
    struct Envelope {
        code: i64,
        #[serde(default)]
        data: Option<PlaylistDetails>,
    }

    let envelope: Envelope = serde_json::from_slice(&body)?;

    if envelope.code != SUCCESS_CODE {
        return Ok(PlaylistLookup::Upstream(RawResponse { status, body }));
    }

    Ok(PlaylistLookup::Found(envelope.data.unwrap_or_default()))
}
