use crate::aggregator::parser::{parse_playlist, parse_track_url, ParseError};
use crate::{PlaylistLookup, RawResponse, RequestType, TrackUrl};
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use serde::Serialize;
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "https://music-dl.sayqz.com";
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;

const SOURCE_SWITCH_HEADER: &str = "X-Source-Switch";

#[derive(Debug, thiserror::Error)]
pub enum MusicApiError {
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),
    #[error(transparent)]
    ParseError(#[from] ParseError),
}

#[derive(Serialize)]
struct ApiQuery<'a> {
    source: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    keyword: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    br: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

impl<'a> ApiQuery<'a> {
    fn new(source: &'a str, kind: RequestType) -> Self {
        Self {
            source,
            kind: kind.as_str(),
            keyword: None,
            id: None,
            br: None,
            limit: None,
        }
    }
}

pub struct MusicApiClient {
    endpoint: String,
    client: Client,
    // Used for `type=url` lookups where the 302 itself is the answer.
    manual_redirect_client: Client,
}

impl MusicApiClient {
    pub fn create(endpoint: &str) -> Result<Self, MusicApiError> {
        let client = Client::builder().redirect(Policy::limited(10)).build()?;
        let manual_redirect_client = Client::builder().redirect(Policy::none()).build()?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
            manual_redirect_client,
        })
    }

    pub(crate) fn api_url(&self) -> String {
        format!("{}/api/", self.endpoint)
    }

    pub async fn search(
        &self,
        source: &str,
        keyword: &str,
        limit: Option<u32>,
    ) -> Result<RawResponse, MusicApiError> {
        let query = ApiQuery {
            keyword: Some(keyword),
            limit: Some(limit.unwrap_or(DEFAULT_SEARCH_LIMIT)),
            ..ApiQuery::new(source, RequestType::Search)
        };

        self.get_raw(&query).await
    }

    pub async fn toplists(&self, source: &str) -> Result<RawResponse, MusicApiError> {
        self.get_raw(&ApiQuery::new(source, RequestType::Toplists))
            .await
    }

    pub async fn toplist(&self, source: &str, id: &str) -> Result<RawResponse, MusicApiError> {
        let query = ApiQuery {
            id: Some(id),
            ..ApiQuery::new(source, RequestType::Toplist)
        };

        self.get_raw(&query).await
    }

    pub async fn track_url(
        &self,
        source: &str,
        id: &str,
        br: &str,
    ) -> Result<TrackUrl, MusicApiError> {
        let query = ApiQuery {
            id: Some(id),
            br: Some(br),
            ..ApiQuery::new(source, RequestType::Url)
        };

        let response = self
            .manual_redirect_client
            .get(self.api_url())
            .query(&query)
            .send()
            .await?;

        let status = response.status().as_u16();
        let location = header_value(&response, LOCATION.as_str());
        let source_switch = header_value(&response, SOURCE_SWITCH_HEADER);
        let body = response.bytes().await?.to_vec();

        debug!(source, id, status, "Resolved track url");

        Ok(parse_track_url(
            status,
            location.as_deref(),
            source_switch.as_deref(),
            body,
        ))
    }

    pub async fn playlist(&self, source: &str, id: &str) -> Result<PlaylistLookup, MusicApiError> {
        let query = ApiQuery {
            id: Some(id),
            ..ApiQuery::new(source, RequestType::Playlist)
        };

        let RawResponse { status, body } = self.get_raw(&query).await?;

        Ok(parse_playlist(status, body)?)
    }

    /// Opens the audio body of a track, following the upstream redirect.
    pub async fn open_track(
        &self,
        source: &str,
        id: &str,
        br: &str,
    ) -> Result<Response, MusicApiError> {
        let query = ApiQuery {
            id: Some(id),
            br: Some(br),
            ..ApiQuery::new(source, RequestType::Url)
        };

        let response = self
            .client
            .get(self.api_url())
            .query(&query)
            .send()
            .await?
            .error_for_status()?;

        Ok(response)
    }

    async fn get_raw(&self, query: &ApiQuery<'_>) -> Result<RawResponse, MusicApiError> {
        let response = self
            .client
            .get(self.api_url())
            .query(query)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        debug!(source = query.source, kind = query.kind, status, "Upstream responded");

        Ok(RawResponse { status, body })
    }
}

fn header_value(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}
