use crate::http::response::{passthrough, ApiError};
use actix_web::web::{Data, Query};
use actix_web::HttpResponse;
use download_tasks::DEFAULT_QUALITY;
use music_api::{MusicApiClient, TrackUrl};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    source: String,
    #[serde(default)]
    keyword: String,
    limit: Option<u32>,
}

pub(crate) async fn search(
    music_api: Data<Arc<MusicApiClient>>,
    query: Query<SearchQuery>,
) -> Result<HttpResponse, ApiError> {
    if query.source.is_empty() || query.keyword.is_empty() {
        return Err(ApiError::MissingParameters);
    }

    let response = music_api
        .search(&query.source, &query.keyword, query.limit)
        .await?;

    Ok(passthrough(response))
}

#[derive(Deserialize)]
pub(crate) struct TrackUrlQuery {
    #[serde(default)]
    source: String,
    #[serde(default)]
    id: String,
    br: Option<String>,
}

pub(crate) async fn track_url(
    music_api: Data<Arc<MusicApiClient>>,
    query: Query<TrackUrlQuery>,
) -> Result<HttpResponse, ApiError> {
    if query.source.is_empty() || query.id.is_empty() {
        return Err(ApiError::MissingParameters);
    }

    let br = query.br.as_deref().unwrap_or(DEFAULT_QUALITY);

    match music_api.track_url(&query.source, &query.id, br).await? {
        TrackUrl::Redirect { url, source_switch } => Ok(HttpResponse::Ok().json(json!({
            "code": 200,
            "url": url,
            "sourceSwitch": source_switch.unwrap_or_default(),
        }))),
        TrackUrl::Upstream(response) => Ok(passthrough(response)),
    }
}

#[derive(Deserialize)]
pub(crate) struct ToplistsQuery {
    #[serde(default)]
    source: String,
}

pub(crate) async fn toplists(
    music_api: Data<Arc<MusicApiClient>>,
    query: Query<ToplistsQuery>,
) -> Result<HttpResponse, ApiError> {
    if query.source.is_empty() {
        return Err(ApiError::MissingParameters);
    }

    Ok(passthrough(music_api.toplists(&query.source).await?))
}

#[derive(Deserialize)]
pub(crate) struct ToplistQuery {
    #[serde(default)]
    source: String,
    #[serde(default)]
    id: String,
}

pub(crate) async fn toplist(
    music_api: Data<Arc<MusicApiClient>>,
    query: Query<ToplistQuery>,
) -> Result<HttpResponse, ApiError> {
    if query.source.is_empty() || query.id.is_empty() {
        return Err(ApiError::MissingParameters);
    }

    Ok(passthrough(music_api.toplist(&query.source, &query.id).await?))
}
