use crate::http::response::{with_data, ApiError};
use actix_web::web::{Data, Query};
use actix_web::HttpResponse;
use download_tasks::DownloadTracker;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

pub(crate) async fn get_library(tracker: Data<Arc<DownloadTracker>>) -> HttpResponse {
    with_data(tracker.library().await)
}

pub(crate) async fn refresh_library(
    tracker: Data<Arc<DownloadTracker>>,
) -> Result<HttpResponse, ApiError> {
    let removed = tracker.validate_library().await?;

    Ok(HttpResponse::Ok().json(json!({
        "code": 200,
        "message": "library refreshed",
        "removed": removed,
        "data": tracker.library().await,
    })))
}

#[derive(Deserialize)]
pub(crate) struct DownloadedQuery {
    #[serde(default)]
    ids: String,
    #[serde(default)]
    source: String,
}

pub(crate) async fn downloaded(
    tracker: Data<Arc<DownloadTracker>>,
    query: Query<DownloadedQuery>,
) -> HttpResponse {
    let ids: Vec<String> = query
        .ids
        .split(',')
        .filter(|id| !id.is_empty())
        .map(ToString::to_string)
        .collect();

    with_data(tracker.is_downloaded(&ids, &query.source).await)
}
