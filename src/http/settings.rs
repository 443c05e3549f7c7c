use crate::http::response::{with_data, with_message, ApiError};
use crate::storage::CatalogStore;
use actix_web::web::{Data, Json};
use actix_web::HttpResponse;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub(crate) struct SettingsUpdate {
    #[serde(default, rename = "downloadDir")]
    download_dir: String,
    #[serde(default)]
    quality: String,
}

pub(crate) async fn get_settings(catalog: Data<Arc<CatalogStore>>) -> HttpResponse {
    with_data(catalog.get_settings().await)
}

/// Empty fields keep their current value.
pub(crate) async fn update_settings(
    catalog: Data<Arc<CatalogStore>>,
    update: Json<SettingsUpdate>,
) -> Result<HttpResponse, ApiError> {
    catalog
        .update_settings(&update.download_dir, &update.quality)
        .await
        .map_err(ApiError::storage("failed to save settings"))?;

    Ok(with_message("settings saved"))
}
