use async_trait::async_trait;
use download_tasks::{TrackSource, TrackSourceError, TrackStream};
use futures_util::StreamExt;
use music_api::MusicApiClient;
use std::sync::Arc;

pub(crate) struct ApiTrackSource(pub(crate) Arc<MusicApiClient>);

#[async_trait]
impl TrackSource for ApiTrackSource {
    async fn open_track(
        &self,
        source: &str,
        id: &str,
        quality: &str,
    ) -> Result<TrackStream, TrackSourceError> {
        let response = MusicApiClient::open_track(&self.0, source, id, quality)
            .await
            .map_err(|error| TrackSourceError(Box::new(error)))?;

        let content_length = response.content_length();
        let chunks = response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|error| TrackSourceError(Box::new(error)))
            })
            .boxed();

        Ok(TrackStream {
            content_length,
            chunks,
        })
    }
}
