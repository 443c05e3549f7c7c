mod library_storage;
mod track_source;

pub(crate) use track_source::ApiTrackSource;
