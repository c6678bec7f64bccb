use thiserror::Error;

/// Player-level errors (spec §4.K operations), folding in every component
/// error the same way `streaming-engine`'s `EngineError` folds in its own
/// dependencies.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("attach a media sink before loading")]
    NotAttached,

    #[error("no content loaded")]
    NotLoaded,

    #[error("manifest has no periods")]
    EmptyManifest,

    #[error("unknown track")]
    UnknownTrack,

    #[error("network error: {0}")]
    Network(#[from] net::NetworkError),

    #[error("manifest error: {0}")]
    Manifest(#[from] manifest::ManifestError),

    #[error("media source error: {0}")]
    MediaSource(#[from] media_source::MediaError),

    #[error("streaming engine error: {0}")]
    Engine(#[from] streaming_engine::EngineError),
}
