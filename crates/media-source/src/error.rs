use thiserror::Error;

/// Media-category errors (spec §7).
#[derive(Debug, Error, Clone)]
pub enum MediaError {
    #[error("unsupported codec for {content_type:?}: {mime_type}")]
    UnsupportedCodec {
        content_type: manifest::ContentType,
        mime_type: String,
    },

    #[error("sink rejected append for capacity: {content_type:?}")]
    QuotaExceeded { content_type: manifest::ContentType },

    #[error("media source operation failed: {reason}")]
    OperationFailed { reason: String },

    #[error("operation aborted")]
    OperationAborted,

    #[error("buffer read out of bounds: {requested:?} not in {available:?}")]
    BufferReadOutOfBounds {
        requested: (f64, f64),
        available: (f64, f64),
    },
}

impl MediaError {
    pub fn category(&self) -> &'static str {
        "media"
    }

    pub fn code(&self) -> &'static str {
        match self {
            MediaError::UnsupportedCodec { .. } => "UNSUPPORTED_CODEC",
            MediaError::QuotaExceeded { .. } => "QUOTA_EXCEEDED_ERROR",
            MediaError::OperationFailed { .. } => "VIDEO_ERROR",
            MediaError::OperationAborted => "VIDEO_ERROR",
            MediaError::BufferReadOutOfBounds { .. } => "BUFFER_READ_OUT_OF_BOUNDS",
        }
    }
}
