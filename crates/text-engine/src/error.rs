use thiserror::Error;

/// Text-category errors (spec §7 category `text`).
#[derive(Debug, Error, Clone)]
pub enum TextError {
    #[error("no text parser registered for mime type {mime_type}")]
    UnsupportedTextFormat { mime_type: String },

    #[error("failed to parse cues: {reason}")]
    TextParseError { reason: String },
}

impl TextError {
    pub fn category(&self) -> &'static str {
        "text"
    }

    pub fn code(&self) -> &'static str {
        match self {
            TextError::UnsupportedTextFormat { .. } => "UNSUPPORTED_TEXT_FORMAT",
            TextError::TextParseError { .. } => "TEXT_PARSE_ERROR",
        }
    }
}
