use reqwest::StatusCode;
use thiserror::Error;

/// Errors produced by the network engine.
///
/// Mirrors the `{severity, category, code}` shape used by every other crate
/// in the workspace: `category()` returns the streaming-spec category, and
/// `is_retryable()` is consulted by the streaming engine's failure
/// classification (transient HTTP vs. permanent HTTP).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("request cancelled")]
    Cancelled,

    #[error("invalid url '{input}': {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("unsupported uri scheme: {scheme}")]
    SchemeNotSupported { scheme: String },

    #[error("malformed data uri")]
    MalformedDataUri,

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("http status {status} for {operation} {url}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        operation: &'static str,
    },

    #[error("request timed out after {elapsed_ms}ms: {reason}")]
    Timeout { elapsed_ms: u64, reason: String },

    #[error("request filter failed: {reason}")]
    RequestFilter { reason: String },

    #[error("response filter failed: {reason}")]
    ResponseFilter { reason: String },

    #[error("proxy configuration error: {reason}")]
    ProxyConfiguration { reason: String },
}

impl NetworkError {
    pub fn category(&self) -> &'static str {
        "network"
    }

    pub fn code(&self) -> &'static str {
        match self {
            NetworkError::Cancelled => "CANCELLED",
            NetworkError::InvalidUrl { .. } => "MALFORMED_DATA_URI",
            NetworkError::SchemeNotSupported { .. } => "SCHEME_NOT_SUPPORTED",
            NetworkError::MalformedDataUri => "MALFORMED_DATA_URI",
            NetworkError::Transport(_) => "HTTP_ERROR",
            NetworkError::HttpStatus { .. } => "HTTP_ERROR",
            NetworkError::Timeout { .. } => "TIMEOUT",
            NetworkError::RequestFilter { .. } => "REQUEST_FILTER_ERROR",
            NetworkError::ResponseFilter { .. } => "RESPONSE_FILTER_ERROR",
            NetworkError::ProxyConfiguration { .. } => "SCHEME_NOT_SUPPORTED",
        }
    }

    /// Whether the streaming engine should retry this request with
    /// back-off rather than treat it as permanent.
    pub fn is_retryable(&self) -> bool {
        match self {
            NetworkError::HttpStatus { status, .. } => {
                status.as_u16() == 408
                    || status.as_u16() == 429
                    || status.is_server_error()
            }
            NetworkError::Timeout { .. } => true,
            NetworkError::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    pub fn invalid_url(input: impl Into<String>, reason: impl Into<String>) -> Self {
        NetworkError::InvalidUrl {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn http_status(status: StatusCode, url: impl Into<String>, operation: &'static str) -> Self {
        NetworkError::HttpStatus {
            status,
            url: url.into(),
            operation,
        }
    }
}
