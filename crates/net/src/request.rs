use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::Method;

/// Request type tag, as required by spec §6: "Requests carry a type tag in
/// `{manifest, segment, license, app}`".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestType {
    Manifest,
    Segment,
    License,
    App,
}

#[derive(Debug, Clone)]
pub struct NetworkRequest {
    pub request_type: RequestType,
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl NetworkRequest {
    pub fn get(request_type: RequestType, uri: impl Into<String>) -> Self {
        Self {
            request_type,
            method: Method::GET,
            uri: uri.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn post(request_type: RequestType, uri: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            request_type,
            method: Method::POST,
            uri: uri.into(),
            headers: HeaderMap::new(),
            body: Some(body),
        }
    }

    /// A byte-range GET, used by the streaming engine for §4.B segment
    /// references that carry `[b0, b1]`.
    pub fn with_byte_range(mut self, start: u64, end: Option<u64>) -> Self {
        let value = match end {
            Some(end) => format!("bytes={start}-{end}"),
            None => format!("bytes={start}-"),
        };
        if let Ok(header_value) = reqwest::header::HeaderValue::from_str(&value) {
            self.headers.insert(reqwest::header::RANGE, header_value);
        }
        self
    }
}

/// Response carrying exactly the fields spec §6 names: "bytes, final URI
/// (after redirects), response headers, and a time-to-first-byte".
#[derive(Debug, Clone)]
pub struct NetworkResponse {
    pub status: reqwest::StatusCode,
    pub final_uri: String,
    pub headers: HeaderMap,
    pub body: bytes::Bytes,
    pub time_to_first_byte: Duration,
}

impl NetworkResponse {
    pub fn body_len(&self) -> usize {
        self.body.len()
    }
}
