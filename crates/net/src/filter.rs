use async_trait::async_trait;
use reqwest::header::HeaderMap;

use crate::error::NetworkError;
use crate::request::{NetworkRequest, NetworkResponse};

/// A request filter mutates method/URI/headers before the request is sent.
///
/// Grounded on spec §6 ("Request filters can mutate method/URI/headers;
/// response filters can mutate body/headers") and on the teacher's
/// `SegmentTransformer`/`SegmentDownloader` traits, which apply the same
/// mutate-in-place-before-`fetch` shape.
#[async_trait]
pub trait RequestFilter: Send + Sync {
    async fn filter(&self, request: &mut NetworkRequest) -> Result<(), NetworkError>;
}

#[async_trait]
pub trait ResponseFilter: Send + Sync {
    async fn filter(&self, response: &mut NetworkResponse) -> Result<(), NetworkError>;
}

/// Ordered chain of filters, run in registration order.
#[derive(Default)]
pub struct FilterChain {
    request_filters: Vec<Box<dyn RequestFilter>>,
    response_filters: Vec<Box<dyn ResponseFilter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_request_filter(&mut self, filter: Box<dyn RequestFilter>) {
        self.request_filters.push(filter);
    }

    pub fn add_response_filter(&mut self, filter: Box<dyn ResponseFilter>) {
        self.response_filters.push(filter);
    }

    pub async fn apply_request(&self, request: &mut NetworkRequest) -> Result<(), NetworkError> {
        for filter in &self.request_filters {
            filter.filter(request).await.map_err(|e| NetworkError::RequestFilter {
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    pub async fn apply_response(&self, response: &mut NetworkResponse) -> Result<(), NetworkError> {
        for filter in &self.response_filters {
            filter
                .filter(response)
                .await
                .map_err(|e| NetworkError::ResponseFilter { reason: e.to_string() })?;
        }
        Ok(())
    }
}

/// A request filter that merges a fixed set of headers into every outgoing
/// request of a given [`crate::request::RequestType`], the common case for
/// auth tokens or a referrer policy.
pub struct HeaderInjector {
    pub headers: HeaderMap,
}

#[async_trait]
impl RequestFilter for HeaderInjector {
    async fn filter(&self, request: &mut NetworkRequest) -> Result<(), NetworkError> {
        for (name, value) in self.headers.iter() {
            request.headers.insert(name.clone(), value.clone());
        }
        Ok(())
    }
}
