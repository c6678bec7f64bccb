use std::sync::Arc;

use async_trait::async_trait;
use net::{NetworkEngine, NetworkRequest, RequestType, RetryParameters};
use tokio_util::sync::CancellationToken;

use crate::error::DrmError;

/// License-server transport seam (spec §4.F: "engine calls the network,
/// applying a request filter, response passes through a response filter").
/// Split out from `NetworkEngine` itself so tests can swap in a canned
/// responder without spinning up HTTP.
#[async_trait]
pub trait LicenseTransport: Send + Sync {
    async fn request_license(
        &self,
        uri: &str,
        request_body: Vec<u8>,
        token: &CancellationToken,
    ) -> Result<Vec<u8>, DrmError>;
}

/// Default transport: routes license requests through the shared
/// [`NetworkEngine`] tagged `RequestType::License`, so they share the
/// engine's filter chain, concurrency quota and retry policy.
pub struct NetworkLicenseTransport {
    network: Arc<NetworkEngine>,
    retry: RetryParameters,
}

impl NetworkLicenseTransport {
    pub fn new(network: Arc<NetworkEngine>, retry: RetryParameters) -> Self {
        Self { network, retry }
    }
}

#[async_trait]
impl LicenseTransport for NetworkLicenseTransport {
    async fn request_license(
        &self,
        uri: &str,
        request_body: Vec<u8>,
        token: &CancellationToken,
    ) -> Result<Vec<u8>, DrmError> {
        let request = NetworkRequest::post(RequestType::License, uri, request_body);
        let response = self
            .network
            .fetch(request, &self.retry, token)
            .await
            .map_err(|e| DrmError::LicenseRequestFailed {
                key_system: String::new(),
                reason: e.to_string(),
            })?;
        Ok(response.body.to_vec())
    }
}
