use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::config::{NetworkConfig, RetryParameters};
use crate::error::NetworkError;
use crate::filter::FilterChain;
use crate::metrics::NetworkMetrics;
use crate::request::{NetworkRequest, NetworkResponse, RequestType};
use crate::retry::{retry_with_backoff, RetryAction};

/// The concrete implementation of spec §6's "Network scheme".
///
/// Generalizes the teacher's `mesio::hls::fetcher::SegmentFetcher` (which
/// only ever fetches segments) to the four request kinds the streaming
/// engine, manifest parser and DRM engine all need, each gated by its own
/// concurrency quota per §5 ("Network budget ... each type respects its
/// quota").
pub struct NetworkEngine {
    client: Client,
    filters: FilterChain,
    metrics: Arc<NetworkMetrics>,
    quotas: HashMap<RequestType, Arc<Semaphore>>,
}

impl NetworkEngine {
    pub fn new(config: &NetworkConfig) -> Result<Self, NetworkError> {
        Self::with_filters(config, FilterChain::new())
    }

    pub fn with_filters(config: &NetworkConfig, filters: FilterChain) -> Result<Self, NetworkError> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(config.headers.clone())
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            .danger_accept_invalid_certs(config.danger_accept_invalid_certs);

        if !config.follow_redirects {
            builder = builder.redirect(reqwest::redirect::Policy::none());
        } else {
            builder = builder.redirect(reqwest::redirect::Policy::limited(config.max_redirects));
        }

        if let Some(proxy_cfg) = &config.proxy {
            let proxy = build_proxy(proxy_cfg)?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(NetworkError::Transport)?;

        let mut quotas = HashMap::new();
        for request_type in [
            RequestType::Manifest,
            RequestType::Segment,
            RequestType::License,
            RequestType::App,
        ] {
            quotas.insert(
                request_type,
                Arc::new(Semaphore::new(config.max_concurrent_requests)),
            );
        }

        Ok(Self {
            client,
            filters,
            metrics: Arc::new(NetworkMetrics::new()),
            quotas,
        })
    }

    pub fn metrics(&self) -> Arc<NetworkMetrics> {
        self.metrics.clone()
    }

    pub fn filters_mut(&mut self) -> &mut FilterChain {
        &mut self.filters
    }

    /// Performs one request, applying filters, respecting the per-type
    /// concurrency quota, and retrying per `retry_params` as in spec §6/§4.H.
    #[instrument(skip(self, request, retry_params, token), fields(request_type = ?request.request_type, uri = %request.uri))]
    pub async fn fetch(
        &self,
        mut request: NetworkRequest,
        retry_params: &RetryParameters,
        token: &CancellationToken,
    ) -> Result<NetworkResponse, NetworkError> {
        self.filters.apply_request(&mut request).await?;

        let semaphore = self
            .quotas
            .get(&request.request_type)
            .expect("quota registered for every RequestType variant")
            .clone();

        let _permit = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(NetworkError::Cancelled),
            permit = semaphore.acquire_owned() => permit.expect("semaphore never closed"),
        };

        let request_type = request.request_type;
        let result = retry_with_backoff(retry_params, token, |attempt| {
            let request = request.clone();
            let client = self.client.clone();
            async move {
                if attempt > 0 {
                    debug!(attempt, "retrying network request");
                }
                match execute(&client, &request).await {
                    Ok(resp) => RetryAction::Success(resp),
                    Err(e) if e.is_retryable() => RetryAction::Retry(e),
                    Err(e) => RetryAction::Fail(e),
                }
            }
        })
        .await;

        match &result {
            Ok(resp) => self.metrics.record_request(request_type, resp.body_len() as u64, false),
            Err(_) => self.metrics.record_request(request_type, 0, true),
        }

        let mut response = result?;
        if let Err(e) = self.filters.apply_response(&mut response).await {
            warn!(error = %e, "response filter rejected response");
            return Err(e);
        }
        Ok(response)
    }
}

async fn execute(client: &Client, request: &NetworkRequest) -> Result<NetworkResponse, NetworkError> {
    let started = Instant::now();
    let mut builder = client.request(request.method.clone(), &request.uri);
    builder = builder.headers(request.headers.clone());
    if let Some(body) = &request.body {
        builder = builder.body(body.clone());
    }

    let resp = builder.send().await.map_err(NetworkError::Transport)?;
    let time_to_first_byte = started.elapsed();
    let status = resp.status();
    let final_uri = resp.url().to_string();
    let headers = resp.headers().clone();

    if !status.is_success() {
        return Err(NetworkError::http_status(status, final_uri, operation_name(request)));
    }

    let body = resp.bytes().await.map_err(NetworkError::Transport)?;

    Ok(NetworkResponse {
        status,
        final_uri,
        headers,
        body,
        time_to_first_byte,
    })
}

fn operation_name(request: &NetworkRequest) -> &'static str {
    match request.request_type {
        RequestType::Manifest => "manifest fetch",
        RequestType::Segment => "segment fetch",
        RequestType::License => "license request",
        RequestType::App => "app request",
    }
}

fn build_proxy(config: &crate::config::ProxyConfig) -> Result<reqwest::Proxy, NetworkError> {
    use crate::config::ProxyType;
    let mut proxy = match config.proxy_type {
        ProxyType::Http => reqwest::Proxy::http(&config.url),
        ProxyType::Https => reqwest::Proxy::https(&config.url),
        ProxyType::Socks5 => reqwest::Proxy::all(&config.url),
    }
    .map_err(|e| NetworkError::ProxyConfiguration { reason: e.to_string() })?;

    if let Some(auth) = &config.auth {
        proxy = proxy.basic_auth(&auth.username, &auth.password);
    }
    Ok(proxy)
}

/// Minimal wall-clock-independent duration helper used by callers computing
/// `durationMs` for the bandwidth estimator sample.
pub fn millis(d: Duration) -> u64 {
    d.as_millis() as u64
}
