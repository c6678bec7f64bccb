use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

pub const DEFAULT_USER_AGENT: &str =
    concat!("streaming-engine/", env!("CARGO_PKG_VERSION"));

/// Proxy type, mirrors the three schemes a streaming client is likely to be
/// pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyType {
    Http,
    Https,
    Socks5,
}

#[derive(Debug, Clone)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub url: String,
    pub proxy_type: ProxyType,
    pub auth: Option<ProxyAuth>,
}

/// Configuration for the transport underlying a [`crate::engine::NetworkEngine`].
///
/// Adapted from the teacher's `mesio::config::DownloaderConfig`: a single
/// configuration object shared by every request kind (`manifest`, `segment`,
/// `license`, `app`), with per-request-kind behaviour layered on top by the
/// streaming engine's retry policy rather than here.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub follow_redirects: bool,
    pub max_redirects: usize,
    pub user_agent: String,
    pub headers: HeaderMap,
    pub proxy: Option<ProxyConfig>,
    pub use_system_proxy: bool,
    pub danger_accept_invalid_certs: bool,
    pub max_concurrent_requests: usize,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            follow_redirects: true,
            max_redirects: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: get_default_headers(),
            proxy: None,
            use_system_proxy: false,
            danger_accept_invalid_certs: false,
            max_concurrent_requests: 6,
            pool_max_idle_per_host: 8,
            pool_idle_timeout: Duration::from_secs(90),
        }
    }
}

impl NetworkConfig {
    pub fn builder() -> NetworkConfigBuilder {
        NetworkConfigBuilder::default()
    }
}

fn get_default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("accept"),
        HeaderValue::from_static("*/*"),
    );
    headers.insert(
        HeaderName::from_static("accept-language"),
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers
}

#[derive(Debug, Default)]
pub struct NetworkConfigBuilder {
    inner: Option<NetworkConfig>,
}

impl NetworkConfigBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        let mut cfg = self.inner.take().unwrap_or_default();
        cfg.timeout = timeout;
        self.inner = Some(cfg);
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        let mut cfg = self.inner.take().unwrap_or_default();
        cfg.user_agent = ua.into();
        self.inner = Some(cfg);
        self
    }

    pub fn max_concurrent_requests(mut self, n: usize) -> Self {
        let mut cfg = self.inner.take().unwrap_or_default();
        cfg.max_concurrent_requests = n;
        self.inner = Some(cfg);
        self
    }

    pub fn build(self) -> NetworkConfig {
        self.inner.unwrap_or_default()
    }
}

/// Retry parameters, named directly after spec §6's `retryParameters`.
#[derive(Debug, Clone, Copy)]
pub struct RetryParameters {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub fuzz_factor: f64,
    pub backoff_factor: f64,
    pub timeout: Duration,
}

impl Default for RetryParameters {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            fuzz_factor: 0.5,
            backoff_factor: 2.0,
            timeout: Duration::from_secs(30),
        }
    }
}
