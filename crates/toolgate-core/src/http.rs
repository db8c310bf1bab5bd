//! Outbound HTTP plumbing: request descriptors, captured responses and a
//! per-egress `reqwest::Client` cache.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use toolgate_types::EgressError;

use crate::proxy_pool::ProxyConfig;
use crate::retry::{OperationError, RetryableResponse};

const USER_AGENT: &str = concat!("toolgate/", env!("CARGO_PKG_VERSION"));

/// Ready-to-send HTTP request handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundRequest {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl OutboundRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self { url: url.into(), method: method.into(), headers: BTreeMap::new(), body: None }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(default_method(), url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Upper-cased method name.
    pub fn method_name(&self) -> String {
        self.method.trim().to_ascii_uppercase()
    }

    /// Check the URL and method. Returns the parsed URL.
    pub fn validate(&self) -> Result<url::Url, EgressError> {
        let parsed = url::Url::parse(&self.url).map_err(|e| EgressError::InvalidRequest {
            message: format!("invalid url '{}': {}", self.url, e),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(EgressError::InvalidRequest {
                message: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        if parsed.host_str().is_none() {
            return Err(EgressError::InvalidRequest { message: "url has no host".to_string() });
        }
        self.parsed_method()?;
        Ok(parsed)
    }

    fn parsed_method(&self) -> Result<reqwest::Method, EgressError> {
        reqwest::Method::from_bytes(self.method_name().as_bytes()).map_err(|_| {
            EgressError::InvalidRequest { message: format!("invalid method '{}'", self.method) }
        })
    }

    /// Target host, lowercased.
    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.url).ok()?.host_str().map(str::to_ascii_lowercase)
    }
}

/// Response captured from the upstream endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpResponse {
    pub status: u16,
    /// Lower-cased header names; non-UTF-8 values are dropped
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub latency_ms: u64,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 400
    }
}

impl RetryableResponse for HttpResponse {
    fn status_code(&self) -> u16 {
        self.status
    }

    fn retry_after(&self) -> Option<&str> {
        self.header("retry-after")
    }
}

/// Send `request` with `client`, capturing status, headers and body.
pub async fn send(client: &Client, request: &OutboundRequest) -> Result<HttpResponse, OperationError> {
    let method = request.parsed_method().map_err(|e| OperationError::other(e.to_string()))?;

    let mut builder = client.request(method, &request.url);
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(body) = &request.body {
        builder = builder.body(body.clone());
    }

    let started = Instant::now();
    let response = builder.send().await?;
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value.to_str().ok().map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect();
    let body = response.text().await?;

    Ok(HttpResponse { status, headers, body, latency_ms: started.elapsed().as_millis() as u64 })
}

/// One `reqwest::Client` per egress path (direct or proxy URL), created lazily.
pub struct ClientCache {
    direct: Client,
    clients: RwLock<HashMap<String, Client>>,
    timeout: Duration,
}

impl ClientCache {
    pub fn new(timeout: Duration) -> Result<Self, EgressError> {
        let direct = base_builder(timeout).build().map_err(|e| EgressError::Internal {
            message: format!("failed to build HTTP client: {}", e),
        })?;
        Ok(Self { direct, clients: RwLock::new(HashMap::new()), timeout })
    }

    /// Client routing through `proxy`, or the direct client for `None`.
    pub async fn client_for(&self, proxy: Option<&ProxyConfig>) -> Result<Client, EgressError> {
        let Some(proxy) = proxy else {
            return Ok(self.direct.clone());
        };
        let proxy_url = proxy.url();

        // Fast path: check read lock
        {
            let clients = self.clients.read().await;
            if let Some(client) = clients.get(&proxy_url) {
                return Ok(client.clone());
            }
        }

        let mut clients = self.clients.write().await;
        // Double-check after acquiring write lock
        if let Some(client) = clients.get(&proxy_url) {
            return Ok(client.clone());
        }

        let invalid = |message: String| EgressError::InvalidProxy { url: proxy.redacted_url(), message };
        let reqwest_proxy = reqwest::Proxy::all(&proxy_url).map_err(|e| invalid(e.to_string()))?;
        let timeout = self.timeout;
        let client = tokio::task::spawn_blocking(move || base_builder(timeout).proxy(reqwest_proxy).build())
            .await
            .map_err(|e| EgressError::Internal { message: format!("client builder panicked: {}", e) })?
            .map_err(|e| invalid(e.to_string()))?;

        tracing::debug!(proxy = %proxy.redacted_url(), "Created new proxy client");
        clients.insert(proxy_url, client.clone());
        Ok(client)
    }

    pub async fn evict(&self, proxy_url: &str) {
        self.clients.write().await.remove(proxy_url);
    }

    /// Number of cached proxy clients.
    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }
}

fn base_builder(timeout: Duration) -> reqwest::ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(10).min(timeout))
        .pool_max_idle_per_host(8)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .timeout(timeout)
        .user_agent(USER_AGENT)
}
