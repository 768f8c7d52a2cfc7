//! Network seam for the worker.
//!
//! ### Network trait
//! - One async `fetch` per request; the response body is fully buffered.
//! - Any transport failure (DNS, refused connection, timeout) surfaces as
//!   `Error::NetworkUnavailable`, the trigger for cache fallback.
//! - A body over the size limit is `Error::ResponseTooLarge`. The server was
//!   reachable, so this never falls back to the cache.
//! - HTTP error statuses are responses, not failures.
//!
//! ### HTTP implementation
//! - reqwest with rustls, gzip/brotli/deflate decoding
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::{Duration, Instant};

pub use reqwest::{Method, StatusCode, Url, header};
pub use url::{UrlError, canonicalize, resolve};

use greenmap_core::{AppConfig, Error, RequestIdentity, StoredResponse};

/// Configuration for the HTTP network.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "greenmap-worker/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "greenmap-worker/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// A request intercepted by the worker.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub headers: header::HeaderMap,
    pub body: Option<Bytes>,
}

impl FetchRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, headers: header::HeaderMap::new(), body: None }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Identity this request is stored and looked up under.
    pub fn identity(&self) -> RequestIdentity {
        RequestIdentity::new(self.method.as_str(), self.url.as_str())
    }

    /// Only GET responses are written to the store.
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The original URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Snapshot for the store. Headers that are not valid UTF-8 are dropped.
    pub fn to_stored(&self) -> StoredResponse {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();
        StoredResponse::new(self.status.as_u16(), headers, self.bytes.to_vec())
    }

    /// Rebuild a response from a stored snapshot for `url`.
    pub fn from_stored(url: Url, stored: StoredResponse) -> Result<Self, Error> {
        let status = StatusCode::from_u16(stored.status)
            .map_err(|e| Error::InvalidInput(format!("stored status {}: {e}", stored.status)))?;

        let mut headers = header::HeaderMap::new();
        for (name, value) in &stored.headers {
            match (header::HeaderName::from_bytes(name.as_bytes()), header::HeaderValue::from_str(value)) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => tracing::debug!(header = %name, "skipping unparseable stored header"),
            }
        }

        let content_type = stored.header(header::CONTENT_TYPE.as_str()).map(str::to_string);

        Ok(Self {
            final_url: url.clone(),
            url,
            status,
            content_type,
            bytes: Bytes::from(stored.body),
            headers,
            fetch_ms: 0,
        })
    }
}

/// Source of responses for the worker.
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform the request over the network.
    ///
    /// Returns `Error::NetworkUnavailable` when no response could be obtained,
    /// and `Error::ResponseTooLarge` when the body is over the size limit.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error>;
}

/// reqwest-backed network.
pub struct HttpNetwork {
    http: Client,
    config: FetchConfig,
}

impl HttpNetwork {
    /// Create a new HTTP network with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::InvalidInput(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn too_large(&self, url: &Url, bytes: u64) -> Error {
        Error::ResponseTooLarge { url: url.to_string(), bytes, limit: self.config.max_bytes }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();

        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::NetworkUnavailable(format!("timed out: {}", e))
            } else {
                Error::NetworkUnavailable(format!("network error: {}", e))
            }
        })?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(self.too_large(&request.url, len));
        }

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::NetworkUnavailable(format!("failed to read response: {}", e)))?;

        if bytes.len() > self.config.max_bytes {
            return Err(self.too_large(&request.url, bytes.len() as u64));
        }

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "{} {} -> {} {} in {}ms ({} bytes)",
            request.method,
            request.url,
            final_url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse { url: request.url.clone(), final_url, status, content_type, bytes, headers, fetch_ms })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one `200 OK` with a body of `len` bytes on a local port and
    /// return the URL of `path` on it.
    pub async fn serve_once(path: &str, len: usize) -> reqwest::Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let Ok((mut socket, _)) = listener.accept().await else { return };
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;

            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {len}\r\nConnection: close\r\n\r\n"
            );
            // the client may hang up as soon as it sees the length
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(&vec![b'x'; len]).await;
            let _ = socket.shutdown().await;
        });

        reqwest::Url::parse(&format!("http://{addr}{path}")).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "greenmap-worker/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "test/1".into(), timeout_ms: 1500, max_bytes: 1024, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "test/1");
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.max_bytes, 1024);
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_request_identity_and_cacheability() {
        let get = FetchRequest::get(url("http://localhost:3000/other.json"));
        assert!(get.is_cacheable());
        assert_eq!(get.identity(), RequestIdentity::get("http://localhost:3000/other.json"));

        let post = FetchRequest::new(Method::POST, url("http://localhost:3000/api/report")).with_body("{}");
        assert!(!post.is_cacheable());
        assert_eq!(post.identity().method, "POST");
    }

    #[test]
    fn test_stored_snapshot_preserves_response() {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
        let response = FetchResponse {
            url: url("http://localhost:3000/other.json"),
            final_url: url("http://localhost:3000/other.json"),
            status: StatusCode::OK,
            content_type: Some("application/json".to_string()),
            bytes: Bytes::from_static(br#"{"a":1}"#),
            headers,
            fetch_ms: 12,
        };

        let stored = response.to_stored();
        assert_eq!(stored.status, 200);
        assert_eq!(stored.header("content-type"), Some("application/json"));
        assert_eq!(stored.body, br#"{"a":1}"#);

        let rebuilt = FetchResponse::from_stored(response.url.clone(), stored).unwrap();
        assert_eq!(rebuilt.status, StatusCode::OK);
        assert_eq!(rebuilt.content_type.as_deref(), Some("application/json"));
        assert_eq!(rebuilt.bytes, response.bytes);
        assert_eq!(rebuilt.fetch_ms, 0);
    }

    #[test]
    fn test_from_stored_rejects_invalid_status() {
        let stored = StoredResponse::new(1000, Vec::new(), "");
        let result = FetchResponse::from_stored(url("http://localhost:3000/"), stored);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_http_network_new() {
        let network = HttpNetwork::new(FetchConfig::default());
        assert!(network.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_unavailable() {
        let network = HttpNetwork::new(FetchConfig { timeout: Duration::from_millis(500), ..Default::default() })
            .unwrap();
        // nothing listens on the discard port
        let request = FetchRequest::get(url("http://127.0.0.1:9/"));
        let result = network.fetch(&request).await;
        assert!(matches!(result, Err(Error::NetworkUnavailable(_))));
    }

    #[tokio::test]
    async fn test_oversized_body_is_not_a_network_failure() {
        let url = testing::serve_once("/parks.json", 2048).await;
        let network = HttpNetwork::new(FetchConfig { max_bytes: 1024, ..Default::default() }).unwrap();

        let result = network.fetch(&FetchRequest::get(url)).await;
        assert!(matches!(result, Err(Error::ResponseTooLarge { bytes: 2048, limit: 1024, .. })));
    }

    #[tokio::test]
    async fn test_body_within_limit() {
        let url = testing::serve_once("/parks.json", 512).await;
        let network = HttpNetwork::new(FetchConfig::default()).unwrap();

        let response = network.fetch(&FetchRequest::get(url.clone())).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.bytes.len(), 512);
        assert_eq!(response.content_type.as_deref(), Some("text/plain"));
        assert_eq!(response.url, url);
    }
}
