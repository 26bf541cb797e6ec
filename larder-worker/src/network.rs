//! Network seam and the reqwest-backed fetcher.
//!
//! The worker never talks to the network directly; it goes through
//! [`NetworkFetcher`], which lets tests substitute a scripted fake and lets
//! hosts bring their own HTTP stack.

use async_trait::async_trait;
use larder_core::{Method, NetworkError, Request, ResponseSnapshot};

/// Abstraction over the outbound network.
///
/// Failure is reported through the fetcher's native error signal; the
/// worker adds no timers of its own.
#[async_trait]
pub trait NetworkFetcher: Send + Sync {
    /// Perform the request and snapshot the response.
    async fn fetch(&self, request: &Request) -> Result<ResponseSnapshot, NetworkError>;
}

/// HTTP fetcher backed by reqwest.
///
/// Request URLs in this system are root-relative paths (`/index.html`);
/// they are resolved against the origin configured here. Absolute URLs are
/// passed through untouched.
pub struct HttpFetcher {
    client: reqwest::Client,
    origin: String,
}

impl HttpFetcher {
    pub fn new(origin: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), origin)
    }

    /// Use a preconfigured client (connection pools, proxies, TLS setup).
    pub fn with_client(client: reqwest::Client, origin: impl Into<String>) -> Self {
        let origin = origin.into().trim_end_matches('/').to_string();
        Self { client, origin }
    }

    fn resolve(&self, url: &str) -> String {
        if url.starts_with('/') {
            format!("{}{}", self.origin, url)
        } else {
            url.to_string()
        }
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
        Method::Options => reqwest::Method::OPTIONS,
        Method::Patch => reqwest::Method::PATCH,
    }
}

#[async_trait]
impl NetworkFetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<ResponseSnapshot, NetworkError> {
        let url = self.resolve(request.url());

        let response = self
            .client
            .request(to_reqwest_method(request.method()), &url)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NetworkError::Timeout { url: url.clone() }
                } else {
                    NetworkError::RequestFailed {
                        url: url.clone(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| NetworkError::RequestFailed {
                url: url.clone(),
                reason: e.to_string(),
            })?
            .to_vec();

        Ok(ResponseSnapshot::new(status, headers, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_joins_root_relative_paths() {
        let fetcher = HttpFetcher::new("https://example.com/");
        assert_eq!(fetcher.resolve("/index.html"), "https://example.com/index.html");
        assert_eq!(fetcher.resolve("/"), "https://example.com/");
    }

    #[test]
    fn test_resolve_passes_absolute_urls_through() {
        let fetcher = HttpFetcher::new("https://example.com");
        assert_eq!(
            fetcher.resolve("https://cdn.example.com/lib.js"),
            "https://cdn.example.com/lib.js"
        );
    }

    #[test]
    fn test_method_mapping() {
        assert_eq!(to_reqwest_method(Method::Get), reqwest::Method::GET);
        assert_eq!(to_reqwest_method(Method::Post), reqwest::Method::POST);
        assert_eq!(to_reqwest_method(Method::Head), reqwest::Method::HEAD);
    }
}
