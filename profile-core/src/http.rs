//! Module contains the implementation for a shared HTTP client for the
//! profile resolver and store clients.

pub use crate::metrics::HttpLabel;
use crate::metrics::HttpMetrics;
use anyhow::{anyhow, Context, Result};
use isahc::http::{Error as HttpError, StatusCode, Uri};
use isahc::prelude::{Configurable, Request};
use isahc::{HttpClientBuilder, ResponseExt};
use serde::{de::DeserializeOwned, Serialize};
use std::convert::TryFrom;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A factory type for creating HTTP clients.
#[derive(Debug)]
pub struct HttpFactory {
    default_timeout: Duration,
    metrics: Arc<HttpMetrics>,
}

impl HttpFactory {
    /// Creates a new HTTP client factory.
    pub fn new(default_timeout: Duration, metrics: HttpMetrics) -> Self {
        HttpFactory {
            default_timeout,
            metrics: Arc::new(metrics),
        }
    }

    /// Creates a new HTTP client with the default configuration.
    pub fn create(&self) -> Result<HttpClient> {
        self.with_config(|builder| builder.timeout(self.default_timeout))
    }

    /// Creates a new HTTP Client with the given configuration.
    pub fn with_config(
        &self,
        configure: impl FnOnce(HttpClientBuilder) -> HttpClientBuilder,
    ) -> Result<HttpClient> {
        let inner = configure(isahc::HttpClient::builder()).build()?;
        let metrics = self.metrics.clone();

        Ok(HttpClient { inner, metrics })
    }
}

impl Default for HttpFactory {
    fn default() -> Self {
        HttpFactory::new(Duration::from_secs(10), HttpMetrics::default())
    }
}

/// An HTTP client instance with metrics.
#[derive(Debug)]
pub struct HttpClient {
    inner: isahc::HttpClient,
    metrics: Arc<HttpMetrics>,
}

impl HttpClient {
    /// Serializes `body` and posts it with the additional headers.
    pub async fn post_json_async<U, T>(
        &self,
        url: U,
        body: &T,
        headers: &[(&str, &str)],
        label: HttpLabel,
    ) -> Result<String>
    where
        Uri: TryFrom<U>,
        <Uri as TryFrom<U>>::Error: Into<HttpError>,
        T: Serialize + ?Sized,
    {
        let data = serde_json::to_string(body).context("failed to serialize JSON body")?;
        self.post_json_with_headers_async(url, data, headers, label)
            .await
    }

    /// Posts an already serialized JSON body.
    pub async fn post_raw_json_async<U>(&self, url: U, data: String, label: HttpLabel) -> Result<String>
    where
        Uri: TryFrom<U>,
        <Uri as TryFrom<U>>::Error: Into<HttpError>,
    {
        self.post_json_with_headers_async(url, data, &[], label)
            .await
    }

    async fn post_json_with_headers_async<U>(
        &self,
        url: U,
        data: String,
        headers: &[(&str, &str)],
        label: HttpLabel,
    ) -> Result<String>
    where
        Uri: TryFrom<U>,
        <Uri as TryFrom<U>>::Error: Into<HttpError>,
    {
        let start = Instant::now();
        let mut request = Request::post(url).header("Content-Type", "application/json");
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let http_request = request.body(data)?;
        let mut response = self.inner.send_async(http_request).await?;
        let content = response.text()?;
        self.metrics.request(label, start.elapsed(), content.len());

        if response.status().is_success() {
            Ok(content)
        } else {
            Err(anyhow!(
                "HTTP error status {}: '{}'",
                response.status(),
                content.trim()
            ))
        }
    }

    /// Standard HTTP GET request that parses the result as JSON. A `404 Not
    /// Found` response resolves to `None`, any other unsuccessful status is an
    /// error.
    pub async fn get_json_optional_async<U, T>(&self, url: U, label: HttpLabel) -> Result<Option<T>>
    where
        Uri: TryFrom<U>,
        <Uri as TryFrom<U>>::Error: Into<HttpError>,
        T: DeserializeOwned,
    {
        let start = Instant::now();

        let mut response = self.inner.get_async(url).await?;
        let json = response.text()?;
        self.metrics.request(label, start.elapsed(), json.len());

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error status {}: '{}'",
                response.status(),
                json.trim()
            ));
        }

        let result = serde_json::from_str(&json)
            .with_context(|| format!("failed to parse JSON '{}'", json))?;
        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::{test_server::serve_once, FutureWaitExt as _};
    use serde_json::Value;

    #[test]
    fn not_found_responses_are_measured() {
        let (url, server) = serve_once("404 Not Found", "");
        let client = HttpFactory::default().create().unwrap();

        let result = client
            .get_json_optional_async::<_, Value>(format!("{}/QmMissing", url), HttpLabel::Ipfs)
            .wait()
            .unwrap();
        assert_eq!(result, None);
        assert!(server.join().unwrap().starts_with("GET /QmMissing "));
        assert_eq!(client.metrics.request_count(HttpLabel::Ipfs), 1);
    }

    #[test]
    fn error_responses_are_measured() {
        let (url, server) = serve_once("503 Service Unavailable", "busy");
        let client = HttpFactory::default().create().unwrap();

        let result = client
            .post_raw_json_async(url, "{}".to_owned(), HttpLabel::Store)
            .wait();
        assert!(result.is_err());
        server.join().unwrap();
        assert_eq!(client.metrics.request_count(HttpLabel::Store), 1);
    }
}
