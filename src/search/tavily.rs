//! Tavily search/extract client over `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use super::{ContextMap, SearchHit, SearchProvider, SearchResult};
use crate::credentials::Credential;
use crate::error::{AgentError, BoxError};

/// Default Tavily API endpoint.
pub const DEFAULT_TAVILY_BASE_URL: &str = "https://api.tavily.com";

/// Default per-request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    query: String,
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    results: Vec<ExtractedPage>,
    #[serde(default)]
    failed_results: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ExtractedPage {
    url: String,
    #[serde(default)]
    raw_content: String,
}

/// Search handle bound to one Tavily API key.
#[derive(Clone)]
pub struct TavilyClient {
    http: reqwest::Client,
    base_url: String,
}

impl TavilyClient {
    /// Builds a client bound to `credential`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ClientConstruction`] if the key cannot be used
    /// as a bearer token or the HTTP client fails to build.
    pub fn new(credential: &Credential, base_url: Option<&str>) -> Result<Self, AgentError> {
        Self::with_timeout(
            credential,
            base_url,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Builds a client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// See [`TavilyClient::new`].
    pub fn with_timeout(
        credential: &Credential,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, AgentError> {
        let construction_error = |message: String, source: BoxError| AgentError::ClientConstruction {
            slot: credential.slot().to_string(),
            message,
            source: Some(source),
        };

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", credential.secret()))
            .map_err(|e| {
                construction_error(format!("malformed API key {}", credential.masked()), Box::new(e))
            })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| construction_error("HTTP client setup failed".to_string(), Box::new(e)))?;

        Ok(Self {
            http,
            base_url: base_url
                .unwrap_or(DEFAULT_TAVILY_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    /// Posts `body` to `endpoint` and decodes the JSON reply. `fail` builds
    /// the slot-specific error from a message and its cause.
    async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: serde_json::Value,
        fail: fn(String, Option<BoxError>) -> AgentError,
    ) -> Result<T, AgentError> {
        let response = self
            .http
            .post(format!("{}/{endpoint}", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| fail(format!("request to /{endpoint} failed"), Some(Box::new(e))))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(fail(
                format!("HTTP {}: {}", status.as_u16(), detail.trim()),
                None,
            ));
        }
        response
            .json()
            .await
            .map_err(|e| fail("invalid response body".to_string(), Some(Box::new(e))))
    }
}

impl std::fmt::Debug for TavilyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilyClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SearchProvider for TavilyClient {
    fn name(&self) -> &'static str {
        "tavily"
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<SearchResult, AgentError> {
        let parsed: SearchResponse = self
            .post(
                "search",
                json!({ "query": query, "max_results": max_results }),
                |message, source| AgentError::Search { message, source },
            )
            .await?;
        debug!(query, hits = parsed.results.len(), "search complete");

        Ok(SearchResult {
            query: if parsed.query.is_empty() {
                query.to_string()
            } else {
                parsed.query
            },
            results: parsed.results.into_iter().take(max_results).collect(),
        })
    }

    async fn extract(&self, urls: &[String]) -> Result<ContextMap, AgentError> {
        let parsed: ExtractResponse = self
            .post("extract", json!({ "urls": urls }), |message, source| {
                AgentError::Extraction { message, source }
            })
            .await?;
        debug!(
            extracted = parsed.results.len(),
            failed = parsed.failed_results.len(),
            "extraction complete"
        );

        Ok(parsed
            .results
            .into_iter()
            .map(|page| (page.url, page.raw_content))
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::credentials::SEARCH_SLOT;

    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credential(secret: &str) -> Credential {
        Credential::new(SEARCH_SLOT, secret).unwrap_or_else(|| panic!("blank secret"))
    }

    #[test]
    fn test_malformed_key_is_construction_error() {
        let result = TavilyClient::new(&credential("tvly\nbad"), None);
        match result {
            Err(AgentError::ClientConstruction { slot, message, .. }) => {
                assert_eq!(slot, "search");
                assert!(!message.contains("tvly\nbad"));
            }
            other => panic!("expected ClientConstruction, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_search_sends_bounded_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("authorization", "Bearer tvly-test"))
            .and(body_json(json!({ "query": "battery recycling", "max_results": 2 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": "battery recycling",
                "results": [
                    { "title": "A", "url": "https://a.example", "content": "hydrometallurgy", "score": 0.9 },
                    { "title": "B", "url": "https://b.example", "content": "direct recycling", "score": 0.8 }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = TavilyClient::new(&credential("tvly-test"), Some(&server.uri()))
            .unwrap_or_else(|e| panic!("client: {e}"));
        let result = client
            .search("battery recycling", 2)
            .await
            .unwrap_or_else(|e| panic!("search: {e}"));

        assert_eq!(result.results.len(), 2);
        assert_eq!(result.results[0].snippet, "hydrometallurgy");
        assert_eq!(result.results[1].url, "https://b.example");
    }

    #[tokio::test]
    async fn test_search_http_error_maps_to_search_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let client = TavilyClient::new(&credential("tvly-expired"), Some(&server.uri()))
            .unwrap_or_else(|e| panic!("client: {e}"));
        let err = client.search("q", 2).await.unwrap_err();
        assert!(matches!(err, AgentError::Search { ref message, .. } if message.contains("401")));
    }

    #[tokio::test]
    async fn test_extract_maps_urls_to_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/extract"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{ "url": "https://a.example", "raw_content": "page text" }],
                "failed_results": [{ "url": "https://b.example", "error": "timeout" }]
            })))
            .mount(&server)
            .await;

        let client = TavilyClient::new(&credential("tvly-test"), Some(&server.uri()))
            .unwrap_or_else(|e| panic!("client: {e}"));
        let urls = vec!["https://a.example".to_string(), "https://b.example".to_string()];
        let context = client
            .extract(&urls)
            .await
            .unwrap_or_else(|e| panic!("extract: {e}"));

        assert_eq!(context.len(), 1);
        assert_eq!(context.get("https://a.example").map(String::as_str), Some("page text"));
    }

    #[tokio::test]
    async fn test_extract_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/extract"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = TavilyClient::new(&credential("tvly-test"), Some(&server.uri()))
            .unwrap_or_else(|e| panic!("client: {e}"));
        let err = client.extract(&["https://a.example".to_string()]).await.unwrap_err();
        assert!(matches!(err, AgentError::Extraction { .. }));
    }

    #[tokio::test]
    async fn test_transport_error_keeps_cause() {
        let client = TavilyClient::new(&credential("tvly-test"), Some("http://127.0.0.1:1"))
            .unwrap_or_else(|e| panic!("client: {e}"));
        let err = client.search("q", 2).await.unwrap_err();

        assert!(matches!(err, AgentError::Search { source: Some(_), .. }));
        let trace = err.diagnostic_trace();
        assert!(trace.contains("request to /search failed"));
        assert!(trace.contains("1: caused by:"));
    }
}
