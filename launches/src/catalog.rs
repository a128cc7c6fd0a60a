const BASE_DELAY: u64 = 500;
const MAX_RETRIES: u32 = 3;

use crate::metrics_defs::CATALOG_FETCH_RETRY;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use shared::counter;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RawRocket {
    pub name: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RawPayload {
    #[serde(default)]
    pub customers: Vec<String>,
}

/// A launch as the external catalog reports it.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RawLaunch {
    pub flight_number: Option<u64>,
    pub name: Option<String>,
    pub rocket: Option<RawRocket>,
    pub target: Option<String>,
    pub date_local: Option<String>,
    #[serde(default)]
    pub payloads: Vec<RawPayload>,
    #[serde(default)]
    pub upcoming: bool,
    pub success: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogQuery {
    // 1-based
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPage {
    pub total_records: u64,
    pub records: Vec<RawLaunch>,
}

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("catalog request timed out")]
    Timeout,
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("catalog returned status {0}")]
    Status(StatusCode),
    #[error("catalog unavailable, retries exhausted")]
    RetriesExceeded,
}

impl CatalogError {
    pub fn is_retryable(&self) -> bool {
        match self {
            CatalogError::Timeout | CatalogError::RetriesExceeded => true,
            CatalogError::ReqwestError(e) => e.is_connect() || e.is_timeout(),
            CatalogError::InvalidUrl(_) | CatalogError::Status(_) => false,
        }
    }
}

/// Longest a single `fetch_page` call can take when every attempt runs into
/// the per-request `timeout` and every retry backs off.
pub fn retry_budget(timeout: Duration) -> Duration {
    let backoff_steps: u32 = (0..MAX_RETRIES).map(|retry| 2_u32.pow(retry)).sum();
    timeout * (MAX_RETRIES + 1) + Duration::from_millis(BASE_DELAY) * backoff_steps
}

/// Paginated source of launch records.
#[async_trait]
pub trait LaunchCatalog: Send + Sync {
    async fn fetch_page(&self, query: CatalogQuery) -> Result<CatalogPage, CatalogError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    docs: Vec<RawLaunch>,
    total_docs: Option<u64>,
}

/// Catalog reached over HTTP through a `POST {base}/launches/query` endpoint.
pub struct HttpLaunchCatalog {
    client: reqwest::Client,
    query_url: Url,
    base_delay: Duration,
}

impl HttpLaunchCatalog {
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, CatalogError> {
        let query_url = Url::parse(&format!(
            "{}/launches/query",
            base_url.as_str().trim_end_matches('/')
        ))
        .map_err(|e| CatalogError::InvalidUrl(e.to_string()))?;

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(HttpLaunchCatalog {
            client,
            query_url,
            base_delay: Duration::from_millis(BASE_DELAY),
        })
    }

    #[cfg(test)]
    fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    fn request_body(query: CatalogQuery) -> serde_json::Value {
        json!({
            "query": {},
            "options": {
                "page": query.page,
                "limit": query.limit,
                "pagination": true,
                "populate": [
                    {"path": "rocket", "select": {"name": 1}},
                    {"path": "payloads", "select": {"customers": 1}},
                ],
            },
        })
    }
}

#[async_trait]
impl LaunchCatalog for HttpLaunchCatalog {
    async fn fetch_page(&self, query: CatalogQuery) -> Result<CatalogPage, CatalogError> {
        const RETRIABLE_STATUS_CODES: &[StatusCode] = &[
            StatusCode::TOO_MANY_REQUESTS,     // 429
            StatusCode::INTERNAL_SERVER_ERROR, // 500
            StatusCode::BAD_GATEWAY,           // 502
            StatusCode::SERVICE_UNAVAILABLE,   // 503
            StatusCode::GATEWAY_TIMEOUT,       // 504
        ];

        let body = Self::request_body(query);
        let mut retries = 0;

        let response = loop {
            let response = self
                .client
                .post(self.query_url.clone())
                .json(&body)
                .send()
                .await
                .map_err(timeout_or_transport)?;

            let status = response.status();
            if status.is_success() {
                break response;
            }

            if !RETRIABLE_STATUS_CODES.contains(&status) {
                return Err(CatalogError::Status(status));
            }
            if retries >= MAX_RETRIES {
                return Err(CatalogError::RetriesExceeded);
            }

            let delay = self.base_delay * 2_u32.pow(retries);
            tracing::warn!(%status, page = query.page, ?delay, "catalog fetch failed, retrying");
            counter!(CATALOG_FETCH_RETRY).increment(1);
            sleep(delay).await;
            retries += 1;
        };

        let parsed = response
            .json::<QueryResponse>()
            .await
            .map_err(timeout_or_transport)?;
        let total_records = parsed.total_docs.unwrap_or(parsed.docs.len() as u64);

        tracing::debug!(
            page = query.page,
            records = parsed.docs.len(),
            total_records,
            "fetched catalog page"
        );

        Ok(CatalogPage {
            total_records,
            records: parsed.docs,
        })
    }
}

fn timeout_or_transport(err: reqwest::Error) -> CatalogError {
    if err.is_timeout() {
        CatalogError::Timeout
    } else {
        CatalogError::ReqwestError(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn catalog(server: &MockServer) -> HttpLaunchCatalog {
        let url = Url::parse(&server.uri()).unwrap();
        HttpLaunchCatalog::new(&url, Duration::from_secs(2))
            .unwrap()
            .with_base_delay(Duration::from_millis(1))
    }

    fn page_body() -> serde_json::Value {
        json!({
            "docs": [
                {
                    "flight_number": 1,
                    "name": "FalconSat",
                    "rocket": {"name": "Falcon 1"},
                    "date_local": "2006-03-25T10:30:00+12:00",
                    "payloads": [{"customers": ["DARPA"]}],
                    "upcoming": false,
                    "success": false
                },
                {
                    "flight_number": 2,
                    "name": "DemoSat",
                    "rocket": {"name": "Falcon 1"},
                    "date_local": "2007-03-21T13:10:00+12:00",
                    "payloads": [],
                    "upcoming": false,
                    "success": null
                }
            ],
            "totalDocs": 12,
            "page": 2,
            "totalPages": 6
        })
    }

    #[tokio::test]
    async fn test_fetch_page() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/launches/query"))
            .and(body_partial_json(
                json!({"options": {"page": 2, "limit": 2, "pagination": true}}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body()))
            .expect(1)
            .mount(&server)
            .await;

        let page = catalog(&server)
            .fetch_page(CatalogQuery { page: 2, limit: 2 })
            .await
            .unwrap();

        assert_eq!(page.total_records, 12);
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].flight_number, Some(1));
        assert_eq!(
            page.records[0].rocket,
            Some(RawRocket {
                name: Some("Falcon 1".into())
            })
        );
        assert_eq!(page.records[0].payloads[0].customers, vec!["DARPA"]);
        assert_eq!(page.records[1].success, None);
    }

    #[tokio::test]
    async fn test_total_defaults_to_page_length() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/launches/query"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"docs": [{"flight_number": 9}]})),
            )
            .mount(&server)
            .await;

        let page = catalog(&server)
            .fetch_page(CatalogQuery { page: 1, limit: 50 })
            .await
            .unwrap();
        assert_eq!(page.total_records, 1);
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/launches/query"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/launches/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body()))
            .mount(&server)
            .await;

        let page = catalog(&server)
            .fetch_page(CatalogQuery { page: 1, limit: 2 })
            .await
            .unwrap();
        assert_eq!(page.records.len(), 2);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/launches/query"))
            .respond_with(ResponseTemplate::new(502))
            .expect(u64::from(MAX_RETRIES) + 1)
            .mount(&server)
            .await;

        let err = catalog(&server)
            .fetch_page(CatalogQuery { page: 1, limit: 2 })
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::RetriesExceeded));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/launches/query"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let err = catalog(&server)
            .fetch_page(CatalogQuery { page: 1, limit: 2 })
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Status(StatusCode::NOT_FOUND)));
        assert!(err.to_string().contains("404"));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_slow_catalog_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/launches/query"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(page_body())
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let catalog = HttpLaunchCatalog::new(&url, Duration::from_millis(50)).unwrap();
        let err = catalog
            .fetch_page(CatalogQuery { page: 1, limit: 2 })
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Timeout));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_retry_budget_covers_backoff() {
        // 4 attempts of 1s plus 500ms + 1s + 2s of backoff.
        assert_eq!(
            retry_budget(Duration::from_secs(1)),
            Duration::from_millis(7500)
        );
    }

    #[test]
    fn test_query_url_tolerates_trailing_slash() {
        let url = Url::parse("https://api.spacexdata.com/v4/").unwrap();
        let catalog = HttpLaunchCatalog::new(&url, Duration::from_secs(1)).unwrap();
        assert_eq!(
            catalog.query_url.as_str(),
            "https://api.spacexdata.com/v4/launches/query"
        );
    }
}
