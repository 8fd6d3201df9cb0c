//! Concurrent fan-out of sub-requests to backends.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use metrics::{counter, histogram};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, instrument, warn};
use wms_common::{WmsError, WmsResult};

use crate::translate::SubRequest;

/// Content type assumed when a backend sends none.
const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// A backend response as received, before any status handling.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// A successful backend response, tagged with where it belongs.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub backend: String,
    /// Index of the originating sub-request
    pub position: usize,
    pub content_type: String,
    pub body: Bytes,
}

/// Issues a single HTTP GET for a sub-request.
///
/// Transport failures are reported as `BackendUnreachable` or
/// `BackendTimeout`; any HTTP status is returned as a response.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn get(&self, request: &SubRequest) -> WmsResult<HttpResponse>;
}

/// `HttpFetcher` backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    /// Create a fetcher whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> WmsResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| WmsError::InternalError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    #[instrument(skip(self, request), fields(backend = %request.backend, url = %request.url))]
    async fn get(&self, request: &SubRequest) -> WmsResult<HttpResponse> {
        let response = self
            .client
            .get(&request.url)
            .query(&request.params)
            .send()
            .await
            .map_err(|e| transport_error(&request.backend, e))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(&request.backend, e))?;

        Ok(HttpResponse {
            status,
            content_type,
            body,
        })
    }
}

fn transport_error(backend: &str, err: reqwest::Error) -> WmsError {
    if err.is_timeout() {
        WmsError::BackendTimeout {
            backend: backend.to_string(),
        }
    } else {
        WmsError::BackendUnreachable {
            backend: backend.to_string(),
            message: err.to_string(),
        }
    }
}

/// Fetch every sub-request, at most `max_concurrency` at a time.
///
/// Responses come back in the order of `requests`, whatever order they
/// complete in. The first failure aborts the remaining requests and is
/// returned.
#[instrument(skip(fetcher, requests), fields(backends = requests.len()))]
pub async fn dispatch<F>(
    fetcher: &F,
    requests: &[SubRequest],
    max_concurrency: usize,
) -> WmsResult<Vec<RawResponse>>
where
    F: HttpFetcher + ?Sized,
{
    if requests.is_empty() {
        return Ok(Vec::new());
    }

    let limit = max_concurrency.clamp(1, requests.len());
    let mut slots: Vec<Option<RawResponse>> = vec![None; requests.len()];

    // Collect first: a borrowing closure inside the stream breaks Send for
    // callers that are spawned or used as axum handlers.
    let fetches: Vec<_> = requests
        .iter()
        .enumerate()
        .map(|(position, request)| fetch_one(fetcher, position, request))
        .collect();
    let mut responses = stream::iter(fetches).buffer_unordered(limit);

    while let Some(result) = responses.next().await {
        let raw = result?;
        let position = raw.position;
        slots[position] = Some(raw);
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(position, slot)| {
            slot.ok_or_else(|| {
                WmsError::InternalError(format!("No response recorded for sub-request {}", position))
            })
        })
        .collect()
}

async fn fetch_one<F>(fetcher: &F, position: usize, request: &SubRequest) -> WmsResult<RawResponse>
where
    F: HttpFetcher + ?Sized,
{
    let backend = request.backend.clone();
    counter!("featureinfo_backend_requests_total", "backend" => backend.clone()).increment(1);

    let start = Instant::now();
    let result = fetcher.get(request).await.and_then(|response| {
        if !(200..300).contains(&response.status) {
            return Err(WmsError::BackendBadResponse {
                backend: backend.clone(),
                status: response.status,
            });
        }
        Ok(response)
    });
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!("featureinfo_backend_duration_ms", "backend" => backend.clone()).record(elapsed_ms);

    match result {
        Ok(response) => {
            debug!(
                backend = %backend,
                status = response.status,
                size = response.body.len(),
                elapsed_ms,
                "Backend responded"
            );
            Ok(RawResponse {
                backend,
                position,
                content_type: response
                    .content_type
                    .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
                body: response.body,
            })
        }
        Err(e) => {
            counter!("featureinfo_backend_errors_total", "backend" => backend.clone()).increment(1);
            warn!(backend = %backend, error = %e, "Backend request failed");
            Err(e)
        }
    }
}
