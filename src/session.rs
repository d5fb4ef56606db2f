//! Transport sessions that execute prepared requests.
//!
//! The [`Session`] trait is the seam between the queue and the network. The
//! crate ships [`HttpSession`], backed by `reqwest`, and
//! [`StubSession`](crate::stub::StubSession) for canned responses.

use crate::{response::RawResponse, Error, Result};
use http::Method;
use serde_json::Value;
use std::future::Future;
use std::time::{Duration, Instant};
use url::Url;

/// A request ready to be executed by a [`Session`].
///
/// Built from a [`Call`](crate::Call) and a [`Configuration`](crate::Configuration)
/// with [`Call::request`](crate::Call::request).
#[derive(Debug, Clone)]
pub struct Request {
    /// The HTTP method.
    pub method: Method,
    /// The absolute URL.
    pub url: Url,
    /// The call path the URL was built from.
    pub path: String,
    /// JSON body, if any.
    pub body: Option<Value>,
    /// Timeout for this request.
    pub timeout: Duration,
}

/// Executes requests and yields the raw response.
///
/// Implementations must be cancel-safe: the queue cancels an in-flight request
/// by dropping the returned future.
pub trait Session: Send + Sync + 'static {
    /// Performs the request.
    ///
    /// Non-2xx statuses are not errors at this level; they are returned as a
    /// [`RawResponse`] and judged by the caller.
    fn execute(&self, request: Request) -> impl Future<Output = Result<RawResponse>> + Send;
}

/// A [`Session`] backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpSession {
    http_client: reqwest::Client,
}

impl HttpSession {
    /// Creates a session with a fresh connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http_client })
    }

    /// Creates a session around an existing `reqwest` client.
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

impl Session for HttpSession {
    fn execute(&self, request: Request) -> impl Future<Output = Result<RawResponse>> + Send {
        let http_client = self.http_client.clone();

        async move {
            let start_time = Instant::now();

            tracing::debug!(
                method = %request.method,
                url = %request.url,
                "Executing HTTP request"
            );

            let mut builder = http_client
                .request(request.method, request.url)
                .timeout(request.timeout);

            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await.map_err(transport_error)?;
            let status = response.status();
            let body = response.bytes().await.map_err(transport_error)?;

            Ok(RawResponse::new(status, body.to_vec(), start_time.elapsed()))
        }
    }
}

fn transport_error(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::Timeout
    } else {
        Error::Transport(error)
    }
}
