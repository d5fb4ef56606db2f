//! A session that answers from canned responses.
//!
//! Useful in tests and for working against an API that does not exist yet.
//! Responses are registered per call path; every executed request is recorded.

use crate::{response::RawResponse, session::Request, session::Session, Result};
use http::StatusCode;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Semaphore;

#[derive(Debug, Clone)]
struct StubResponse {
    status: StatusCode,
    body: Vec<u8>,
}

/// A [`Session`] serving registered responses keyed by call path.
///
/// Clones share their stubs, recorded requests and gate, so a test can keep a
/// clone while a queue owns another.
///
/// # Examples
///
/// ```
/// use tether::stub::StubSession;
/// use serde_json::json;
///
/// let session = StubSession::new();
/// session.stub("products", 200, json!([{ "uuid": "a" }]));
/// session.stub_raw("products/1", 204, "");
/// ```
#[derive(Debug, Clone, Default)]
pub struct StubSession {
    stubs: Arc<Mutex<HashMap<String, StubResponse>>>,
    requests: Arc<Mutex<Vec<Request>>>,
    gate: Option<Arc<Semaphore>>,
    delay: Duration,
}

impl StubSession {
    /// Creates a session with no stubs; unknown paths answer 404.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a JSON response for `path`.
    pub fn stub(&self, path: impl Into<String>, status: u16, body: Value) {
        self.stub_raw(path, status, body.to_string());
    }

    /// Registers a raw body for `path`.
    pub fn stub_raw(&self, path: impl Into<String>, status: u16, body: impl Into<Vec<u8>>) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.stubs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                normalize(&path.into()),
                StubResponse {
                    status,
                    body: body.into(),
                },
            );
    }

    /// Waits `delay` before answering each request.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Holds every response until [`release`](Self::release) lets it through.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Lets `count` held responses through. No-op on an ungated session.
    pub fn release(&self, count: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(count);
        }
    }

    /// Requests executed so far, in arrival order.
    pub fn requests(&self) -> Vec<Request> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Session for StubSession {
    fn execute(&self, request: Request) -> impl Future<Output = Result<RawResponse>> + Send {
        let session = self.clone();

        async move {
            let path = normalize(&request.path);
            session
                .requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request);

            if let Some(gate) = &session.gate {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }
            if !session.delay.is_zero() {
                tokio::time::sleep(session.delay).await;
            }

            let stub = session
                .stubs
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&path)
                .cloned();

            tracing::debug!(path = %path, stubbed = stub.is_some(), "Serving stub response");

            Ok(match stub {
                Some(stub) => RawResponse::new(stub.status, stub.body, session.delay),
                None => RawResponse::new(
                    StatusCode::NOT_FOUND,
                    format!("No stub for {}", path).into_bytes(),
                    session.delay,
                ),
            })
        }
    }
}

fn normalize(path: &str) -> String {
    path.trim_matches('/').to_string()
}
