//! Mock transport for unit testing.
//!
//! Records every request and replays configured responses, so adapter and
//! controller behavior can be tested without a camera.
//!
//! # Example
//!
//! ```rust,ignore
//! use gr::transport::mock::{MockTransport, Request};
//!
//! let mock = MockTransport::new();
//! mock.respond("/v1/props", json!({"model": "GR III"}));
//!
//! // ... drive an adapter ...
//!
//! mock.assert_contains(&Request::get("/v1/props"));
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::trace;

use super::{Body, Transport};
use crate::error::{CameraError, Result};

/// Recorded request for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: &'static str,
    pub path: String,
    pub body: Option<String>,
}

impl Request {
    pub fn get(path: &str) -> Self {
        Self {
            method: "GET",
            path: path.to_string(),
            body: None,
        }
    }

    pub fn post(path: &str, body: &str) -> Self {
        Self {
            method: "POST",
            path: path.to_string(),
            body: Some(body.to_string()),
        }
    }

    pub fn put(path: &str, body: &str) -> Self {
        Self {
            method: "PUT",
            path: path.to_string(),
            body: Some(body.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Ok(Value),
    Fail(String),
}

/// Mock transport for testing without a camera.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, Reply>>,
    queued: Mutex<HashMap<String, VecDeque<Reply>>>,
    request_log: Mutex<Vec<Request>>,
    error_injection: Mutex<Option<CameraError>>,
    unreachable: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // === Configuration ===

    /// Answer every request to `path` with `value`.
    pub fn respond(&self, path: &str, value: Value) {
        lock(&self.responses).insert(path.to_string(), Reply::Ok(value));
    }

    /// Fail every request to `path`.
    pub fn fail(&self, path: &str) {
        lock(&self.responses).insert(path.to_string(), Reply::Fail(format!("{path} failed")));
    }

    /// Answer the next request to `path` with `value`, ahead of `respond`.
    pub fn queue(&self, path: &str, value: Value) {
        lock(&self.queued)
            .entry(path.to_string())
            .or_default()
            .push_back(Reply::Ok(value));
    }

    /// Fail the next request to `path`, ahead of `respond`.
    pub fn queue_failure(&self, path: &str) {
        lock(&self.queued)
            .entry(path.to_string())
            .or_default()
            .push_back(Reply::Fail(format!("{path} failed")));
    }

    /// Inject an error for the next request, whatever its path.
    pub fn inject_error(&self, error: CameraError) {
        *lock(&self.error_injection) = Some(error);
    }

    /// Make every request fail as if the camera left the network.
    pub fn disconnect(&self) {
        self.unreachable.store(true, Ordering::SeqCst);
    }

    pub fn reconnect(&self) {
        self.unreachable.store(false, Ordering::SeqCst);
    }

    // === Assertions ===

    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        lock(&self.request_log).clone()
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        lock(&self.request_log).len()
    }

    /// Number of recorded requests to `path`.
    #[must_use]
    pub fn count_for(&self, path: &str) -> usize {
        lock(&self.request_log)
            .iter()
            .filter(|r| r.path == path)
            .count()
    }

    /// Assert exactly these requests were made, in order.
    ///
    /// # Panics
    ///
    /// Panics if the requests don't match.
    pub fn assert_requests(&self, expected: &[Request]) {
        let actual = self.requests();
        assert_eq!(
            actual, expected,
            "Request mismatch.\nExpected: {expected:#?}\nActual: {actual:#?}",
        );
    }

    /// # Panics
    ///
    /// Panics if any request was recorded.
    pub fn assert_no_requests(&self) {
        let requests = self.requests();
        assert!(
            requests.is_empty(),
            "Expected no requests, but found: {requests:#?}",
        );
    }

    /// # Panics
    ///
    /// Panics if the request was not found.
    pub fn assert_contains(&self, expected: &Request) {
        let requests = self.requests();
        assert!(
            requests.contains(expected),
            "Expected request {expected:?} not found in: {requests:#?}",
        );
    }

    pub fn clear_requests(&self) {
        lock(&self.request_log).clear();
    }

    // === Internal Helpers ===

    fn handle(&self, method: &'static str, path: &str, body: Option<&Body>) -> Result<Value> {
        let request = Request {
            method,
            path: path.to_string(),
            body: body.map(Body::encode),
        };
        trace!(?request, "Recording request");
        lock(&self.request_log).push(request);

        if let Some(error) = lock(&self.error_injection).take() {
            return Err(error);
        }
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(CameraError::transport(path, "mock camera unreachable"));
        }

        let queued = lock(&self.queued).get_mut(path).and_then(VecDeque::pop_front);
        let reply = queued.or_else(|| lock(&self.responses).get(path).cloned());

        match reply {
            Some(Reply::Ok(value)) => Ok(value),
            Some(Reply::Fail(reason)) => Err(CameraError::transport(path, reason)),
            None => Ok(json!({"errCode": 200, "errMsg": "OK"})),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn base_url(&self) -> &str {
        "http://192.168.0.1"
    }

    async fn get(&self, path: &str) -> Result<Value> {
        self.handle("GET", path, None)
    }

    async fn post(&self, path: &str, body: Body) -> Result<Value> {
        self.handle("POST", path, Some(&body))
    }

    async fn put(&self, path: &str, body: Body) -> Result<Value> {
        self.handle("PUT", path, Some(&body))
    }
}
