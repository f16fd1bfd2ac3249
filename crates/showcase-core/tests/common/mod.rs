//! Shared helpers for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use reqwest::StatusCode;
use showcase_core::{HttpRequest, HttpResponse, HttpTransport, Result, ShowcaseError};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

type Responder = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync>;

/// Transport that answers from a closure and records every request.
pub struct FakeTransport {
    responder: Responder,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn new(
        responder: impl Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, suffix: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.ends_with(suffix))
            .collect()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());
        (self.responder)(&request)
    }
}

pub fn status(code: u16) -> HttpResponse {
    HttpResponse::new(StatusCode::from_u16(code).unwrap(), "")
}

pub fn json(code: u16, body: serde_json::Value) -> HttpResponse {
    HttpResponse::json_body(StatusCode::from_u16(code).unwrap(), &body).unwrap()
}

pub fn network_error() -> ShowcaseError {
    ShowcaseError::Network {
        message: "connection refused".to_string(),
        cause: None,
    }
}

/// Log output captured from a thread-local subscriber.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Capture logs on the current thread until the guard is dropped.
///
/// Use with current-thread tests so spawned tasks log to the same subscriber.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}
