//! Scripted transport for unit tests.

use crate::error::{Result, ShowcaseError};
use crate::network::{HttpRequest, HttpResponse, HttpTransport};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Mutex;

type Responder = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync>;

/// Transport that answers from a closure and records every request it sees.
pub(crate) struct FakeTransport {
    responder: Responder,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub(crate) fn new(
        responder: impl Fn(&HttpRequest) -> Result<HttpResponse> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests whose URL ends with `suffix`.
    pub(crate) fn requests_to(&self, suffix: &str) -> Vec<HttpRequest> {
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

pub(crate) fn status(code: u16) -> HttpResponse {
    HttpResponse::new(StatusCode::from_u16(code).unwrap(), "")
}

pub(crate) fn json(code: u16, body: serde_json::Value) -> HttpResponse {
    HttpResponse::json_body(StatusCode::from_u16(code).unwrap(), &body).unwrap()
}

pub(crate) fn network_error() -> ShowcaseError {
    ShowcaseError::Network {
        message: "connection refused".to_string(),
        cause: None,
    }
}
