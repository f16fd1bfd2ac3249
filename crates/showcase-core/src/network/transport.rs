//! HTTP transport seam.
//!
//! [`HttpTransport`] sends one request and returns one fully buffered response.
//! Non-2xx statuses are responses, not errors; only transport-level failures
//! (DNS, connect, TLS, timeout) come back as `Err`.

use crate::config::ClientOptions;
use crate::error::{Result, ShowcaseError};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// An outgoing HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Set a header, replacing any existing header with the same name
    /// (case-insensitive).
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// Serialize `body` as the JSON request body.
    pub fn with_json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self> {
        let encoded = serde_json::to_vec(body)?;
        let mut request = self.with_header("Content-Type", "application/json");
        request.body = Some(Bytes::from(encoded));
        Ok(request)
    }

    /// Value of the named header, if set.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A buffered HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// JSON response with the given status.
    pub fn json_body<T: Serialize + ?Sized>(status: StatusCode, body: &T) -> Result<Self> {
        Ok(Self::new(status, serde_json::to_vec(body)?))
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| ShowcaseError::Json {
            message: format!("Failed to decode response body: {}", e),
            source: Some(e),
        })
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Value of the named header, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Sends HTTP requests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Production transport over reqwest.
///
/// The cookie store is always enabled so the backend can tie its CSRF
/// protection to the session cookie on every call. No request timeout is
/// applied unless [`ClientOptions::request_timeout`] sets one.
pub struct ReqwestTransport {
    client: Client,
    timeout: Option<Duration>,
}

impl ReqwestTransport {
    pub fn new(options: &ClientOptions) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(options.user_agent.as_str())
            .cookie_store(true);
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| ShowcaseError::Network {
            message: format!("Failed to create HTTP client: {}", e),
            cause: None,
        })?;
        Ok(Self {
            client,
            timeout: options.request_timeout,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ShowcaseError::Other(format!("Invalid header name {}: {}", name, e))
            })?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ShowcaseError::Other(format!("Invalid header value: {}", e)))?;
            headers.insert(name, value);
        }

        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ShowcaseError::Timeout(self.timeout)
            } else {
                ShowcaseError::Network {
                    message: format!("{} {} failed: {}", request.method, request.url, e),
                    cause: std::error::Error::source(&e).map(|s| s.to_string()),
                }
            }
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                ShowcaseError::Timeout(self.timeout)
            } else {
                ShowcaseError::from(e)
            }
        })?;
        debug!("{} {} -> {}", request.method, request.url, status);

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_with_header_replaces_case_insensitively() {
        let request = HttpRequest::get("https://a.test/x")
            .with_header("X-CSRF-Token", "one")
            .with_header("x-csrf-token", "two");
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.header("X-CSRF-TOKEN"), Some("two"));
    }

    #[test]
    fn test_with_json_sets_body_and_content_type() {
        let request = HttpRequest::post("https://a.test/x")
            .with_json(&serde_json::json!({"id": 7}))
            .unwrap();
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.body.as_deref(), Some(br#"{"id":7}"#.as_slice()));
    }

    #[test]
    fn test_response_json_decoding() {
        let response = HttpResponse::new(StatusCode::OK, r#"{"token":"abc"}"#);
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["token"], "abc");

        let broken = HttpResponse::new(StatusCode::OK, "<html>");
        assert!(broken.json::<serde_json::Value>().is_err());
    }

    #[tokio::test]
    async fn test_transport_creation() {
        let transport = ReqwestTransport::new(&ClientOptions::default());
        assert!(transport.is_ok());
    }

    const OK_RESPONSE: &str = "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok";

    /// Loopback HTTP/1.1 server answering one connection per canned response,
    /// each after the given delay. Returns the base URL and the request heads
    /// it received.
    async fn spawn_server(
        responses: Vec<(Duration, &'static str)>,
    ) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let heads = Arc::new(Mutex::new(Vec::new()));
        let seen = heads.clone();

        tokio::spawn(async move {
            for (delay, response) in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut head = Vec::new();
                let mut chunk = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => head.extend_from_slice(&chunk[..n]),
                    }
                }
                seen.lock()
                    .unwrap()
                    .push(String::from_utf8_lossy(&head).to_ascii_lowercase());
                tokio::time::sleep(delay).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}", addr), heads)
    }

    // Paused time auto-advances while the client waits on the socket, so a
    // reqwest timeout would fire long before the server's 60 s delay ends.
    #[tokio::test(start_paused = true)]
    async fn test_slow_response_is_not_cut_off_by_default() {
        let (base, _heads) = spawn_server(vec![(Duration::from_secs(60), OK_RESPONSE)]).await;
        let transport = ReqwestTransport::new(&ClientOptions::default()).unwrap();

        let response = transport
            .send(HttpRequest::get(format!("{}/slow", base)))
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.text(), "ok");
    }

    #[tokio::test(start_paused = true)]
    async fn test_configured_timeout_is_reported() {
        let (base, _heads) = spawn_server(vec![(Duration::from_secs(60), OK_RESPONSE)]).await;
        let options = ClientOptions {
            request_timeout: Some(Duration::from_secs(2)),
            ..ClientOptions::default()
        };
        let transport = ReqwestTransport::new(&options).unwrap();

        let err = transport
            .send(HttpRequest::get(format!("{}/slow", base)))
            .await
            .unwrap_err();
        assert!(
            matches!(err, ShowcaseError::Timeout(Some(d)) if d == Duration::from_secs(2)),
            "unexpected error: {:?}",
            err
        );
    }

    #[tokio::test]
    async fn test_cookies_are_sent_back() {
        let (base, heads) = spawn_server(vec![
            (
                Duration::ZERO,
                "HTTP/1.1 200 OK\r\nSet-Cookie: session=abc123; Path=/\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            ),
            (Duration::ZERO, OK_RESPONSE),
        ])
        .await;
        let transport = ReqwestTransport::new(&ClientOptions::for_origin(base.as_str())).unwrap();

        transport
            .send(HttpRequest::get(format!("{}/login", base)))
            .await
            .unwrap();
        transport
            .send(HttpRequest::post(format!("{}/api/themes/nord/favorite", base)))
            .await
            .unwrap();

        let heads = heads.lock().unwrap().clone();
        assert_eq!(heads.len(), 2);
        assert!(!heads[0].contains("cookie:"));
        assert!(
            heads[1].contains("cookie: session=abc123"),
            "second request head:\n{}",
            heads[1]
        );
    }
}
