//! Authenticated backend client with one-shot credential rotation.
//!
//! Every request carries the current credential as a header. A 403 means the
//! backend rejected that credential: the client clears it, asks the token
//! endpoint for a new one, and replays the original request exactly once.
//!
//! ```text
//! request ──► 403? ──no──► return response
//!               │
//!              yes ──► clear credential ──► GET /auth/token
//!                                              │
//!                              failed ◄────────┴────────► ok
//!                                │                         │
//!                     return original 403        store token, replay once,
//!                                                return whatever it yields
//! ```

use crate::auth::CredentialStore;
use crate::config::ClientOptions;
use crate::error::{Result, ShowcaseError};
use crate::network::transport::{HttpRequest, HttpResponse, HttpTransport};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Body of a successful token-issuance response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

/// Backend client that injects and rotates the credential.
pub struct ResilientClient {
    transport: Arc<dyn HttpTransport>,
    credentials: Arc<CredentialStore>,
    origin: Url,
    token_url: Url,
    credential_header: String,
}

impl ResilientClient {
    /// Create a client for the backend described by `options`.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        credentials: Arc<CredentialStore>,
        options: &ClientOptions,
    ) -> Result<Self> {
        let origin = Url::parse(&options.origin).map_err(|e| ShowcaseError::InvalidUrl {
            url: options.origin.clone(),
            message: e.to_string(),
        })?;
        let token_url = origin
            .join(&options.token_path)
            .map_err(|e| ShowcaseError::InvalidUrl {
                url: options.token_path.clone(),
                message: e.to_string(),
            })?;

        Ok(Self {
            transport,
            credentials,
            origin,
            token_url,
            credential_header: options.credential_header.clone(),
        })
    }

    /// The credential store this client reads and rotates.
    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }

    /// Resolve a path against the backend origin. Absolute URLs pass through.
    pub fn resolve(&self, path_or_url: &str) -> Result<String> {
        if let Ok(absolute) = Url::parse(path_or_url) {
            return Ok(absolute.into());
        }
        self.origin
            .join(path_or_url)
            .map(String::from)
            .map_err(|e| ShowcaseError::InvalidUrl {
                url: path_or_url.to_string(),
                message: e.to_string(),
            })
    }

    /// Send a request, rotating the credential once on 403.
    ///
    /// Transport errors on the first attempt and on the replay propagate.
    /// Anything that goes wrong while obtaining a new token is logged and the
    /// original 403 response is returned unmodified.
    pub async fn request(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        request.url = self.resolve(&request.url)?;

        let first = self.send_with_credential(request.clone()).await?;
        if first.status != StatusCode::FORBIDDEN {
            return Ok(first);
        }

        info!(
            "{} {} rejected with 403, rotating credential",
            request.method, request.url
        );
        self.credentials.clear();

        let token = match self.issue_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!("Credential refresh failed, returning original 403: {}", e);
                return Ok(first);
            }
        };
        self.credentials.set(token.clone());

        debug!("Replaying {} {} with fresh credential", request.method, request.url);
        let replay = request.with_header(&self.credential_header, token);
        self.transport.send(replay).await
    }

    pub async fn get(&self, path: &str) -> Result<HttpResponse> {
        self.request(HttpRequest::get(path)).await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<HttpResponse> {
        self.request(HttpRequest::post(path).with_json(body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<HttpResponse> {
        self.request(HttpRequest::delete(path)).await
    }

    /// GET and decode a JSON body. Non-2xx becomes [`ShowcaseError::Http`].
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.resolve(path)?;
        let response = self.get(&url).await?;
        if !response.is_success() {
            return Err(ShowcaseError::Http {
                url,
                status: response.status.as_u16(),
            });
        }
        response.json()
    }

    /// Obtain and store a token explicitly, e.g. right after login.
    pub async fn refresh_token(&self) -> Result<String> {
        let token = self.issue_token().await?;
        self.credentials.set(token.clone());
        Ok(token)
    }

    /// Drop the stored credential.
    pub fn logout(&self) {
        self.credentials.clear();
        info!("Logged out, credential cleared");
    }

    // Internal methods

    async fn send_with_credential(&self, request: HttpRequest) -> Result<HttpResponse> {
        let request = match self.credentials.get() {
            Some(token) => request.with_header(&self.credential_header, token),
            None => request,
        };
        self.transport.send(request).await
    }

    async fn issue_token(&self) -> Result<String> {
        let response = self
            .transport
            .send(HttpRequest::get(self.token_url.as_str()))
            .await
            .map_err(|e| ShowcaseError::TokenIssuance {
                message: e.to_string(),
            })?;

        if !response.is_success() {
            return Err(ShowcaseError::TokenIssuance {
                message: format!("token endpoint returned {}", response.status),
            });
        }

        let body: TokenResponse =
            response
                .json()
                .map_err(|e| ShowcaseError::TokenIssuance {
                    message: e.to_string(),
                })?;
        if body.token.is_empty() {
            return Err(ShowcaseError::TokenIssuance {
                message: "token endpoint returned an empty token".to_string(),
            });
        }

        info!("Issued new credential");
        Ok(body.token)
    }
}
