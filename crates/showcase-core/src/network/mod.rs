//! Network layer for the backend and third-party metadata APIs.
//!
//! This module provides:
//! - A transport seam over reqwest (swappable in tests)
//! - The backend client with one-shot credential rotation
//! - Cached GitHub repository metadata with rate limit awareness

mod client;
mod github;
mod transport;

pub use client::ResilientClient;
pub use github::{RateLimitState, RepositoryMetadataClient};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
