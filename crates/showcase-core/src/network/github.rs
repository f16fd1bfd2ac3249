//! Repository metadata from the GitHub API, cached per repository.
//!
//! Each lookup is two calls (summary + contributors). Either one failing fails
//! the whole fetch, which lets the cache fall back to the last good pair
//! instead of serving half-updated data.
//!
//! The unauthenticated GitHub quota is small, so rate limit headers are
//! tracked and logged; an exhausted quota surfaces as
//! [`ShowcaseError::RateLimited`].

use crate::cache::{CacheStatus, Cached, TtlCache};
use crate::clock::Clock;
use crate::config::{CacheConfig, NetworkConfig};
use crate::error::{Result, ShowcaseError};
use crate::models::{GitHubContributor, GitHubRepoSummary, RepositoryId, RepositoryInfo};
use crate::network::transport::{HttpRequest, HttpResponse, HttpTransport};
use crate::storage::KeyValueStore;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const SERVICE_NAME: &str = "GitHub";

/// Rate limit state extracted from response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitState {
    /// Remaining requests allowed.
    pub remaining: Option<u64>,
    /// Total request limit.
    pub limit: Option<u64>,
    /// Unix timestamp when the rate limit resets.
    pub reset: Option<u64>,
}

impl RateLimitState {
    /// True when the quota is known to be used up.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    /// True when below 10% of the limit.
    pub fn is_low(&self) -> bool {
        match (self.remaining, self.limit) {
            (Some(remaining), Some(limit)) if limit > 0 => {
                let threshold = (limit as f64 * 0.1) as u64;
                remaining < threshold.max(1)
            }
            _ => false,
        }
    }
}

/// Client for repository summaries and contributor lists.
pub struct RepositoryMetadataClient {
    transport: Arc<dyn HttpTransport>,
    cache: TtlCache<RepositoryInfo>,
    api_base: String,
    ttl: Duration,
    rate_limit_remaining: AtomicI64,
    rate_limit_limit: AtomicU64,
    rate_limit_reset: AtomicU64,
}

impl RepositoryMetadataClient {
    /// Create a client against the public GitHub API with the default TTL.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_options(
            transport,
            storage,
            clock,
            NetworkConfig::GITHUB_API_BASE,
            CacheConfig::REPO_INFO_TTL,
        )
    }

    pub fn with_options(
        transport: Arc<dyn HttpTransport>,
        storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        api_base: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            transport,
            cache: TtlCache::new(CacheConfig::REPO_INFO_NAMESPACE, storage, clock),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            ttl,
            rate_limit_remaining: AtomicI64::new(-1),
            rate_limit_limit: AtomicU64::new(0),
            rate_limit_reset: AtomicU64::new(0),
        }
    }

    /// Metadata for `repo`, served from cache while fresh.
    ///
    /// Falls back to the last cached value if GitHub cannot be reached or
    /// returns something unusable; errors only when nothing was ever cached.
    pub async fn repository_info(&self, repo: &RepositoryId) -> Result<RepositoryInfo> {
        self.repository_info_detailed(repo)
            .await
            .map(|cached| cached.value)
    }

    pub async fn repository_info_detailed(
        &self,
        repo: &RepositoryId,
    ) -> Result<Cached<RepositoryInfo>> {
        self.cache
            .get_or_fetch_detailed(repo.as_str(), || self.fetch(repo), self.ttl)
            .await
    }

    pub fn cache_status(&self, repo: &RepositoryId) -> CacheStatus {
        self.cache.status(repo.as_str(), self.ttl)
    }

    pub fn invalidate(&self, repo: &RepositoryId) {
        self.cache.invalidate(repo.as_str());
    }

    /// Get the current rate limit state.
    pub fn rate_limit_state(&self) -> RateLimitState {
        let remaining = self.rate_limit_remaining.load(Ordering::SeqCst);
        let limit = self.rate_limit_limit.load(Ordering::SeqCst);
        let reset = self.rate_limit_reset.load(Ordering::SeqCst);
        RateLimitState {
            remaining: (remaining >= 0).then_some(remaining as u64),
            limit: (limit > 0).then_some(limit),
            reset: (reset > 0).then_some(reset),
        }
    }

    // Internal methods

    async fn fetch(&self, repo: &RepositoryId) -> Result<RepositoryInfo> {
        let summary_url = format!("{}/repos/{}", self.api_base, repo);
        let contributors_url = format!("{}/contributors", summary_url);

        let summary: GitHubRepoSummary = decode(&self.get(&summary_url).await?, &summary_url)?;

        // Empty repositories answer the contributors call with 204 No Content.
        let response = self.get(&contributors_url).await?;
        let contributors: Vec<GitHubContributor> =
            if response.status == StatusCode::NO_CONTENT
                || response.body.iter().all(u8::is_ascii_whitespace)
            {
                Vec::new()
            } else {
                decode(&response, &contributors_url)?
            };

        info!(
            "Fetched metadata for {} ({} stars, {} contributors)",
            repo,
            summary.stargazers_count,
            contributors.len()
        );
        Ok(RepositoryInfo::from_github(summary, contributors))
    }

    /// GET `url`, failing on rate limiting and non-2xx statuses.
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let request =
            HttpRequest::get(url).with_header("Accept", NetworkConfig::GITHUB_ACCEPT);
        let response = self.transport.send(request).await?;
        self.update_rate_limits(&response);

        let status = response.status;
        if (status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS)
            && self.rate_limit_state().is_exhausted()
        {
            return Err(ShowcaseError::RateLimited {
                service: SERVICE_NAME.to_string(),
                reset_at: self.rate_limit_state().reset,
            });
        }
        if !status.is_success() {
            return Err(ShowcaseError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    fn update_rate_limits(&self, response: &HttpResponse) {
        let parse = |name: &str| response.header(name).and_then(|v| v.trim().parse::<u64>().ok());

        if let Some(remaining) = parse("X-RateLimit-Remaining") {
            self.rate_limit_remaining
                .store(remaining.min(i64::MAX as u64) as i64, Ordering::SeqCst);
        }
        if let Some(limit) = parse("X-RateLimit-Limit") {
            self.rate_limit_limit.store(limit, Ordering::SeqCst);
        }
        if let Some(reset) = parse("X-RateLimit-Reset") {
            self.rate_limit_reset.store(reset, Ordering::SeqCst);
        }

        let state = self.rate_limit_state();
        if state.is_low() {
            warn!(
                "GitHub rate limit low: {:?}/{:?} remaining",
                state.remaining, state.limit
            );
        } else if let (Some(remaining), Some(limit)) = (state.remaining, state.limit) {
            debug!("GitHub rate limit: {}/{}", remaining, limit);
        }
    }
}

fn decode<T: DeserializeOwned>(response: &HttpResponse, url: &str) -> Result<T> {
    response
        .json()
        .map_err(|e| ShowcaseError::malformed(SERVICE_NAME, format!("{}: {}", url, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheSource;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;
    use crate::test_support::{json, network_error, status, FakeTransport};
    use reqwest::header::HeaderValue;
    use serde_json::json as j;
    use std::sync::atomic::AtomicBool;

    fn summary() -> serde_json::Value {
        j!({"stargazers_count": 120, "forks_count": 8, "description": "A dark theme"})
    }

    fn contributors() -> serde_json::Value {
        j!([{"login": "ada", "avatar_url": "https://avatars/ada", "html_url": "https://github.com/ada"}])
    }

    fn github_ok(req: &HttpRequest) -> Result<HttpResponse> {
        if req.url.ends_with("/contributors") {
            Ok(json(200, contributors()))
        } else {
            Ok(json(200, summary()))
        }
    }

    fn client(
        transport: Arc<FakeTransport>,
        clock: Arc<ManualClock>,
    ) -> (Arc<MemoryStore>, RepositoryMetadataClient) {
        let storage = Arc::new(MemoryStore::new());
        let client = RepositoryMetadataClient::with_options(
            transport,
            storage.clone(),
            clock,
            "https://api.github.test/",
            Duration::from_secs(3600),
        );
        (storage, client)
    }

    #[tokio::test]
    async fn test_fetches_summary_and_contributors() {
        let transport = Arc::new(FakeTransport::new(github_ok));
        let (storage, client) = client(transport.clone(), Arc::new(ManualClock::new(0)));
        let repo: RepositoryId = "acme/dark-theme".parse().unwrap();

        let info = client.repository_info(&repo).await.unwrap();

        assert_eq!(info.stars, 120);
        assert_eq!(info.forks, 8);
        assert_eq!(info.description.as_deref(), Some("A dark theme"));
        assert_eq!(info.contributors.len(), 1);
        assert_eq!(info.contributors[0].login, "ada");

        let urls: Vec<String> = transport.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                "https://api.github.test/repos/acme/dark-theme",
                "https://api.github.test/repos/acme/dark-theme/contributors",
            ]
        );
        assert_eq!(
            transport.requests()[0].header("Accept"),
            Some("application/vnd.github.v3+json")
        );
        assert!(storage.get("github_repo_acme/dark-theme").unwrap().is_some());
        assert!(storage.get("github_repo_acme/dark-theme_ts").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_second_lookup_within_ttl_hits_cache() {
        let transport = Arc::new(FakeTransport::new(github_ok));
        let clock = Arc::new(ManualClock::new(0));
        let (_storage, client) = client(transport.clone(), clock.clone());
        let repo: RepositoryId = "acme/dark-theme".parse().unwrap();

        client.repository_info(&repo).await.unwrap();
        clock.set(60_000);
        let cached = client.repository_info_detailed(&repo).await.unwrap();

        assert_eq!(cached.source, CacheSource::Fresh);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_contributor_failure_falls_back_to_previous_pair() {
        let offline = Arc::new(AtomicBool::new(false));
        let flag = offline.clone();
        let transport = Arc::new(FakeTransport::new(move |req| {
            if flag.load(Ordering::SeqCst) && req.url.ends_with("/contributors") {
                return Err(network_error());
            }
            github_ok(req)
        }));
        let clock = Arc::new(ManualClock::new(0));
        let (_storage, client) = client(transport, clock.clone());
        let repo: RepositoryId = "acme/dark-theme".parse().unwrap();

        let original = client.repository_info(&repo).await.unwrap();

        offline.store(true, Ordering::SeqCst);
        clock.set(2 * 3_600_000);
        let cached = client.repository_info_detailed(&repo).await.unwrap();

        assert_eq!(cached.source, CacheSource::Stale);
        assert_eq!(cached.value, original);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_a_fetch_failure() {
        let transport = Arc::new(FakeTransport::new(|_| Ok(json(200, j!({"unexpected": true})))));
        let (_storage, client) = client(transport, Arc::new(ManualClock::new(0)));
        let repo: RepositoryId = "acme/dark-theme".parse().unwrap();

        let err = client.repository_info(&repo).await.unwrap_err();
        assert!(matches!(err, ShowcaseError::MalformedPayload { .. }));
    }

    #[tokio::test]
    async fn test_empty_repository_has_no_contributors() {
        let transport = Arc::new(FakeTransport::new(|req| {
            if req.url.ends_with("/contributors") {
                Ok(status(204))
            } else {
                Ok(json(200, summary()))
            }
        }));
        let clock = Arc::new(ManualClock::new(0));
        let (_storage, client) = client(transport.clone(), clock.clone());
        let repo: RepositoryId = "acme/empty".parse().unwrap();

        let info = client.repository_info(&repo).await.unwrap();
        assert_eq!(info.stars, 120);
        assert!(info.contributors.is_empty());

        // Cached like any other repository.
        clock.set(60_000);
        let cached = client.repository_info_detailed(&repo).await.unwrap();
        assert_eq!(cached.source, CacheSource::Fresh);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_summary_body_is_malformed() {
        let transport = Arc::new(FakeTransport::new(|_| Ok(status(200))));
        let (_storage, client) = client(transport, Arc::new(ManualClock::new(0)));
        let repo: RepositoryId = "acme/dark-theme".parse().unwrap();

        let err = client.repository_info(&repo).await.unwrap_err();
        assert!(matches!(err, ShowcaseError::MalformedPayload { .. }));
    }

    #[tokio::test]
    async fn test_not_found_without_cache_propagates() {
        let transport = Arc::new(FakeTransport::new(|_| Ok(status(404))));
        let (_storage, client) = client(transport, Arc::new(ManualClock::new(0)));
        let repo: RepositoryId = "acme/missing".parse().unwrap();

        let err = client.repository_info(&repo).await.unwrap_err();
        assert!(matches!(err, ShowcaseError::Http { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_exhausted_quota_reports_rate_limit() {
        let transport = Arc::new(FakeTransport::new(|_| {
            let mut response = status(403);
            response
                .headers
                .insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
            response
                .headers
                .insert("x-ratelimit-limit", HeaderValue::from_static("60"));
            response
                .headers
                .insert("x-ratelimit-reset", HeaderValue::from_static("1700000000"));
            Ok(response)
        }));
        let (_storage, client) = client(transport, Arc::new(ManualClock::new(0)));
        let repo: RepositoryId = "acme/dark-theme".parse().unwrap();

        let err = client.repository_info(&repo).await.unwrap_err();
        assert!(matches!(
            err,
            ShowcaseError::RateLimited {
                reset_at: Some(1_700_000_000),
                ..
            }
        ));
        let state = client.rate_limit_state();
        assert!(state.is_exhausted());
        assert!(state.is_low());
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let transport = Arc::new(FakeTransport::new(github_ok));
        let (_storage, client) = client(transport.clone(), Arc::new(ManualClock::new(0)));
        let repo: RepositoryId = "acme/dark-theme".parse().unwrap();

        client.repository_info(&repo).await.unwrap();
        assert!(client.cache_status(&repo).is_fresh);

        client.invalidate(&repo);
        assert!(!client.cache_status(&repo).has_cache);
        client.repository_info(&repo).await.unwrap();
        assert_eq!(transport.requests().len(), 4);
    }

    #[test]
    fn test_rate_limit_state_thresholds() {
        let state = RateLimitState {
            remaining: Some(5),
            limit: Some(100),
            reset: None,
        };
        assert!(state.is_low());
        assert!(!state.is_exhausted());

        let state = RateLimitState {
            remaining: Some(50),
            limit: Some(100),
            reset: None,
        };
        assert!(!state.is_low());
        assert!(!RateLimitState::default().is_low());
    }
}
