//! Repository metadata shown on theme and plugin pages.

use crate::error::{Result, ShowcaseError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

fn segment_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+$").expect("static regex is valid")
    })
}

/// Validated `owner/name` repository identifier.
///
/// Used verbatim as the cache key, so two repositories can never share an
/// entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositoryId {
    slug: String,
}

impl RepositoryId {
    pub fn new(owner: &str, name: &str) -> Result<Self> {
        format!("{}/{}", owner, name).parse()
    }

    pub fn as_str(&self) -> &str {
        &self.slug
    }

    pub fn owner(&self) -> &str {
        self.slug.split_once('/').map(|(o, _)| o).unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.slug.split_once('/').map(|(_, n)| n).unwrap_or_default()
    }
}

impl FromStr for RepositoryId {
    type Err = ShowcaseError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_end_matches(".git");
        if !segment_pattern().is_match(trimmed) {
            return Err(ShowcaseError::InvalidRepository(s.to_string()));
        }
        let (owner, name) = trimmed.split_once('/').unwrap_or_default();
        if matches!(owner, "." | "..") || matches!(name, "." | "..") {
            return Err(ShowcaseError::InvalidRepository(s.to_string()));
        }
        Ok(Self {
            slug: trimmed.to_string(),
        })
    }
}

impl TryFrom<String> for RepositoryId {
    type Error = ShowcaseError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<RepositoryId> for String {
    fn from(id: RepositoryId) -> Self {
        id.slug
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.slug)
    }
}

/// A repository contributor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub login: String,
    pub avatar_url: String,
    pub html_url: String,
}

/// Summary plus contributors for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub stars: u64,
    pub forks: u64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub contributors: Vec<Contributor>,
}

/// `GET /repos/{owner}/{name}` payload (fields we use).
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRepoSummary {
    pub stargazers_count: u64,
    pub forks_count: u64,
    #[serde(default)]
    pub description: Option<String>,
}

/// One element of `GET /repos/{owner}/{name}/contributors`.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubContributor {
    pub login: String,
    pub avatar_url: String,
    pub html_url: String,
}

impl From<GitHubContributor> for Contributor {
    fn from(c: GitHubContributor) -> Self {
        Self {
            login: c.login,
            avatar_url: c.avatar_url,
            html_url: c.html_url,
        }
    }
}

impl RepositoryInfo {
    pub fn from_github(summary: GitHubRepoSummary, contributors: Vec<GitHubContributor>) -> Self {
        Self {
            stars: summary.stargazers_count,
            forks: summary.forks_count,
            description: summary.description,
            contributors: contributors.into_iter().map(Contributor::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_ids() {
        let id: RepositoryId = "rust-lang/rust".parse().unwrap();
        assert_eq!(id.owner(), "rust-lang");
        assert_eq!(id.name(), "rust");
        assert_eq!(id.to_string(), "rust-lang/rust");

        let id: RepositoryId = " acme/theme.dark.git ".parse().unwrap();
        assert_eq!(id.as_str(), "acme/theme.dark");
    }

    #[test]
    fn test_parse_invalid_ids() {
        for bad in ["", "owner", "owner/", "/name", "a/b/c", "a b/c", "../x", "a/.."] {
            assert!(bad.parse::<RepositoryId>().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_repository_id_serde() {
        let id = RepositoryId::new("acme", "widgets").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""acme/widgets""#);
        assert!(serde_json::from_str::<RepositoryId>(r#""nope""#).is_err());
    }

    #[test]
    fn test_from_github_payloads() {
        let summary: GitHubRepoSummary = serde_json::from_value(serde_json::json!({
            "stargazers_count": 12,
            "forks_count": 3,
            "description": null,
            "full_name": "acme/widgets"
        }))
        .unwrap();
        let contributors: Vec<GitHubContributor> = serde_json::from_value(serde_json::json!([
            {"login": "ada", "avatar_url": "https://a/1", "html_url": "https://gh/ada", "id": 1}
        ]))
        .unwrap();

        let info = RepositoryInfo::from_github(summary, contributors);
        assert_eq!(info.stars, 12);
        assert_eq!(info.forks, 3);
        assert!(info.description.is_none());
        assert_eq!(info.contributors[0].login, "ada");
    }
}
