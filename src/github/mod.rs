//! Thin async client for the GitHub REST API.
//!
//! Only the handful of endpoints the directory needs: repository metadata,
//! organization avatars, and the authenticated user's email list.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("devdir/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoData {
    pub full_name: String,
    pub description: Option<String>,
    pub stargazers_count: Option<i64>,
    pub forks_count: Option<i64>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrgData {
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailEntry {
    pub email: String,
    pub primary: bool,
    pub verified: bool,
}

/// Splits a GitHub web URL into its `owner/repo` path.
///
/// Accepts exactly two path segments after the host; anything else (a bare
/// profile URL, a deep link into a file tree) is rejected.
pub fn parse_repo_url(url: &str) -> Result<(String, String)> {
    let trimmed = url.trim().trim_end_matches('/');
    let path = trimmed
        .strip_prefix("https://github.com/")
        .or_else(|| trimmed.strip_prefix("http://github.com/"))
        .ok_or_else(|| Error::InvalidInput(format!("not a github repository url: '{url}'")))?;

    let mut segments = path.split('/');
    match (segments.next(), segments.next(), segments.next()) {
        (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(Error::InvalidInput(format!(
            "not a github repository url: '{url}'"
        ))),
    }
}

/// Extracts the trailing login segment from a GitHub organization URL.
pub fn parse_org_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let path = trimmed
        .strip_prefix("https://github.com/")
        .or_else(|| trimmed.strip_prefix("http://github.com/"))
        .ok_or_else(|| Error::InvalidInput(format!("not a github url: '{url}'")))?;

    let mut segments = path.split('/');
    match (segments.next(), segments.next()) {
        (Some(login), None) if !login.is_empty() => Ok(login.to_string()),
        _ => Err(Error::InvalidInput(format!(
            "not a github organization url: '{url}'"
        ))),
    }
}

#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
}

impl GithubClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
    ) -> Result<T> {
        let mut request = self
            .http
            .get(format!("{}{path}", self.api_url))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("github request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound);
        }
        if !status.is_success() {
            return Err(Error::Upstream(format!(
                "github returned {status} for {path}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("github response for {path} unreadable: {e}")))
    }

    /// Fetches repository metadata for a GitHub web URL. The token is
    /// optional; without one, private repositories surface as `NotFound`.
    pub async fn fetch_repo(&self, url: &str, token: Option<&str>) -> Result<RepoData> {
        let (owner, repo) = parse_repo_url(url)?;
        self.get_json(&format!("/repos/{owner}/{repo}"), token).await
    }

    /// Fetches the avatar for the organization a GitHub URL points at.
    pub async fn fetch_org(&self, url: &str) -> Result<OrgData> {
        let login = parse_org_url(url)?;
        self.get_json(&format!("/orgs/{login}"), None).await
    }

    /// Lists the authenticated user's email addresses, including the
    /// non-public ones the profile itself omits.
    pub async fn list_emails(&self, token: &str) -> Result<Vec<EmailEntry>> {
        self.get_json("/user/emails", Some(token)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repo_url_accepts_owner_repo() {
        let (owner, repo) = parse_repo_url("https://github.com/rust-lang/cargo").unwrap();
        assert_eq!(owner, "rust-lang");
        assert_eq!(repo, "cargo");
    }

    #[test]
    fn test_parse_repo_url_ignores_trailing_slash() {
        let (owner, repo) = parse_repo_url("https://github.com/rust-lang/cargo/").unwrap();
        assert_eq!(owner, "rust-lang");
        assert_eq!(repo, "cargo");
    }

    #[test]
    fn test_parse_repo_url_rejects_profiles_and_deep_links() {
        assert!(parse_repo_url("https://github.com/rust-lang").is_err());
        assert!(parse_repo_url("https://github.com/rust-lang/cargo/tree/master").is_err());
        assert!(parse_repo_url("https://gitlab.com/rust-lang/cargo").is_err());
        assert!(parse_repo_url("").is_err());
    }

    #[test]
    fn test_parse_org_url() {
        assert_eq!(
            parse_org_url("https://github.com/tokio-rs/").unwrap(),
            "tokio-rs"
        );
        assert!(parse_org_url("https://github.com/tokio-rs/tokio").is_err());
        assert!(parse_org_url("https://example.com/tokio-rs").is_err());
    }
}
