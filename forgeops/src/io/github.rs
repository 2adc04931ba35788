//! GitHub Actions repository secrets API.

use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

static REPO_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com[:/]([^/\s]+)/([^/\s]+?)(?:\.git)?/?$").unwrap()
});

/// `owner/repo` pair identifying a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

impl RepoSlug {
    /// Parse an HTTPS or SSH clone URL.
    ///
    /// Accepts `https://github.com/owner/repo`, an optional `.git` suffix or
    /// trailing slash, and `git@github.com:owner/repo.git`.
    pub fn parse(url: &str) -> Result<Self> {
        let caps = REPO_URL_RE.captures(url.trim()).ok_or_else(|| {
            anyhow!(
                "invalid GitHub repository URL '{url}' (expected https://github.com/owner/repo \
                 or git@github.com:owner/repo.git)"
            )
        })?;
        Ok(Self {
            owner: caps[1].to_string(),
            repo: caps[2].to_string(),
        })
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Repository public key used to seal secret values.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoPublicKey {
    pub key_id: String,
    /// Base64-encoded curve25519 public key.
    pub key: String,
}

pub struct GitHubClient {
    http: Client,
    api_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(api_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("forgeops/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build GitHub HTTP client")?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn repo_url(&self, slug: &RepoSlug) -> String {
        format!("{}/repos/{}/{}", self.api_url, slug.owner, slug.repo)
    }

    /// True if the token can read the repository.
    #[instrument(skip(self))]
    pub fn verify_access(&self, slug: &RepoSlug) -> Result<bool> {
        let resp = self
            .http
            .get(self.repo_url(slug))
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .with_context(|| format!("request repository {slug}"))?;
        let status = resp.status();
        if status != StatusCode::OK {
            warn!(%slug, %status, "repository access check failed");
        }
        Ok(status == StatusCode::OK)
    }

    #[instrument(skip(self))]
    pub fn public_key(&self, slug: &RepoSlug) -> Result<RepoPublicKey> {
        let resp = self
            .http
            .get(format!("{}/actions/secrets/public-key", self.repo_url(slug)))
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .send()
            .with_context(|| format!("request public key for {slug}"))?;
        let status = resp.status();
        if !status.is_success() {
            bail!("fetching public key for {slug} failed (HTTP {status})");
        }
        resp.json().context("parse public key response")
    }

    /// Create or update one secret. The value must already be sealed.
    #[instrument(skip(self, encrypted_value))]
    pub fn put_secret(
        &self,
        slug: &RepoSlug,
        name: &str,
        encrypted_value: &str,
        key_id: &str,
    ) -> Result<()> {
        let resp = self
            .http
            .put(format!("{}/actions/secrets/{name}", self.repo_url(slug)))
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .json(&json!({
                "encrypted_value": encrypted_value,
                "key_id": key_id,
            }))
            .send()
            .with_context(|| format!("request secret update for {name}"))?;
        let status = resp.status();
        if status != StatusCode::CREATED && status != StatusCode::NO_CONTENT {
            bail!("setting secret {name} failed (HTTP {status})");
        }
        debug!(name, %status, "secret stored");
        Ok(())
    }
}
