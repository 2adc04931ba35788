//! GitLab REST v4 client.
//!
//! Implements [`RemoteTree`] over groups (containers) and projects (leaves),
//! and lists member projects for bulk cloning. Calls are blocking and issued
//! one at a time.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::core::types::{ResourceKind, ResourceRef};
use crate::io::remote::{RemoteError, RemoteTree};

const ERROR_BODY_LIMIT: usize = 500;
const ALREADY_TAKEN: &str = "has already been taken";

/// Visibility applied to created groups and projects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Internal,
    Public,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Internal => "internal",
            Visibility::Public => "public",
        }
    }
}

/// Authenticated user, from `GET /user`.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentUser {
    pub id: u64,
    pub username: String,
}

/// One project as listed by `GET /projects`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectListing {
    pub ssh_url_to_repo: Option<String>,
    pub path_with_namespace: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroupRecord {
    id: u64,
    path: String,
    parent_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ProjectRecord {
    id: u64,
    path: String,
    namespace: NamespaceRecord,
}

#[derive(Debug, Deserialize)]
struct NamespaceRecord {
    kind: String,
}

#[derive(Debug, Deserialize)]
struct CreatedRecord {
    id: u64,
}

pub struct GitLabClient {
    http: Client,
    api_url: String,
    token: String,
    visibility: Visibility,
    per_page: u32,
}

impl GitLabClient {
    /// Build a client for the instance at `base_url` (e.g. `https://gitlab.com`).
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("forgeops/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build GitLab HTTP client")?;
        Ok(Self {
            http,
            api_url: format!("{}/api/v4", base_url.trim_end_matches('/')),
            token: token.to_string(),
            visibility: Visibility::default(),
            per_page: 100,
        })
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    /// Verify the credential.
    #[instrument(skip_all)]
    pub fn current_user(&self) -> Result<CurrentUser, RemoteError> {
        self.get_json("/user", &[])
    }

    /// Every project the credential is a member of, across all pages.
    #[instrument(skip_all)]
    pub fn list_projects(&self) -> Result<Vec<ProjectListing>, RemoteError> {
        let mut projects = Vec::new();
        let mut page = 1u32;
        loop {
            let batch: Vec<ProjectListing> = self.get_json(
                "/projects",
                &[
                    ("membership", "true".to_string()),
                    ("page", page.to_string()),
                    ("per_page", self.per_page.to_string()),
                ],
            )?;
            if batch.is_empty() {
                break;
            }
            debug!(page, count = batch.len(), "fetched project page");
            projects.extend(batch);
            page += 1;
        }
        Ok(projects)
    }

    fn find_group(&self, parent: Option<u64>, segment: &str) -> Result<Option<u64>, RemoteError> {
        let (path, mut query) = match parent {
            Some(id) => (format!("/groups/{id}/subgroups"), Vec::new()),
            None => (
                "/groups".to_string(),
                vec![("top_level_only", "true".to_string())],
            ),
        };
        query.push(("search", segment.to_string()));
        let found = self.search(&path, query, |group: &GroupRecord| {
            group.path == segment && (parent.is_some() || group.parent_id.is_none())
        })?;
        Ok(found.map(|group| group.id))
    }

    fn find_project(&self, parent: Option<u64>, segment: &str) -> Result<Option<u64>, RemoteError> {
        let (path, mut query) = match parent {
            Some(id) => (format!("/groups/{id}/projects"), Vec::new()),
            None => ("/projects".to_string(), vec![("owned", "true".to_string())]),
        };
        query.push(("search", segment.to_string()));
        let found = self.search(&path, query, |project: &ProjectRecord| {
            project.path == segment && (parent.is_some() || project.namespace.kind == "user")
        })?;
        Ok(found.map(|project| project.id))
    }

    /// Walk a `search=` listing page by page until `matches` accepts a record.
    ///
    /// GitLab search is a substring match, so the exact path can sit behind
    /// any number of similar names. Stops on a short or empty page.
    fn search<T: DeserializeOwned>(
        &self,
        path: &str,
        mut query: Vec<(&str, String)>,
        matches: impl Fn(&T) -> bool,
    ) -> Result<Option<T>, RemoteError> {
        query.push(("per_page", self.per_page.to_string()));
        let mut page = 1u32;
        loop {
            query.push(("page", page.to_string()));
            let batch: Vec<T> = self.get_json(path, &query)?;
            query.pop();
            let last = batch.len() < self.per_page as usize;
            if let Some(found) = batch.into_iter().find(|record| matches(record)) {
                return Ok(Some(found));
            }
            if last {
                return Ok(None);
            }
            debug!(path, page, "exact match not on this page, fetching next");
            page += 1;
        }
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, RemoteError> {
        let request = self
            .http
            .get(format!("{}{path}", self.api_url))
            .query(query);
        self.send(request)
    }

    fn post_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, RemoteError> {
        let request = self
            .http
            .post(format!("{}{path}", self.api_url))
            .json(body);
        self.send(request)
    }

    fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RemoteError> {
        let resp = request
            .header("PRIVATE-TOKEN", &self.token)
            .header("Accept", "application/json")
            .send()
            .map_err(|err| RemoteError::Transport(err.to_string()))?;

        log_rate_limit(resp.headers());
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .map_err(|err| RemoteError::Transport(err.to_string()))?;
        check_status(status, &body)?;
        serde_json::from_str(&body).map_err(|err| RemoteError::UnexpectedResponse {
            status,
            body: format!("invalid JSON ({err})"),
        })
    }
}

impl RemoteTree for GitLabClient {
    #[instrument(skip(self))]
    fn find(&self, parent: Option<u64>, segment: &str) -> Result<Option<ResourceRef>, RemoteError> {
        if let Some(id) = self.find_group(parent, segment)? {
            return Ok(Some(ResourceRef {
                id,
                kind: ResourceKind::Group,
            }));
        }
        Ok(self
            .find_project(parent, segment)?
            .map(|id| ResourceRef {
                id,
                kind: ResourceKind::Project,
            }))
    }

    #[instrument(skip(self))]
    fn create_group(
        &self,
        parent: Option<u64>,
        name: &str,
        segment: &str,
    ) -> Result<ResourceRef, RemoteError> {
        let mut body = json!({
            "name": name,
            "path": segment,
            "visibility": self.visibility.as_str(),
        });
        if let Some(id) = parent {
            body["parent_id"] = json!(id);
        }
        let created: CreatedRecord = self.post_json("/groups", &body)?;
        Ok(ResourceRef {
            id: created.id,
            kind: ResourceKind::Group,
        })
    }

    #[instrument(skip(self))]
    fn create_project(
        &self,
        parent: Option<u64>,
        name: &str,
        segment: &str,
    ) -> Result<ResourceRef, RemoteError> {
        let mut body = json!({
            "name": name,
            "path": segment,
            "visibility": self.visibility.as_str(),
        });
        if let Some(id) = parent {
            body["namespace_id"] = json!(id);
        }
        let created: CreatedRecord = self.post_json("/projects", &body)?;
        Ok(ResourceRef {
            id: created.id,
            kind: ResourceKind::Project,
        })
    }
}

/// Map a non-2xx status to the matching [`RemoteError`].
fn check_status(status: u16, body: &str) -> Result<(), RemoteError> {
    if (200..300).contains(&status) {
        return Ok(());
    }
    let body = truncate(body);
    match status {
        401 | 403 => Err(RemoteError::Auth { status, body }),
        400 if body.contains(ALREADY_TAKEN) => Err(RemoteError::AlreadyExists(body)),
        _ => Err(RemoteError::UnexpectedResponse { status, body }),
    }
}

fn truncate(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

fn log_rate_limit(headers: &HeaderMap) {
    let remaining = headers
        .get("RateLimit-Remaining")
        .or_else(|| headers.get("X-RateLimit-Remaining"))
        .and_then(|v| v.to_str().ok());
    if let Some(remaining) = remaining {
        debug!(remaining, "GitLab rate limit");
    }
}
