//! Orchestration for `forgeops clone-all`.
//!
//! Lists every project the credential is a member of, records them in a
//! manifest and clones each into `<dest>/<path_with_namespace>`, so the
//! local tree mirrors the platform's namespaces.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::exit_codes;
use crate::io::git::{Cloner, is_checkout};
use crate::io::gitlab::GitLabClient;
use crate::io::manifest::ManifestEntry;

/// Result of cloning a manifest.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CloneSummary {
    pub cloned: Vec<String>,
    /// Already present locally.
    pub skipped: Vec<String>,
    /// `(path_with_namespace, error)` pairs.
    pub failed: Vec<(String, String)>,
}

impl CloneSummary {
    pub fn exit_code(&self) -> i32 {
        if self.failed.is_empty() {
            exit_codes::OK
        } else {
            exit_codes::PARTIAL_FAILURE
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (path, err) in &self.failed {
            let _ = writeln!(out, "failed: {path}: {err}");
        }
        let _ = writeln!(
            out,
            "clone: cloned={} skipped={} failed={}",
            self.cloned.len(),
            self.skipped.len(),
            self.failed.len()
        );
        out
    }
}

/// Fetch the member project list as manifest entries.
#[instrument(skip_all)]
pub fn fetch_manifest(client: &GitLabClient) -> Result<Vec<ManifestEntry>> {
    let listings = client
        .list_projects()
        .context("list member projects")?;
    let total = listings.len();
    let entries: Vec<ManifestEntry> = listings
        .into_iter()
        .filter_map(ManifestEntry::from_listing)
        .collect();
    if entries.len() < total {
        warn!(
            dropped = total - entries.len(),
            "projects without ssh url or namespace path skipped"
        );
    }
    info!(count = entries.len(), "found repositories");
    Ok(entries)
}

/// Clone every entry under `dest`. One failure does not stop the rest.
#[instrument(skip_all, fields(dest = %dest.display(), count = entries.len()))]
pub fn clone_entries<C: Cloner + ?Sized>(
    entries: &[ManifestEntry],
    dest: &Path,
    cloner: &C,
) -> CloneSummary {
    let mut summary = CloneSummary::default();
    for entry in entries {
        let name = entry.path_with_namespace.clone();
        let target = match entry.target_under(dest) {
            Ok(target) => target,
            Err(err) => {
                warn!(path = %name, %err, "skipping unsafe path");
                summary.failed.push((name, format!("{err:#}")));
                continue;
            }
        };
        if is_checkout(&target) {
            info!(path = %name, "already cloned");
            summary.skipped.push(name);
            continue;
        }
        match cloner.clone_repo(&entry.ssh_url, &target) {
            Ok(()) => {
                info!(path = %name, "cloned");
                summary.cloned.push(name);
            }
            Err(err) => {
                warn!(path = %name, err = %format!("{err:#}"), "clone failed");
                summary.failed.push((name, format!("{err:#}")));
            }
        }
    }
    summary
}
