//! Clone manifest: one `<ssh_url> <path_with_namespace>` pair per line.

use std::fs;
use std::path::{Component, Path};

use anyhow::{Context, Result, anyhow, bail};

use crate::io::gitlab::ProjectListing;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub ssh_url: String,
    pub path_with_namespace: String,
}

impl ManifestEntry {
    /// Keep only listings that carry both a clone URL and a namespace path.
    pub fn from_listing(listing: ProjectListing) -> Option<Self> {
        let ssh_url = listing.ssh_url_to_repo.filter(|s| !s.is_empty())?;
        let path_with_namespace = listing.path_with_namespace.filter(|s| !s.is_empty())?;
        Some(Self {
            ssh_url,
            path_with_namespace,
        })
    }

    /// Checkout location under `dest`, mirroring the namespace hierarchy.
    ///
    /// Rejects absolute paths and `..` so a listing cannot escape `dest`.
    pub fn target_under(&self, dest: &Path) -> Result<std::path::PathBuf> {
        let relative = Path::new(&self.path_with_namespace);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            bail!(
                "refusing unsafe namespace path '{}'",
                self.path_with_namespace
            );
        }
        Ok(dest.join(relative))
    }
}

pub fn write_manifest(path: &Path, entries: &[ManifestEntry]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let mut buf = String::new();
    for entry in entries {
        buf.push_str(&entry.ssh_url);
        buf.push(' ');
        buf.push_str(&entry.path_with_namespace);
        buf.push('\n');
    }
    fs::write(path, buf).with_context(|| format!("write manifest {}", path.display()))
}

pub fn read_manifest(path: &Path) -> Result<Vec<ManifestEntry>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read manifest {}", path.display()))?;
    let mut entries = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        match (fields.next(), fields.next(), fields.next()) {
            (Some(url), Some(namespace_path), None) => entries.push(ManifestEntry {
                ssh_url: url.to_string(),
                path_with_namespace: namespace_path.to_string(),
            }),
            _ => {
                return Err(anyhow!(
                    "{}:{}: expected '<ssh_url> <path_with_namespace>'",
                    path.display(),
                    idx + 1
                ));
            }
        }
    }
    Ok(entries)
}
