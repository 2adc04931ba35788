//! Git adapter for bulk cloning.
//!
//! Cloning goes through the `git` binary so the user's SSH agent and
//! `~/.ssh/config` apply unchanged.

use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument};

use crate::io::process::run_with_timeout;

const GIT_OUTPUT_LIMIT: usize = 64 * 1024;

/// Anything that can materialise a repository at a local path.
pub trait Cloner {
    fn clone_repo(&self, url: &str, target: &Path) -> Result<()>;
}

/// `git clone` subprocess with a per-repository timeout.
#[derive(Debug, Clone)]
pub struct GitCloner {
    timeout: Duration,
}

impl GitCloner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Cloner for GitCloner {
    #[instrument(skip(self), fields(target = %target.display()))]
    fn clone_repo(&self, url: &str, target: &Path) -> Result<()> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        let mut cmd = Command::new("git");
        cmd.arg("clone").arg("--quiet").arg(url).arg(target);
        // Never block on an interactive credential prompt.
        cmd.env("GIT_TERMINAL_PROMPT", "0");

        let output = run_with_timeout(cmd, self.timeout, GIT_OUTPUT_LIMIT)
            .with_context(|| format!("spawn git clone {url}"))?;
        if output.timed_out {
            return Err(anyhow!(
                "git clone {url} timed out after {}s",
                self.timeout.as_secs()
            ));
        }
        if !output.success() {
            return Err(anyhow!(
                "git clone {url} failed: {}",
                output.stderr_lossy()
            ));
        }
        debug!(url, "cloned");
        Ok(())
    }
}

/// True if `path` already holds a git checkout.
pub fn is_checkout(path: &Path) -> bool {
    path.join(".git").exists()
}
