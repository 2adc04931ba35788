//! Toolkit configuration, read from `forgeops.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::io::gitlab::Visibility;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "forgeops.toml";

/// Toolkit configuration (TOML).
///
/// Every field has a default, so an absent file or a partial file is valid.
/// Command-line flags take precedence over values loaded here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ForgeConfig {
    pub gitlab: GitLabConfig,
    pub github: GitHubConfig,
    pub http: HttpConfig,
    pub throttle: ThrottleConfig,
    pub clone: CloneConfig,
    pub secrets: SecretsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GitLabConfig {
    /// Instance base URL, without `/api/v4`.
    pub url: String,
    /// Environment variable holding the access token.
    pub token_env: String,
    pub visibility: Visibility,
    /// Page size for list and search requests.
    pub per_page: u32,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            url: "https://gitlab.com".to_string(),
            token_env: "GITLAB_TOKEN".to_string(),
            visibility: Visibility::Private,
            per_page: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GitHubConfig {
    pub api_url: String,
    pub token_env: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            token_env: "GITHUB_TOKEN".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Minimum spacing between consecutive GitLab calls while reconciling.
    pub min_interval_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 500,
        }
    }
}

impl ThrottleConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CloneConfig {
    /// Manifest of `<ssh_url> <path_with_namespace>` lines.
    pub manifest: PathBuf,
    /// Directory the namespace tree is cloned into.
    pub dest: PathBuf,
    /// Per-repository `git clone` timeout.
    pub timeout_secs: u64,
}

impl Default for CloneConfig {
    fn default() -> Self {
        Self {
            manifest: PathBuf::from("repos.txt"),
            dest: PathBuf::from("."),
            timeout_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SecretsConfig {
    /// Secret names prompted for, in order.
    pub names: Vec<String>,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            names: ["PRIVATE_KEY", "SERVER_ADDRESS", "SERVER_USERNAME", "SERVER_PATH"]
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }
}

impl ForgeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.gitlab.url.trim().is_empty() {
            return Err(anyhow!("gitlab.url must not be empty"));
        }
        if self.gitlab.per_page == 0 || self.gitlab.per_page > 100 {
            return Err(anyhow!("gitlab.per_page must be between 1 and 100"));
        }
        if self.github.api_url.trim().is_empty() {
            return Err(anyhow!("github.api_url must not be empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(anyhow!("http.timeout_secs must be > 0"));
        }
        if self.clone.timeout_secs == 0 {
            return Err(anyhow!("clone.timeout_secs must be > 0"));
        }
        if self.secrets.names.is_empty() || self.secrets.names.iter().any(|n| n.trim().is_empty())
        {
            return Err(anyhow!("secrets.names must be a non-empty list of names"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ForgeConfig::default()`.
pub fn load_config(path: &Path) -> Result<ForgeConfig> {
    if !path.exists() {
        return Ok(ForgeConfig::default());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ForgeConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Pick the token from the flag, falling back to the named environment variable.
pub fn resolve_token(flag: Option<&str>, env_var: &str) -> Result<String> {
    if let Some(token) = flag.filter(|t| !t.trim().is_empty()) {
        return Ok(token.to_string());
    }
    match std::env::var(env_var) {
        Ok(token) if !token.trim().is_empty() => Ok(token),
        _ => Err(anyhow!("no access token: pass --token or set {env_var}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, ForgeConfig::default());
        cfg.validate().expect("default config is valid");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("forgeops.toml");
        fs::write(
            &path,
            "[gitlab]\nurl = \"https://git.example.org\"\nvisibility = \"internal\"\n\n[throttle]\nmin_interval_ms = 0\n",
        )
        .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.gitlab.url, "https://git.example.org");
        assert_eq!(cfg.gitlab.visibility, Visibility::Internal);
        assert_eq!(cfg.gitlab.token_env, "GITLAB_TOKEN");
        assert_eq!(cfg.throttle.min_interval(), Duration::ZERO);
        assert_eq!(cfg.clone, CloneConfig::default());
    }

    #[test]
    fn rejects_empty_secret_names() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("forgeops.toml");
        fs::write(&path, "[secrets]\nnames = []\n").expect("write");
        let err = load_config(&path).expect_err("should fail");
        assert!(format!("{err:#}").contains("secrets.names"));
    }

    #[test]
    fn rejects_oversized_page() {
        let mut cfg = ForgeConfig::default();
        cfg.gitlab.per_page = 500;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn flag_token_wins_over_environment() {
        let token = resolve_token(Some("glpat-flag"), "FORGEOPS_TEST_UNSET_VAR").expect("token");
        assert_eq!(token, "glpat-flag");
    }

    #[test]
    fn missing_token_names_the_variable() {
        let err = resolve_token(None, "FORGEOPS_TEST_UNSET_VAR").expect_err("should fail");
        assert!(err.to_string().contains("FORGEOPS_TEST_UNSET_VAR"));
    }
}
