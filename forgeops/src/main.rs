//! Hosting platform automation.
//!
//! Creates GitLab group/project hierarchies from an outline, mirrors every
//! member project locally, and provisions GitHub Actions deployment secrets.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use forgeops::clone_all::{clone_entries, fetch_manifest};
use forgeops::exit_codes;
use forgeops::hierarchy::{exit_code, load_outline, plan_hierarchy, render_report, run_hierarchy};
use forgeops::io::config::{DEFAULT_CONFIG_FILE, ForgeConfig, load_config, resolve_token};
use forgeops::io::git::GitCloner;
use forgeops::io::github::{GitHubClient, RepoSlug};
use forgeops::io::gitlab::{GitLabClient, Visibility};
use forgeops::io::manifest::{read_manifest, write_manifest};
use forgeops::io::prompt::TerminalPrompt;
use forgeops::io::throttle::IntervalGate;
use forgeops::logging;
use forgeops::secrets::{collect_values, prepare, provision};

const PRIVATE_KEY: &str = "PRIVATE_KEY";

#[derive(Parser)]
#[command(
    name = "forgeops",
    version,
    about = "Automation for source-control hosting platforms"
)]
struct Cli {
    /// Config file (defaults to ./forgeops.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the groups and projects of an indented outline on GitLab.
    CreateHierarchy {
        /// Outline file of `- name` items, two spaces per level.
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        gitlab_url: Option<String>,
        /// Access token (falls back to the `gitlab.token_env` variable).
        #[arg(long)]
        token: Option<String>,
        /// Existing group that root-level items are created under.
        #[arg(long)]
        parent_group_id: Option<u64>,
        /// Print what would be created without calling GitLab.
        #[arg(long)]
        dry_run: bool,
        #[arg(long, value_enum)]
        visibility: Option<Visibility>,
    },
    /// Clone every member project into a directory tree mirroring namespaces.
    CloneAll {
        #[arg(long)]
        gitlab_url: Option<String>,
        #[arg(long)]
        token: Option<String>,
        #[arg(long)]
        manifest: Option<PathBuf>,
        #[arg(long)]
        dest: Option<PathBuf>,
        /// Write the manifest and stop.
        #[arg(long, conflicts_with = "from_manifest")]
        manifest_only: bool,
        /// Clone from an existing manifest instead of listing projects.
        #[arg(long)]
        from_manifest: bool,
    },
    /// Store deployment secrets on a GitHub repository.
    InitSecrets {
        /// `https://github.com/owner/repo` or `git@github.com:owner/repo.git`.
        repo_url: String,
        #[arg(long)]
        token: Option<String>,
        /// Read PRIVATE_KEY from this file instead of prompting.
        #[arg(long)]
        private_key_file: Option<PathBuf>,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let cfg = config_for(cli.config.as_deref())?;
    match cli.command {
        Command::CreateHierarchy {
            file,
            gitlab_url,
            token,
            parent_group_id,
            dry_run,
            visibility,
        } => cmd_create_hierarchy(
            &cfg,
            &file,
            gitlab_url.as_deref(),
            token.as_deref(),
            parent_group_id,
            dry_run,
            visibility,
        ),
        Command::CloneAll {
            gitlab_url,
            token,
            manifest,
            dest,
            manifest_only,
            from_manifest,
        } => cmd_clone_all(
            &cfg,
            gitlab_url.as_deref(),
            token.as_deref(),
            manifest.as_deref(),
            dest.as_deref(),
            manifest_only,
            from_manifest,
        ),
        Command::InitSecrets {
            repo_url,
            token,
            private_key_file,
        } => cmd_init_secrets(&cfg, &repo_url, token.as_deref(), private_key_file.as_deref()),
    }
}

/// An explicit `--config` must exist; the default file is optional.
fn config_for(explicit: Option<&Path>) -> Result<ForgeConfig> {
    match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("config file {} not found", path.display());
            }
            load_config(path)
        }
        None => load_config(Path::new(DEFAULT_CONFIG_FILE)),
    }
}

fn gitlab_client(cfg: &ForgeConfig, url: Option<&str>, token: Option<&str>) -> Result<GitLabClient> {
    let token = resolve_token(token, &cfg.gitlab.token_env)?;
    let url = url.unwrap_or(&cfg.gitlab.url);
    Ok(GitLabClient::new(url, &token, cfg.http.timeout())?.with_per_page(cfg.gitlab.per_page))
}

fn cmd_create_hierarchy(
    cfg: &ForgeConfig,
    file: &Path,
    gitlab_url: Option<&str>,
    token: Option<&str>,
    parent_group_id: Option<u64>,
    dry_run: bool,
    visibility: Option<Visibility>,
) -> Result<i32> {
    let forest = load_outline(file)?;
    if dry_run {
        let report = plan_hierarchy(&forest)?;
        print!("{}", render_report(&report));
        return Ok(exit_code(&report));
    }

    let client = gitlab_client(cfg, gitlab_url, token)?
        .with_visibility(visibility.unwrap_or(cfg.gitlab.visibility));
    let user = client
        .current_user()
        .context("verify GitLab credential")?;
    info!(username = %user.username, "authenticated");

    let throttle = IntervalGate::new(cfg.throttle.min_interval());
    let report = run_hierarchy(&forest, &client, throttle, parent_group_id)?;
    print!("{}", render_report(&report));
    Ok(exit_code(&report))
}

fn cmd_clone_all(
    cfg: &ForgeConfig,
    gitlab_url: Option<&str>,
    token: Option<&str>,
    manifest: Option<&Path>,
    dest: Option<&Path>,
    manifest_only: bool,
    from_manifest: bool,
) -> Result<i32> {
    let manifest = manifest.unwrap_or(&cfg.clone.manifest);
    let dest = dest.unwrap_or(&cfg.clone.dest);

    let entries = if from_manifest {
        read_manifest(manifest)?
    } else {
        let client = gitlab_client(cfg, gitlab_url, token)?;
        let entries = fetch_manifest(&client)?;
        write_manifest(manifest, &entries)?;
        println!(
            "wrote {} repositories to {}",
            entries.len(),
            manifest.display()
        );
        entries
    };
    if manifest_only {
        return Ok(exit_codes::OK);
    }

    let cloner = GitCloner::new(Duration::from_secs(cfg.clone.timeout_secs));
    let summary = clone_entries(&entries, dest, &cloner);
    print!("{}", summary.render());
    Ok(summary.exit_code())
}

fn cmd_init_secrets(
    cfg: &ForgeConfig,
    repo_url: &str,
    token: Option<&str>,
    private_key_file: Option<&Path>,
) -> Result<i32> {
    let slug = RepoSlug::parse(repo_url)?;
    let mut preset = BTreeMap::new();
    if let Some(path) = private_key_file {
        if !cfg.secrets.names.iter().any(|n| n == PRIVATE_KEY) {
            warn!("--private-key-file given but PRIVATE_KEY is not a configured secret");
        }
        let key = fs::read_to_string(path)
            .with_context(|| format!("read private key {}", path.display()))?;
        preset.insert(PRIVATE_KEY.to_string(), key);
    }

    let token = resolve_token(token, &cfg.github.token_env)?;
    let client = GitHubClient::new(&cfg.github.api_url, &token, cfg.http.timeout())?;
    let key = prepare(&client, &slug)?;

    let values = collect_values(&cfg.secrets.names, &preset, &mut TerminalPrompt)?;
    let summary = provision(&client, &slug, &key, &values);
    print!("{}", summary.render(&slug));
    Ok(summary.exit_code())
}
