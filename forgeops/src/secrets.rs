//! Orchestration for `forgeops init-secrets`.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use anyhow::{Context, Result, bail};
use tracing::{info, instrument, warn};

use crate::exit_codes;
use crate::io::github::{GitHubClient, RepoPublicKey, RepoSlug};
use crate::io::prompt::SecretSource;
use crate::io::seal::seal_secret;

/// Secrets stored and failed in one run, in name order of the request.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SecretsSummary {
    pub stored: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl SecretsSummary {
    pub fn exit_code(&self) -> i32 {
        if self.failed.is_empty() {
            exit_codes::OK
        } else {
            exit_codes::PARTIAL_FAILURE
        }
    }

    pub fn render(&self, slug: &RepoSlug) -> String {
        let mut out = String::new();
        for name in &self.stored {
            let _ = writeln!(out, "stored: {name}");
        }
        for (name, err) in &self.failed {
            let _ = writeln!(out, "failed: {name}: {err}");
        }
        let _ = writeln!(
            out,
            "secrets: stored={} failed={}",
            self.stored.len(),
            self.failed.len()
        );
        let _ = writeln!(out, "review at {}", settings_url(slug));
        out
    }
}

/// Web page listing the repository's Actions secrets.
pub fn settings_url(slug: &RepoSlug) -> String {
    format!(
        "https://github.com/{}/{}/settings/secrets/actions",
        slug.owner, slug.repo
    )
}

/// Gather one value per name, taking `preset` values first and asking
/// `source` for the rest.
///
/// Every name is asked before validating, so the error lists all empty
/// values at once.
pub fn collect_values<S: SecretSource + ?Sized>(
    names: &[String],
    preset: &BTreeMap<String, String>,
    source: &mut S,
) -> Result<Vec<(String, String)>> {
    let mut values = Vec::with_capacity(names.len());
    for name in names {
        let value = match preset.get(name) {
            Some(value) => value.clone(),
            None => source.read(name)?,
        };
        values.push((name.clone(), value));
    }
    let empty: Vec<&str> = values
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name.as_str())
        .collect();
    if !empty.is_empty() {
        bail!("empty value for {}", empty.join(", "));
    }
    Ok(values)
}

/// Check the token can see the repository, then fetch its sealing key.
#[instrument(skip(client))]
pub fn prepare(client: &GitHubClient, slug: &RepoSlug) -> Result<RepoPublicKey> {
    if !client.verify_access(slug)? {
        bail!("cannot access repository {slug}; check the token's repo scope");
    }
    let key = client
        .public_key(slug)
        .with_context(|| format!("fetch public key for {slug}"))?;
    info!(%slug, key_id = %key.key_id, "fetched repository public key");
    Ok(key)
}

/// Seal and store every value. A failed secret does not stop the others.
#[instrument(skip_all, fields(%slug, count = values.len()))]
pub fn provision(
    client: &GitHubClient,
    slug: &RepoSlug,
    key: &RepoPublicKey,
    values: &[(String, String)],
) -> SecretsSummary {
    let mut summary = SecretsSummary::default();
    for (name, value) in values {
        let stored = seal_secret(&key.key, value)
            .and_then(|sealed| client.put_secret(slug, name, &sealed, &key.key_id));
        match stored {
            Ok(()) => {
                info!(name = %name, "secret stored");
                summary.stored.push(name.clone());
            }
            Err(err) => {
                warn!(name = %name, err = %format!("{err:#}"), "secret failed");
                summary.failed.push((name.clone(), format!("{err:#}")));
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::time::Duration;

    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use crypto_box::SecretKey;
    use crypto_box::aead::OsRng;
    use mockito::{Matcher, Server};

    struct Scripted {
        answers: VecDeque<String>,
        asked: Vec<String>,
    }

    impl Scripted {
        fn new(answers: &[&str]) -> Self {
            Self {
                answers: answers.iter().map(|a| a.to_string()).collect(),
                asked: Vec::new(),
            }
        }
    }

    impl SecretSource for Scripted {
        fn read(&mut self, name: &str) -> Result<String> {
            self.asked.push(name.to_string());
            Ok(self.answers.pop_front().unwrap_or_default())
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|n| n.to_string()).collect()
    }

    fn slug() -> RepoSlug {
        RepoSlug {
            owner: "octo".to_string(),
            repo: "deploy".to_string(),
        }
    }

    #[test]
    fn preset_values_are_not_prompted() {
        let mut preset = BTreeMap::new();
        preset.insert("PRIVATE_KEY".to_string(), "-----BEGIN KEY-----\n".to_string());
        let mut source = Scripted::new(&["10.0.0.5"]);

        let values = collect_values(
            &names(&["PRIVATE_KEY", "SERVER_ADDRESS"]),
            &preset,
            &mut source,
        )
        .expect("collect");
        assert_eq!(source.asked, vec!["SERVER_ADDRESS"]);
        assert_eq!(values[0].0, "PRIVATE_KEY");
        assert_eq!(values[1], ("SERVER_ADDRESS".to_string(), "10.0.0.5".to_string()));
    }

    #[test]
    fn empty_values_are_all_reported() {
        let mut source = Scripted::new(&["", "deploy", "  "]);
        let err = collect_values(
            &names(&["SERVER_ADDRESS", "SERVER_USERNAME", "SERVER_PATH"]),
            &BTreeMap::new(),
            &mut source,
        )
        .expect_err("should fail");
        assert_eq!(err.to_string(), "empty value for SERVER_ADDRESS, SERVER_PATH");
        assert_eq!(source.asked.len(), 3);
    }

    #[test]
    fn provision_seals_each_value_and_isolates_failures() {
        let secret = SecretKey::generate(&mut OsRng);
        let key = RepoPublicKey {
            key_id: "k1".to_string(),
            key: STANDARD.encode(secret.public_key().as_bytes()),
        };
        let mut server = Server::new();
        let ok = server
            .mock("PUT", "/repos/octo/deploy/actions/secrets/SERVER_ADDRESS")
            .match_body(Matcher::PartialJsonString(r#"{"key_id": "k1"}"#.to_string()))
            .with_status(201)
            .create();
        let rejected = server
            .mock("PUT", "/repos/octo/deploy/actions/secrets/SERVER_PATH")
            .with_status(422)
            .create();
        let client = GitHubClient::new(&server.url(), "ghp_x", Duration::from_secs(5))
            .expect("client");

        let values = vec![
            ("SERVER_ADDRESS".to_string(), "10.0.0.5".to_string()),
            ("SERVER_PATH".to_string(), "/srv/app".to_string()),
        ];
        let summary = provision(&client, &slug(), &key, &values);

        ok.assert();
        rejected.assert();
        assert_eq!(summary.stored, vec!["SERVER_ADDRESS"]);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "SERVER_PATH");
        assert_eq!(summary.exit_code(), exit_codes::PARTIAL_FAILURE);
    }

    #[test]
    fn prepare_rejects_inaccessible_repository() {
        let mut server = Server::new();
        let _repo = server
            .mock("GET", "/repos/octo/deploy")
            .with_status(404)
            .create();
        let key = server
            .mock("GET", "/repos/octo/deploy/actions/secrets/public-key")
            .expect(0)
            .create();
        let client = GitHubClient::new(&server.url(), "ghp_x", Duration::from_secs(5))
            .expect("client");

        let err = prepare(&client, &slug()).expect_err("should fail");
        assert!(err.to_string().contains("cannot access repository octo/deploy"));
        key.assert();
    }

    #[test]
    fn render_ends_with_settings_url() {
        let summary = SecretsSummary {
            stored: names(&["PRIVATE_KEY"]),
            failed: Vec::new(),
        };
        let rendered = summary.render(&slug());
        assert!(rendered.starts_with("stored: PRIVATE_KEY\nsecrets: stored=1 failed=0\n"));
        assert!(rendered.ends_with(
            "review at https://github.com/octo/deploy/settings/secrets/actions\n"
        ));
    }
}
