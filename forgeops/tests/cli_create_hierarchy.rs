//! CLI tests for `forgeops create-hierarchy`.
//!
//! Spawns the forgeops binary and verifies exit codes and the printed
//! report for dry runs, invalid input and a run against a mock GitLab.

use std::fs;
use std::process::Command;

use mockito::{Matcher, Server};

use forgeops::exit_codes;
use forgeops::test_support::TempOutline;

fn forgeops_cmd(dir: &std::path::Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_forgeops"));
    cmd.current_dir(dir)
        .env_remove("GITLAB_TOKEN")
        .env("RUST_LOG", "off");
    cmd
}

#[test]
fn dry_run_prints_plan_without_token() {
    let temp = tempfile::tempdir().expect("tempdir");
    let outline = TempOutline::new("- narbit\n  - commons\n    - narbit-commons-lib\n")
        .expect("outline");

    let output = forgeops_cmd(temp.path())
        .arg("create-hierarchy")
        .arg("--file")
        .arg(outline.path())
        .arg("--dry-run")
        .output()
        .expect("forgeops create-hierarchy");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("narbit [group] planned: would create group"));
    assert!(stdout.contains(
        "narbit/commons/narbit-commons-lib [project] planned: would create project"
    ));
    assert!(stdout.contains("summary: created=0 reused=0 planned=3 failed=0"));
}

#[test]
fn malformed_outline_exits_invalid_with_line_number() {
    let temp = tempfile::tempdir().expect("tempdir");
    let outline = TempOutline::new("- narbit\n   - commons\n").expect("outline");

    let output = forgeops_cmd(temp.path())
        .arg("create-hierarchy")
        .arg("--file")
        .arg(outline.path())
        .arg("--dry-run")
        .output()
        .expect("forgeops create-hierarchy");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("line 2: malformed indentation"), "{stderr}");
    assert!(output.stdout.is_empty());
}

#[test]
fn missing_token_exits_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");
    let outline = TempOutline::new("- narbit\n").expect("outline");

    let output = forgeops_cmd(temp.path())
        .arg("create-hierarchy")
        .arg("--file")
        .arg(outline.path())
        .output()
        .expect("forgeops create-hierarchy");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("GITLAB_TOKEN"));
}

#[test]
fn creates_missing_nodes_under_parent_group() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(
        temp.path().join("forgeops.toml"),
        "[throttle]\nmin_interval_ms = 0\n",
    )
    .expect("write config");
    let outline = TempOutline::new("- Narbit\n  - Price Service\n").expect("outline");

    let mut server = Server::new();
    let _user = server
        .mock("GET", "/api/v4/user")
        .with_status(200)
        .with_body(r#"{"id": 1, "username": "ops"}"#)
        .create();
    let _lookups = server
        .mock("GET", Matcher::Regex(r"^/api/v4/groups/\d+/(subgroups|projects)".to_string()))
        .with_status(200)
        .with_body("[]")
        .expect(4)
        .create();
    let group = server
        .mock("POST", "/api/v4/groups")
        .match_body(Matcher::PartialJsonString(
            r#"{"name": "Narbit", "path": "narbit", "parent_id": 7, "visibility": "private"}"#
                .to_string(),
        ))
        .with_status(201)
        .with_body(r#"{"id": 20}"#)
        .create();
    let project = server
        .mock("POST", "/api/v4/projects")
        .match_body(Matcher::PartialJsonString(
            r#"{"name": "Price Service", "path": "price-service", "namespace_id": 20}"#
                .to_string(),
        ))
        .with_status(201)
        .with_body(r#"{"id": 21}"#)
        .create();

    let output = forgeops_cmd(temp.path())
        .arg("create-hierarchy")
        .arg("--file")
        .arg(outline.path())
        .args(["--gitlab-url", &server.url(), "--token", "glpat-test"])
        .args(["--parent-group-id", "7"])
        .output()
        .expect("forgeops create-hierarchy");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(exit_codes::OK), "{stdout}");
    group.assert();
    project.assert();
    assert!(stdout.contains("narbit [group] created (id 20)"));
    assert!(stdout.contains("narbit/price-service [project] created (id 21)"));
}

#[test]
fn rejected_credential_exits_before_any_lookup() {
    let temp = tempfile::tempdir().expect("tempdir");
    let outline = TempOutline::new("- narbit\n").expect("outline");

    let mut server = Server::new();
    let _user = server
        .mock("GET", "/api/v4/user")
        .with_status(401)
        .with_body(r#"{"message": "401 Unauthorized"}"#)
        .create();
    let lookups = server
        .mock("GET", Matcher::Regex(r"^/api/v4/groups".to_string()))
        .expect(0)
        .create();

    let output = forgeops_cmd(temp.path())
        .arg("create-hierarchy")
        .arg("--file")
        .arg(outline.path())
        .args(["--gitlab-url", &server.url(), "--token", "bad"])
        .output()
        .expect("forgeops create-hierarchy");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("verify GitLab credential"));
    lookups.assert();
}
