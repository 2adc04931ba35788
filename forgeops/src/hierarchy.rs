//! Orchestration for `forgeops create-hierarchy`.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::info;

use crate::core::outline::{OutlineNode, forest_len, parse_outline};
use crate::core::path::resolve_forest;
use crate::core::types::ReconcileReport;
use crate::exit_codes;
use crate::io::remote::RemoteTree;
use crate::io::throttle::Throttle;
use crate::reconcile::{Reconciler, plan};

/// Read and validate an outline file.
///
/// Every node name is resolved here, so any outline error surfaces before a
/// single remote call is made.
pub fn load_outline(path: &Path) -> Result<Vec<OutlineNode>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read outline {}", path.display()))?;
    let forest =
        parse_outline(&text).with_context(|| format!("parse outline {}", path.display()))?;
    resolve_forest(&forest).with_context(|| format!("parse outline {}", path.display()))?;
    if forest.is_empty() {
        bail!("no outline items found in {}", path.display());
    }
    info!(
        roots = forest.len(),
        nodes = forest_len(&forest),
        "parsed outline"
    );
    Ok(forest)
}

/// Ensure the outline exists under `root_parent`, or only plan it on a dry run.
pub fn run_hierarchy<R: RemoteTree + ?Sized, T: Throttle>(
    forest: &[OutlineNode],
    remote: &R,
    throttle: T,
    root_parent: Option<u64>,
) -> Result<ReconcileReport> {
    let report = Reconciler::new(remote, throttle)
        .with_root_parent(root_parent)
        .reconcile(forest)?;
    Ok(report)
}

pub fn plan_hierarchy(forest: &[OutlineNode]) -> Result<ReconcileReport> {
    Ok(plan(forest)?)
}

/// Human-readable per-node summary followed by totals.
pub fn render_report(report: &ReconcileReport) -> String {
    let mut out = String::new();
    for node in &report.nodes {
        let _ = writeln!(out, "{} [{}] {}", node.full_path, node.kind, node.outcome);
    }
    let counts = report.counts();
    let _ = writeln!(
        out,
        "summary: created={} reused={} planned={} failed={}",
        counts.created, counts.reused, counts.planned, counts.failed
    );
    out
}

/// Exit code for a finished run.
pub fn exit_code(report: &ReconcileReport) -> i32 {
    if report.has_failures() {
        exit_codes::PARTIAL_FAILURE
    } else {
        exit_codes::OK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::outline::OutlineError;
    use crate::io::throttle::Unthrottled;
    use crate::test_support::{FakeRemote, TempOutline};

    #[test]
    fn load_outline_rejects_bad_indent_with_line() {
        let file = TempOutline::new("- a\n   - b\n").expect("outline");
        let err = load_outline(file.path()).expect_err("should fail");
        assert_eq!(
            err.downcast_ref::<OutlineError>(),
            Some(&OutlineError::MalformedIndentation { line: 2, indent: 3 })
        );
    }

    #[test]
    fn load_outline_rejects_empty_file() {
        let file = TempOutline::new("# nothing here\n").expect("outline");
        let err = load_outline(file.path()).expect_err("should fail");
        assert!(err.to_string().contains("no outline items"));
    }

    #[test]
    fn report_lists_every_node_then_totals() {
        let file = TempOutline::new("- narbit\n  - commons\n    - narbit-commons-lib\n")
            .expect("outline");
        let forest = load_outline(file.path()).expect("load");
        let remote = FakeRemote::new();
        let report = run_hierarchy(&forest, &remote, Unthrottled, None).expect("run");

        let rendered = render_report(&report);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("narbit [group] created"));
        assert!(lines[1].starts_with("narbit/commons [group] created"));
        assert!(lines[2].starts_with("narbit/commons/narbit-commons-lib [project] created"));
        assert_eq!(lines[3], "summary: created=3 reused=0 planned=0 failed=0");
        assert_eq!(exit_code(&report), exit_codes::OK);
    }

    #[test]
    fn dry_run_report_uses_planned_actions() {
        let file = TempOutline::new("- narbit\n  - lib\n").expect("outline");
        let forest = load_outline(file.path()).expect("load");
        let rendered = render_report(&plan_hierarchy(&forest).expect("plan"));
        assert!(rendered.contains("narbit [group] planned: would create group"));
        assert!(rendered.contains("narbit/lib [project] planned: would create project"));
        assert!(rendered.contains("planned=2"));
    }
}
