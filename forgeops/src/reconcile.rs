//! Reconcile a parsed outline against the remote hierarchy.
//!
//! Nodes are visited in pre-order. A node is only looked up or created once
//! its parent has an id on the remote side; when a node fails, every node
//! below it is marked [`FailureReason::ParentUnavailable`] without any remote
//! call. Failures never stop sibling subtrees.

use tracing::{info, instrument, warn};

use crate::core::outline::{OutlineError, OutlineNode};
use crate::core::path::{child_path, path_segment, resolve_forest};
use crate::core::types::{
    FailureReason, NodeReport, Outcome, PlannedAction, ReconcileReport, ResourceKind, ResourceRef,
};
use crate::io::remote::{RemoteError, RemoteTree};
use crate::io::throttle::Throttle;

/// Drives find/create calls for every outline node.
pub struct Reconciler<'a, R: RemoteTree + ?Sized, T: Throttle> {
    remote: &'a R,
    throttle: T,
    root_parent: Option<u64>,
}

impl<'a, R: RemoteTree + ?Sized, T: Throttle> Reconciler<'a, R, T> {
    pub fn new(remote: &'a R, throttle: T) -> Self {
        Self {
            remote,
            throttle,
            root_parent: None,
        }
    }

    /// Anchor root-level nodes under an existing group.
    pub fn with_root_parent(mut self, parent: Option<u64>) -> Self {
        self.root_parent = parent;
        self
    }

    /// Ensure every node of `forest` exists remotely.
    ///
    /// Only an unusable node name is an error; remote failures are recorded
    /// per node in the returned report.
    #[instrument(skip_all, fields(root_parent = ?self.root_parent))]
    pub fn reconcile(&mut self, forest: &[OutlineNode]) -> Result<ReconcileReport, OutlineError> {
        resolve_forest(forest)?;
        let mut report = ReconcileReport::default();
        for root in forest {
            self.visit(root, self.root_parent, "", &mut report)?;
        }
        Ok(report)
    }

    fn visit(
        &mut self,
        node: &OutlineNode,
        parent: Option<u64>,
        prefix: &str,
        report: &mut ReconcileReport,
    ) -> Result<(), OutlineError> {
        let segment = segment_for(node)?;
        let full_path = child_path(prefix, &segment);
        let expected = ResourceKind::for_node(node.kind());

        let outcome = self.ensure(node, parent, &segment, expected);
        match &outcome {
            Outcome::Created { id } => info!(path = %full_path, id, "created {expected}"),
            Outcome::Reused { id } => info!(path = %full_path, id, "reused existing {expected}"),
            Outcome::Failed(reason) => warn!(path = %full_path, %reason, "failed to ensure {expected}"),
            Outcome::Planned(_) => {}
        }
        let remote_id = outcome.remote_id();
        report.nodes.push(NodeReport {
            full_path: full_path.clone(),
            name: node.name.clone(),
            kind: expected,
            outcome,
        });

        match remote_id {
            Some(id) => {
                for child in &node.children {
                    self.visit(child, Some(id), &full_path, report)?;
                }
            }
            None => mark_unavailable(&node.children, &full_path, report)?,
        }
        Ok(())
    }

    fn ensure(
        &mut self,
        node: &OutlineNode,
        parent: Option<u64>,
        segment: &str,
        expected: ResourceKind,
    ) -> Outcome {
        self.throttle.wait();
        match self.remote.find(parent, segment) {
            Ok(Some(found)) => existing_outcome(found, expected),
            Ok(None) => self.create(node, parent, segment, expected),
            Err(err) => Outcome::Failed(err.into_failure()),
        }
    }

    fn create(
        &mut self,
        node: &OutlineNode,
        parent: Option<u64>,
        segment: &str,
        expected: ResourceKind,
    ) -> Outcome {
        self.throttle.wait();
        let created = match expected {
            ResourceKind::Group => self.remote.create_group(parent, &node.name, segment),
            ResourceKind::Project => self.remote.create_project(parent, &node.name, segment),
        };
        match created {
            Ok(created) => Outcome::Created { id: created.id },
            Err(RemoteError::AlreadyExists(msg)) => {
                warn!(segment, %msg, "path already taken, looking it up again");
                self.throttle.wait();
                match self.remote.find(parent, segment) {
                    Ok(Some(found)) => existing_outcome(found, expected),
                    Ok(None) => Outcome::Failed(RemoteError::AlreadyExists(msg).into_failure()),
                    Err(err) => Outcome::Failed(err.into_failure()),
                }
            }
            Err(err) => Outcome::Failed(err.into_failure()),
        }
    }
}

/// Dry run: report what would be created, without any remote call.
///
/// Every node is assumed absent, so containers plan a group and leaves a
/// project.
#[instrument(skip_all)]
pub fn plan(forest: &[OutlineNode]) -> Result<ReconcileReport, OutlineError> {
    resolve_forest(forest)?;
    let mut report = ReconcileReport::default();
    plan_nodes(forest, "", &mut report)?;
    Ok(report)
}

fn plan_nodes(
    nodes: &[OutlineNode],
    prefix: &str,
    report: &mut ReconcileReport,
) -> Result<(), OutlineError> {
    for node in nodes {
        let full_path = child_path(prefix, &segment_for(node)?);
        let kind = ResourceKind::for_node(node.kind());
        let action = match kind {
            ResourceKind::Group => PlannedAction::CreateGroup,
            ResourceKind::Project => PlannedAction::CreateProject,
        };
        info!(path = %full_path, "{action}");
        report.nodes.push(NodeReport {
            full_path: full_path.clone(),
            name: node.name.clone(),
            kind,
            outcome: Outcome::Planned(action),
        });
        plan_nodes(&node.children, &full_path, report)?;
    }
    Ok(())
}

fn existing_outcome(found: ResourceRef, expected: ResourceKind) -> Outcome {
    if found.kind != expected {
        return Outcome::Failed(FailureReason::KindConflict {
            expected,
            found: found.kind,
        });
    }
    Outcome::Reused { id: found.id }
}

fn mark_unavailable(
    nodes: &[OutlineNode],
    prefix: &str,
    report: &mut ReconcileReport,
) -> Result<(), OutlineError> {
    for node in nodes {
        let full_path = child_path(prefix, &segment_for(node)?);
        report.nodes.push(NodeReport {
            full_path: full_path.clone(),
            name: node.name.clone(),
            kind: ResourceKind::for_node(node.kind()),
            outcome: Outcome::Failed(FailureReason::ParentUnavailable),
        });
        mark_unavailable(&node.children, &full_path, report)?;
    }
    Ok(())
}

fn segment_for(node: &OutlineNode) -> Result<String, OutlineError> {
    path_segment(&node.name).map_err(|_| OutlineError::EmptySegment {
        line: node.line,
        name: node.name.clone(),
    })
}
