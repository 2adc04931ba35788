//! Shared types for hierarchy reconciliation.
//!
//! These describe remote resources and per-node outcomes. They carry no I/O
//! and are produced in traversal order, so reports are stable across runs.

use std::fmt;

use crate::core::outline::NodeKind;

/// Kind of resource on the hosting platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Group,
    Project,
}

impl ResourceKind {
    /// Resource kind an outline node maps to.
    pub fn for_node(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Container => ResourceKind::Group,
            NodeKind::Leaf => ResourceKind::Project,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Group => f.write_str("group"),
            ResourceKind::Project => f.write_str("project"),
        }
    }
}

/// Handle to an existing remote resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub id: u64,
    pub kind: ResourceKind,
}

/// Action a dry run would take for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannedAction {
    CreateGroup,
    CreateProject,
}

impl fmt::Display for PlannedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlannedAction::CreateGroup => f.write_str("would create group"),
            PlannedAction::CreateProject => f.write_str("would create project"),
        }
    }
}

/// Why a node could not be reconciled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Network or TLS failure talking to the platform.
    Transport(String),
    /// Credential rejected.
    Auth(String),
    /// The platform answered with a status or body we cannot use.
    UnexpectedResponse(String),
    /// A resource exists at the path with the other kind.
    KindConflict {
        expected: ResourceKind,
        found: ResourceKind,
    },
    /// An ancestor failed, so nothing was attempted for this node.
    ParentUnavailable,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Transport(msg) => write!(f, "transport error: {msg}"),
            FailureReason::Auth(msg) => write!(f, "authentication error: {msg}"),
            FailureReason::UnexpectedResponse(msg) => write!(f, "unexpected response: {msg}"),
            FailureReason::KindConflict { expected, found } => {
                write!(f, "kind conflict: expected {expected}, found existing {found}")
            }
            FailureReason::ParentUnavailable => f.write_str("parent unavailable"),
        }
    }
}

/// Terminal state of a node after one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Created { id: u64 },
    Reused { id: u64 },
    Planned(PlannedAction),
    Failed(FailureReason),
}

impl Outcome {
    /// Remote id children should be created under, if any.
    pub fn remote_id(&self) -> Option<u64> {
        match self {
            Outcome::Created { id } | Outcome::Reused { id } => Some(*id),
            Outcome::Planned(_) | Outcome::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Created { id } => write!(f, "created (id {id})"),
            Outcome::Reused { id } => write!(f, "reused (id {id})"),
            Outcome::Planned(action) => write!(f, "planned: {action}"),
            Outcome::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Outcome for one outline node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeReport {
    /// Segment path from the outline root, e.g. `narbit/commons`.
    pub full_path: String,
    pub name: String,
    pub kind: ResourceKind,
    pub outcome: Outcome,
}

/// Per-outcome tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub created: usize,
    pub reused: usize,
    pub planned: usize,
    pub failed: usize,
}

/// Outcomes of one reconcile run, in pre-order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub nodes: Vec<NodeReport>,
}

impl ReconcileReport {
    pub fn counts(&self) -> OutcomeCounts {
        let mut counts = OutcomeCounts::default();
        for node in &self.nodes {
            match node.outcome {
                Outcome::Created { .. } => counts.created += 1,
                Outcome::Reused { .. } => counts.reused += 1,
                Outcome::Planned(_) => counts.planned += 1,
                Outcome::Failed(_) => counts.failed += 1,
            }
        }
        counts
    }

    pub fn has_failures(&self) -> bool {
        self.nodes.iter().any(|node| node.outcome.is_failed())
    }

    /// Look up a node report by its full path.
    pub fn get(&self, full_path: &str) -> Option<&NodeReport> {
        self.nodes.iter().find(|node| node.full_path == full_path)
    }
}
