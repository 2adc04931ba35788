//! Indented outline parsing.
//!
//! An outline is a markdown-style bullet list where every two leading
//! whitespace characters open one nesting level:
//!
//! ```text
//! - narbit
//!   - commons
//!     - narbit-commons-lib
//! ```
//!
//! Lines that are not bullet items (headings, code fences, prose) and blank
//! lines are ignored. The result is a forest: the outline may declare several
//! root-level items.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Number of leading whitespace characters per nesting level.
pub const INDENT_UNIT: usize = 2;

static ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)-\s+(.+)$").expect("valid outline item regex"));

/// Parse-time failures. Any of these aborts the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutlineError {
    /// Indentation is not a multiple of [`INDENT_UNIT`] or skips a level.
    #[error("line {line}: malformed indentation ({indent} leading whitespace characters)")]
    MalformedIndentation { line: usize, indent: usize },

    /// A nested item appears before any item it could belong to.
    #[error("line {line}: '{name}' is indented but has no parent item")]
    OrphanNode { line: usize, name: String },

    /// The item name has no characters usable in a URL path.
    #[error("line {line}: '{name}' does not yield a usable path segment")]
    EmptySegment { line: usize, name: String },
}

/// Whether a node may hold children on the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Has at least one child; maps to a group.
    Container,
    /// Has no children; maps to a project.
    Leaf,
}

/// One bullet item of the outline together with its nested items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineNode {
    /// Label as written, trimmed.
    pub name: String,
    /// Nesting level, roots are 0.
    pub depth: usize,
    /// 1-based source line, kept for error reporting.
    pub line: usize,
    /// Nested items in outline order.
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    pub fn new(name: impl Into<String>, depth: usize, line: usize) -> Self {
        Self {
            name: name.into(),
            depth,
            line,
            children: Vec::new(),
        }
    }

    /// Kind is derived from structure on every call, never stored.
    pub fn kind(&self) -> NodeKind {
        if self.children.is_empty() {
            NodeKind::Leaf
        } else {
            NodeKind::Container
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(OutlineNode::subtree_len)
            .sum::<usize>()
    }
}

/// Total node count across a forest.
pub fn forest_len(forest: &[OutlineNode]) -> usize {
    forest.iter().map(OutlineNode::subtree_len).sum()
}

/// Parse outline text into a forest.
///
/// The builder keeps a stack holding the currently open path (`stack[d]` is
/// the most recent node at depth `d`). A new item at depth `d` closes every
/// open node at depth `>= d`, attaching each closed node to the node below it
/// (or to the forest when the stack empties), then opens itself.
pub fn parse_outline(text: &str) -> Result<Vec<OutlineNode>, OutlineError> {
    let mut forest = Vec::new();
    let mut stack: Vec<OutlineNode> = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        if raw.trim().is_empty() {
            continue;
        }
        let Some(caps) = ITEM_RE.captures(raw) else {
            continue;
        };
        let indent = caps[1].chars().count();
        let name = caps[2].trim().to_string();

        if indent % INDENT_UNIT != 0 {
            return Err(OutlineError::MalformedIndentation { line, indent });
        }
        let depth = indent / INDENT_UNIT;

        if depth > stack.len() {
            if stack.is_empty() {
                return Err(OutlineError::OrphanNode { line, name });
            }
            return Err(OutlineError::MalformedIndentation { line, indent });
        }

        close_to_depth(&mut stack, &mut forest, depth);
        stack.push(OutlineNode::new(name, depth, line));
    }

    close_to_depth(&mut stack, &mut forest, 0);
    Ok(forest)
}

fn close_to_depth(stack: &mut Vec<OutlineNode>, forest: &mut Vec<OutlineNode>, depth: usize) {
    while stack.len() > depth {
        let Some(done) = stack.pop() else {
            break;
        };
        match stack.last_mut() {
            Some(parent) => parent.children.push(done),
            None => forest.push(done),
        }
    }
}
