//! URL-safe path segments and ancestry paths for outline nodes.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::core::outline::{OutlineError, OutlineNode};

/// Separator between segments of a full path.
pub const PATH_SEPARATOR: &str = "/";

static NON_SLUG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("'{name}' does not yield a usable path segment")]
    EmptySegment { name: String },
}

/// Derive the path segment for a human-readable name.
///
/// Lowercases, collapses every run of characters outside `[a-z0-9]` into one
/// hyphen and strips hyphens from both ends.
pub fn path_segment(name: &str) -> Result<String, PathError> {
    let lowered = name.to_lowercase();
    let replaced = NON_SLUG_RE.replace_all(&lowered, "-");
    let segment = replaced.trim_matches('-');
    if segment.is_empty() {
        return Err(PathError::EmptySegment {
            name: name.to_string(),
        });
    }
    Ok(segment.to_string())
}

/// Extend a parent path by one segment.
pub fn child_path(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{parent}{PATH_SEPARATOR}{segment}")
    }
}

/// Resolve every node of the forest, failing on the first unusable name.
///
/// Run before any remote call so an invalid outline is rejected as a whole.
pub fn resolve_forest(forest: &[OutlineNode]) -> Result<(), OutlineError> {
    for node in forest {
        path_segment(&node.name).map_err(|_| OutlineError::EmptySegment {
            line: node.line,
            name: node.name.clone(),
        })?;
        resolve_forest(&node.children)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::outline::parse_outline;

    #[test]
    fn collapses_punctuation_runs() {
        assert_eq!(path_segment("Price & Billing!!").unwrap(), "price-billing");
    }

    #[test]
    fn canonical_segment_is_unchanged() {
        assert_eq!(
            path_segment("narbit-price-lib").unwrap(),
            "narbit-price-lib"
        );
    }

    #[test]
    fn resolving_twice_is_idempotent() {
        let once = path_segment("  My_Service v2 ").unwrap();
        assert_eq!(once, "my-service-v2");
        assert_eq!(path_segment(&once).unwrap(), once);
    }

    #[test]
    fn punctuation_only_name_is_rejected() {
        assert_eq!(
            path_segment("!!! ---").unwrap_err(),
            PathError::EmptySegment {
                name: "!!! ---".to_string()
            }
        );
    }

    #[test]
    fn child_path_extends_root_first() {
        assert_eq!(child_path("", "narbit"), "narbit");
        assert_eq!(child_path("narbit", "commons"), "narbit/commons");
        assert_eq!(
            child_path("narbit/commons", "narbit-commons-lib"),
            "narbit/commons/narbit-commons-lib"
        );
    }

    #[test]
    fn resolve_forest_reports_line_of_bad_name() {
        let forest = parse_outline("- ok\n  - ???\n").expect("parse");
        assert_eq!(
            resolve_forest(&forest).unwrap_err(),
            OutlineError::EmptySegment {
                line: 2,
                name: "???".to_string()
            }
        );
    }
}
