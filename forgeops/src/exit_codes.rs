//! Stable exit codes for forgeops commands.

/// Command succeeded, or a dry run planned every node.
pub const OK: i32 = 0;
/// Fatal error: invalid outline, config, arguments, failed credential check or I/O.
pub const INVALID: i32 = 1;
/// The run finished but at least one node, clone or secret failed.
pub const PARTIAL_FAILURE: i32 = 2;
