//! Automation for source-control hosting platforms.
//!
//! Three independent commands share this crate: creating a nested
//! group/project hierarchy on GitLab from an indented outline, cloning every
//! member project while preserving its namespace path, and provisioning
//! GitHub Actions deployment secrets. The layout keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (outline parsing, path
//!   resolution, outcome types). No I/O.
//! - **[`io`]**: Side-effecting adapters (HTTP clients, git, files, the
//!   terminal). Hidden behind traits where tests need fakes.
//!
//! Orchestration modules ([`reconcile`], [`hierarchy`], [`clone_all`],
//! [`secrets`]) coordinate core logic with I/O to implement CLI commands.

pub mod clone_all;
pub mod core;
pub mod exit_codes;
pub mod hierarchy;
pub mod io;
pub mod logging;
pub mod reconcile;
pub mod secrets;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
