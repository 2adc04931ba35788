//! Remote hierarchy abstraction.
//!
//! The [`RemoteTree`] trait decouples reconciliation from the hosting
//! platform's REST API. Tests use an in-memory fake that records calls.

use thiserror::Error;

use crate::core::types::{FailureReason, ResourceRef};

/// Errors surfaced by a [`RemoteTree`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("authentication rejected (HTTP {status}): {body}")]
    Auth { status: u16, body: String },

    #[error("unexpected response (HTTP {status}): {body}")]
    UnexpectedResponse { status: u16, body: String },

    /// Create was refused because the path is already taken.
    #[error("path already taken: {0}")]
    AlreadyExists(String),
}

impl RemoteError {
    /// Map into the per-node failure recorded in the report.
    pub fn into_failure(self) -> FailureReason {
        match self {
            RemoteError::Transport(msg) => FailureReason::Transport(msg),
            RemoteError::Auth { status, body } => {
                FailureReason::Auth(format!("HTTP {status}: {body}"))
            }
            RemoteError::UnexpectedResponse { status, body } => {
                FailureReason::UnexpectedResponse(format!("HTTP {status}: {body}"))
            }
            RemoteError::AlreadyExists(msg) => {
                FailureReason::UnexpectedResponse(format!("path already taken: {msg}"))
            }
        }
    }
}

/// Tree-shaped remote resource store.
///
/// `parent` is `None` for resources at the top of the platform (or of the
/// user's namespace).
pub trait RemoteTree {
    /// Find a direct child of `parent` whose path equals `segment`.
    fn find(&self, parent: Option<u64>, segment: &str) -> Result<Option<ResourceRef>, RemoteError>;

    /// Create a group under `parent`.
    fn create_group(
        &self,
        parent: Option<u64>,
        name: &str,
        segment: &str,
    ) -> Result<ResourceRef, RemoteError>;

    /// Create a project under `parent`.
    fn create_project(
        &self,
        parent: Option<u64>,
        name: &str,
        segment: &str,
    ) -> Result<ResourceRef, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_error_maps_to_auth_failure() {
        let err = RemoteError::Auth {
            status: 401,
            body: "401 Unauthorized".to_string(),
        };
        assert_eq!(
            err.into_failure(),
            FailureReason::Auth("HTTP 401: 401 Unauthorized".to_string())
        );
    }

    #[test]
    fn transport_error_keeps_message() {
        let err = RemoteError::Transport("connection refused".to_string());
        assert_eq!(
            err.into_failure(),
            FailureReason::Transport("connection refused".to_string())
        );
    }
}
