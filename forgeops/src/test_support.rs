//! Test-only helpers: an in-memory remote hierarchy and scratch outlines.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::outline::{OutlineNode, parse_outline};
use crate::core::types::{ResourceKind, ResourceRef};
use crate::io::remote::{RemoteError, RemoteTree};
use crate::io::throttle::Throttle;

/// Parse an outline, panicking on invalid input.
pub fn outline(text: &str) -> Vec<OutlineNode> {
    parse_outline(text).expect("valid outline")
}

/// Remote call as seen by [`FakeRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Find {
        parent: Option<u64>,
        segment: String,
    },
    CreateGroup {
        parent: Option<u64>,
        segment: String,
    },
    CreateProject {
        parent: Option<u64>,
        segment: String,
    },
}

impl RemoteCall {
    pub fn segment(&self) -> &str {
        match self {
            RemoteCall::Find { segment, .. }
            | RemoteCall::CreateGroup { segment, .. }
            | RemoteCall::CreateProject { segment, .. } => segment,
        }
    }

    pub fn is_create(&self) -> bool {
        !matches!(self, RemoteCall::Find { .. })
    }
}

/// Which operation an injected failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Find,
    Create,
}

#[derive(Debug, Clone)]
struct FakeResource {
    id: u64,
    parent: Option<u64>,
    segment: String,
    name: String,
    kind: ResourceKind,
}

/// In-memory [`RemoteTree`] that records every call.
///
/// Creating a path that already exists under the same parent answers
/// [`RemoteError::AlreadyExists`], like the real platform.
#[derive(Debug, Default)]
pub struct FakeRemote {
    resources: RefCell<Vec<FakeResource>>,
    calls: RefCell<Vec<RemoteCall>>,
    failures: RefCell<HashMap<(CallKind, String), RemoteError>>,
    hidden_once: RefCell<HashSet<String>>,
    next_id: Cell<u64>,
}

impl FakeRemote {
    pub fn new() -> Self {
        let remote = Self::default();
        remote.next_id.set(100);
        remote
    }

    /// Seed an existing resource and return its id.
    pub fn seed(&self, parent: Option<u64>, segment: &str, kind: ResourceKind) -> u64 {
        self.insert(parent, segment, segment, kind)
    }

    /// Make every `kind` call for `segment` fail with `err`.
    pub fn fail_on(&self, kind: CallKind, segment: &str, err: RemoteError) {
        self.failures
            .borrow_mut()
            .insert((kind, segment.to_string()), err);
    }

    /// Drop every injected failure, as if the platform recovered.
    pub fn clear_failures(&self) {
        self.failures.borrow_mut().clear();
    }

    /// Hide `segment` from the next `find` only.
    pub fn hide_once(&self, segment: &str) {
        self.hidden_once.borrow_mut().insert(segment.to_string());
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.borrow().clone()
    }

    pub fn create_calls(&self) -> Vec<RemoteCall> {
        self.calls()
            .into_iter()
            .filter(RemoteCall::is_create)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Names of all resources, as `segment` paths from the top.
    pub fn paths(&self) -> Vec<String> {
        let resources = self.resources.borrow();
        resources
            .iter()
            .map(|res| {
                let mut parts = vec![res.segment.clone()];
                let mut parent = res.parent;
                while let Some(pid) = parent {
                    match resources.iter().find(|r| r.id == pid) {
                        Some(p) => {
                            parts.push(p.segment.clone());
                            parent = p.parent;
                        }
                        None => break,
                    }
                }
                parts.reverse();
                parts.join("/")
            })
            .collect()
    }

    /// Display name stored for the resource at `id`.
    pub fn name_of(&self, id: u64) -> Option<String> {
        self.resources
            .borrow()
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.name.clone())
    }

    fn insert(&self, parent: Option<u64>, name: &str, segment: &str, kind: ResourceKind) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.resources.borrow_mut().push(FakeResource {
            id,
            parent,
            segment: segment.to_string(),
            name: name.to_string(),
            kind,
        });
        id
    }

    fn lookup(&self, parent: Option<u64>, segment: &str) -> Option<ResourceRef> {
        self.resources
            .borrow()
            .iter()
            .find(|r| r.parent == parent && r.segment == segment)
            .map(|r| ResourceRef {
                id: r.id,
                kind: r.kind,
            })
    }

    fn injected(&self, kind: CallKind, segment: &str) -> Option<RemoteError> {
        self.failures
            .borrow()
            .get(&(kind, segment.to_string()))
            .cloned()
    }

    fn create(
        &self,
        parent: Option<u64>,
        name: &str,
        segment: &str,
        kind: ResourceKind,
    ) -> Result<ResourceRef, RemoteError> {
        if let Some(err) = self.injected(CallKind::Create, segment) {
            return Err(err);
        }
        if self.lookup(parent, segment).is_some() {
            return Err(RemoteError::AlreadyExists(segment.to_string()));
        }
        let id = self.insert(parent, name, segment, kind);
        Ok(ResourceRef { id, kind })
    }
}

impl RemoteTree for FakeRemote {
    fn find(&self, parent: Option<u64>, segment: &str) -> Result<Option<ResourceRef>, RemoteError> {
        self.calls.borrow_mut().push(RemoteCall::Find {
            parent,
            segment: segment.to_string(),
        });
        if let Some(err) = self.injected(CallKind::Find, segment) {
            return Err(err);
        }
        if self.hidden_once.borrow_mut().remove(segment) {
            return Ok(None);
        }
        Ok(self.lookup(parent, segment))
    }

    fn create_group(
        &self,
        parent: Option<u64>,
        name: &str,
        segment: &str,
    ) -> Result<ResourceRef, RemoteError> {
        self.calls.borrow_mut().push(RemoteCall::CreateGroup {
            parent,
            segment: segment.to_string(),
        });
        self.create(parent, name, segment, ResourceKind::Group)
    }

    fn create_project(
        &self,
        parent: Option<u64>,
        name: &str,
        segment: &str,
    ) -> Result<ResourceRef, RemoteError> {
        self.calls.borrow_mut().push(RemoteCall::CreateProject {
            parent,
            segment: segment.to_string(),
        });
        self.create(parent, name, segment, ResourceKind::Project)
    }
}

/// Throttle that only counts how often it was consulted.
#[derive(Debug, Default)]
pub struct CountingThrottle {
    pub waits: usize,
}

impl Throttle for CountingThrottle {
    fn wait(&mut self) {
        self.waits += 1;
    }
}

/// Outline file in a temporary directory.
pub struct TempOutline {
    _dir: tempfile::TempDir,
    path: PathBuf,
}

impl TempOutline {
    pub fn new(contents: &str) -> Result<Self> {
        let dir = tempfile::tempdir().context("create tempdir")?;
        let path = dir.path().join("structure.md");
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(Self { _dir: dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
