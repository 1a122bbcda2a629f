// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Whether a workspace serves live traffic or is used for development.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceKind {
    Live,
    Development,
}

/// Snapshot of the workspaces known to the backend.
///
/// Fetched once per run and handed around as a value. It is never refreshed, so a workspace
/// removed by someone else during the run only shows up as a failing mutation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspaces {
    pub live: BTreeSet<String>,
    pub dev: BTreeSet<String>,
}

impl Workspaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_live(mut self, name: impl Into<String>) -> Self {
        self.live.insert(name.into());
        self
    }

    pub fn with_dev(mut self, name: impl Into<String>) -> Self {
        self.dev.insert(name.into());
        self
    }

    /// Kind of the named workspace, `None` if it does not exist.
    pub fn kind(&self, name: &str) -> Option<WorkspaceKind> {
        if self.dev.contains(name) {
            Some(WorkspaceKind::Development)
        } else if self.live.contains(name) {
            Some(WorkspaceKind::Live)
        } else {
            None
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kind(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.live.union(&self.dev).count()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty() && self.dev.is_empty()
    }
}
