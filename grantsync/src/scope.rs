// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Where a role applies.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Floor of roles applying across every workspace.
    Baseline,

    /// A single named workspace.
    Workspace(String),
}

impl Scope {
    pub fn workspace(name: impl Into<String>) -> Self {
        Self::Workspace(name.into())
    }

    /// Name of the workspace, `None` for the baseline scope.
    pub fn workspace_name(&self) -> Option<&str> {
        match self {
            Scope::Baseline => None,
            Scope::Workspace(name) => Some(name),
        }
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Baseline => write!(f, "all workspaces"),
            Scope::Workspace(name) => write!(f, "workspace '{name}'"),
        }
    }
}
