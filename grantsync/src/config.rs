// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration of a reconciler.
use serde::{Deserialize, Serialize};

/// Which grant records count toward the actual policy of a principal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentFilter {
    /// Every reported grant, whether assigned directly or inherited.
    #[default]
    All,

    /// Only grants with a direct assignment. Records without any assignment source are kept.
    DirectOnly,
}

/// Configuration parameters for a `Reconciler`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Filter applied to grant records before they are aggregated into the actual policy.
    pub assignment_filter: AssignmentFilter,

    /// Check that every workspace of a desired policy exists in the workspace snapshot, if one
    /// was provided, before issuing any mutation.
    pub validate_workspaces: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            assignment_filter: AssignmentFilter::All,
            validate_workspaces: true,
        }
    }
}
