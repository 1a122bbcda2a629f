// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordered mutations which move a principal from its actual to its desired policy.
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::diff::{RoleDiff, diff, diff_admin};
use crate::policy::{Policy, RoleSet};
use crate::principal::Principal;
use crate::role::{ADMIN_ROLE, Role};
use crate::scope::Scope;

/// A single atomic change against the backend.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mutation {
    /// Grant or revoke the unscoped admin capability.
    SetAdmin { grant: bool },

    /// Grant one role on a scope.
    Grant { scope: Scope, role: Role },

    /// Revoke one role from a scope.
    Revoke { scope: Scope, role: Role },
}

impl Mutation {
    /// Returns `true` for mutations which add permissions.
    pub fn is_grant(&self) -> bool {
        match self {
            Mutation::SetAdmin { grant } => *grant,
            Mutation::Grant { .. } => true,
            Mutation::Revoke { .. } => false,
        }
    }

    /// Role string as understood by the backend.
    pub fn role(&self) -> &str {
        match self {
            Mutation::SetAdmin { .. } => ADMIN_ROLE,
            Mutation::Grant { role, .. } | Mutation::Revoke { role, .. } => role.as_str(),
        }
    }

    /// Workspace the mutation is scoped to, `None` for organization wide changes.
    pub fn workspace(&self) -> Option<&str> {
        match self {
            Mutation::SetAdmin { .. } => None,
            Mutation::Grant { scope, .. } | Mutation::Revoke { scope, .. } => {
                scope.workspace_name()
            }
        }
    }
}

impl Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::SetAdmin { grant: true } => write!(f, "grant admin"),
            Mutation::SetAdmin { grant: false } => write!(f, "revoke admin"),
            Mutation::Grant { scope, role } => write!(f, "grant role '{role}' on {scope}"),
            Mutation::Revoke { scope, role } => write!(f, "revoke role '{role}' on {scope}"),
        }
    }
}

/// Diff of one scope within a plan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeDiff {
    pub scope: Scope,
    pub diff: RoleDiff,
}

/// Everything one reconciliation pass has to change for a principal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub principal: Principal,

    /// Admin toggle, applied before any scoped role.
    pub admin: Option<bool>,

    /// Non-empty diffs in processing order: baseline, desired workspaces, then workspaces which
    /// were dropped from the desired policy.
    pub scopes: Vec<ScopeDiff>,
}

impl Plan {
    pub fn new(desired: &Policy, actual: &Policy) -> Self {
        let empty = RoleSet::new();
        let scopes = desired
            .scopes_with(actual)
            .filter_map(|scope| {
                let diff = diff(
                    desired.roles(&scope).unwrap_or(&empty),
                    actual.roles(&scope).unwrap_or(&empty),
                );
                (!diff.is_empty()).then_some(ScopeDiff { scope, diff })
            })
            .collect();

        Self {
            principal: desired.principal.clone(),
            admin: diff_admin(desired.admin, actual.admin),
            scopes,
        }
    }

    /// Returns `true` if the actual policy already matches the desired one.
    pub fn is_empty(&self) -> bool {
        self.admin.is_none() && self.scopes.is_empty()
    }

    /// Mutations in the order they must be applied.
    ///
    /// Within a scope every grant comes before any revoke, so the principal holds the union of
    /// old and new roles while the scope transitions and never less than their intersection.
    pub fn mutations(&self) -> Vec<Mutation> {
        let mut mutations = Vec::new();

        if let Some(grant) = self.admin {
            mutations.push(Mutation::SetAdmin { grant });
        }

        for ScopeDiff { scope, diff } in &self.scopes {
            mutations.extend(diff.to_grant.iter().map(|role| Mutation::Grant {
                scope: scope.clone(),
                role: role.clone(),
            }));
            mutations.extend(diff.to_revoke.iter().map(|role| Mutation::Revoke {
                scope: scope.clone(),
                role: role.clone(),
            }));
        }

        mutations
    }
}
