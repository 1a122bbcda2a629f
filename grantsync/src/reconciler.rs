// SPDX-License-Identifier: MIT OR Apache-2.0

//! Drive the backend from the actual to the desired policy of a principal.
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ReconcilerConfig;
use crate::declaration::Declaration;
use crate::error::ReconcileError;
use crate::fetch::{Fetched, fetch_policy};
use crate::plan::{Mutation, Plan};
use crate::policy::Policy;
use crate::principal::Principal;
use crate::role::Role;
use crate::scope::Scope;
use crate::traits::{RoleMutator, RoleQuery};
use crate::workspaces::Workspaces;

/// Outcome of a successful reconciliation pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applied {
    /// Identifier of the access policy, `user-<id>` or `service-<id>`.
    pub id: String,

    pub principal: Principal,

    /// Mutations issued during the pass, in the order they were applied.
    pub mutations: Vec<Mutation>,

    /// UNIX timestamp in seconds of when the pass finished.
    pub last_updated: u64,
}

/// Existing access policy adopted through its identifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Imported {
    pub id: String,
    pub policy: Policy,

    /// Declaration of the canonical roles in `policy`.
    pub declaration: Declaration,

    /// Roles held by the principal which can not be declared. Updating with `declaration`
    /// revokes them.
    pub unrecognized: Vec<(Scope, Role)>,
}

/// Reconciles access policies of principals against a permission backend.
///
/// One call handles exactly one principal and issues its mutations sequentially. Within each
/// scope all grants are applied before any revoke, so while a pass runs the principal always
/// holds at least the intersection and at most the union of its old and new roles.
///
/// Nothing is rolled back when a mutation fails. Every pass starts by re-reading the actual
/// state from the backend, so running it again after a failure applies exactly the remaining
/// changes.
#[derive(Clone, Debug)]
pub struct Reconciler<Q, M> {
    query: Q,
    mutator: M,
    config: ReconcilerConfig,
    workspaces: Option<Workspaces>,
}

impl<Q, M> Reconciler<Q, M>
where
    Q: RoleQuery + Sync,
    M: RoleMutator + Sync,
{
    pub fn new(query: Q, mutator: M) -> Self {
        Self::from_config(query, mutator, ReconcilerConfig::default())
    }

    pub fn from_config(query: Q, mutator: M, config: ReconcilerConfig) -> Self {
        Self {
            query,
            mutator,
            config,
            workspaces: None,
        }
    }

    /// Use a snapshot of the known workspaces to validate desired policies before mutating.
    pub fn with_workspaces(mut self, workspaces: Workspaces) -> Self {
        self.workspaces = Some(workspaces);
        self
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Read the actual policy of a principal.
    pub async fn read(&self, principal: &Principal) -> Result<Fetched, ReconcileError> {
        fetch_policy(&self.query, principal, self.config.assignment_filter)
            .await
            .map_err(|source| ReconcileError::Fetch {
                principal: principal.clone(),
                source,
            })
    }

    /// Compute the mutations which would bring the principal to `desired`, without applying
    /// them.
    pub async fn plan(&self, desired: &Policy) -> Result<Plan, ReconcileError> {
        let actual = self.read(&desired.principal).await?;
        Ok(Plan::new(desired, &actual.policy))
    }

    /// Declare the access policy of a principal for the first time.
    ///
    /// Fails with `AlreadyExists`, without mutating anything, if the backend reports any grant
    /// for the principal. Existing grants have to be adopted through [`Reconciler::import`].
    pub async fn create(&self, declaration: &Declaration) -> Result<Applied, ReconcileError> {
        let desired = declaration.to_policy()?;
        info!(principal = %desired.principal, "create access policy");

        let actual = self.read(&desired.principal).await?;
        if actual.exists {
            warn!(principal = %desired.principal, "refuse to create, grants already exist");
            return Err(ReconcileError::AlreadyExists(desired.principal));
        }

        self.converge(&desired, &actual.policy).await
    }

    /// Bring the grants of a declared principal in line with its declaration.
    pub async fn update(&self, declaration: &Declaration) -> Result<Applied, ReconcileError> {
        let desired = declaration.to_policy()?;
        info!(principal = %desired.principal, "update access policy");
        self.reconcile(&desired).await
    }

    /// Remove every grant and the admin capability of a principal.
    pub async fn delete(&self, principal: &Principal) -> Result<Applied, ReconcileError> {
        info!(%principal, "delete access policy");
        self.reconcile(&Policy::empty(principal.clone())).await
    }

    /// Adopt the existing grants of the principal named by a policy identifier.
    ///
    /// Roles outside the canonical vocabulary, like a workspace level `admin`, are reported in
    /// `Imported::unrecognized` instead of the declaration.
    pub async fn import(&self, id: &str) -> Result<Imported, ReconcileError> {
        let principal = Principal::from_id(id)?;
        info!(%principal, "import access policy");

        let actual = self.read(&principal).await?;
        let unrecognized = Declaration::unrecognized_roles(&actual.policy);
        if !unrecognized.is_empty() {
            warn!(
                %principal,
                count = unrecognized.len(),
                "imported grants hold roles which can not be declared"
            );
        }

        Ok(Imported {
            id: principal.id(),
            declaration: Declaration::from_policy(&actual.policy),
            policy: actual.policy,
            unrecognized,
        })
    }

    /// Re-read the actual state and converge it to `desired`.
    pub async fn reconcile(&self, desired: &Policy) -> Result<Applied, ReconcileError> {
        let actual = self.read(&desired.principal).await?;
        self.converge(desired, &actual.policy).await
    }

    async fn converge(&self, desired: &Policy, actual: &Policy) -> Result<Applied, ReconcileError> {
        let plan = Plan::new(desired, actual);
        self.validate_workspaces(&plan)?;

        for scope_diff in &plan.scopes {
            debug!(
                principal = %plan.principal,
                scope = %scope_diff.scope,
                grant = scope_diff.diff.to_grant.len(),
                revoke = scope_diff.diff.to_revoke.len(),
                "computed scope diff"
            );
        }

        let mutations = self.apply(&plan).await?;
        info!(
            principal = %plan.principal,
            mutations = mutations.len(),
            "access policy reconciled"
        );

        Ok(Applied {
            id: plan.principal.id(),
            principal: plan.principal,
            mutations,
            last_updated: now(),
        })
    }

    /// Apply the mutations of a plan one after another, stopping at the first failure.
    pub async fn apply(&self, plan: &Plan) -> Result<Vec<Mutation>, ReconcileError> {
        let mutations = plan.mutations();

        for (applied, mutation) in mutations.iter().enumerate() {
            debug!(principal = %plan.principal, %mutation, "apply");

            if let Err(source) = self.mutator.apply(&plan.principal, mutation).await {
                warn!(
                    principal = %plan.principal,
                    %mutation,
                    applied,
                    "abort reconciliation: {source}"
                );
                return Err(ReconcileError::PartialApply {
                    principal: plan.principal.clone(),
                    mutation: mutation.clone(),
                    applied,
                    source,
                });
            }
        }

        Ok(mutations)
    }

    /// Check that every workspace the plan grants roles on exists in the workspace snapshot.
    ///
    /// Workspaces which only lose roles are never checked.
    fn validate_workspaces(&self, plan: &Plan) -> Result<(), ReconcileError> {
        if !self.config.validate_workspaces {
            return Ok(());
        }

        let Some(workspaces) = &self.workspaces else {
            return Ok(());
        };

        let unknown = plan
            .scopes
            .iter()
            .filter(|scope_diff| !scope_diff.diff.to_grant.is_empty())
            .filter_map(|scope_diff| scope_diff.scope.workspace_name())
            .find(|name| !workspaces.contains(name));

        match unknown {
            Some(name) => Err(ReconcileError::UnknownWorkspace {
                principal: plan.principal.clone(),
                workspace: name.to_owned(),
            }),
            None => Ok(()),
        }
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or_default()
}
