// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory permission backend for tests.
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::AssignmentFilter;
use crate::error::BackendError;
use crate::fetch::{AssignmentSource, GrantRecord, aggregate};
use crate::plan::Mutation;
use crate::policy::Policy;
use crate::principal::Principal;
use crate::role::{ADMIN_ROLE, Role};
use crate::scope::Scope;
use crate::traits::{RoleMutator, RoleQuery, WorkspaceDirectory};
use crate::workspaces::Workspaces;

#[derive(Debug, Default)]
pub struct InnerMemoryBackend {
    grants: HashMap<Principal, Vec<GrantRecord>>,
    workspaces: Option<Workspaces>,
    applied: Vec<(Principal, Mutation)>,
    history: Vec<(Principal, Policy)>,
    failing: HashSet<Mutation>,
    unavailable: bool,
}

/// A permission backend living entirely in memory.
///
/// Every applied mutation is logged together with a snapshot of the principal's policy right
/// after it, which allows checking what the principal held at each step of a pass. Mutations can
/// be made to fail to exercise partial application.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    inner: Arc<RwLock<InnerMemoryBackend>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Known workspaces. Mutations on any other workspace will fail. Without a directory every
    /// workspace is accepted.
    pub fn with_workspaces(self, workspaces: Workspaces) -> Self {
        self.write_store().workspaces = Some(workspaces);
        self
    }

    /// Obtain a read-lock on the backend.
    pub fn read_store(&self) -> RwLockReadGuard<'_, InnerMemoryBackend> {
        self.inner
            .read()
            .expect("acquire shared read access on backend")
    }

    /// Obtain a write-lock on the backend.
    pub fn write_store(&self) -> RwLockWriteGuard<'_, InnerMemoryBackend> {
        self.inner
            .write()
            .expect("acquire exclusive write access on backend")
    }

    /// Seed a grant record without logging it as a mutation.
    pub fn insert(&self, principal: &Principal, record: GrantRecord) {
        let mut store = self.write_store();
        let records = store.grants.entry(principal.clone()).or_default();
        if !records.contains(&record) {
            records.push(record);
        }
    }

    /// Seed the grants making up `policy`.
    pub fn insert_policy(&self, policy: &Policy) {
        if policy.admin {
            self.insert(&policy.principal, GrantRecord::organization(ADMIN_ROLE));
        }
        for scope in policy.scopes() {
            for role in policy.roles(&scope).into_iter().flatten() {
                self.insert(&policy.principal, record(&scope, role.clone()));
            }
        }
    }

    /// Make every future attempt to apply this mutation fail.
    pub fn fail_on(&self, mutation: Mutation) {
        self.write_store().failing.insert(mutation);
    }

    /// Let all mutations succeed again.
    pub fn clear_failures(&self) {
        self.write_store().failing.clear();
    }

    /// Make role queries fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.write_store().unavailable = unavailable;
    }

    /// Current policy of a principal.
    pub fn policy(&self, principal: &Principal) -> Policy {
        let records = self
            .read_store()
            .grants
            .get(principal)
            .cloned()
            .unwrap_or_default();
        aggregate(principal.clone(), records, AssignmentFilter::All)
            .expect("records of the memory backend are well formed")
            .policy
    }

    /// Mutations applied successfully so far, for all principals.
    pub fn applied(&self) -> Vec<Mutation> {
        self.read_store()
            .applied
            .iter()
            .map(|(_, mutation)| mutation.clone())
            .collect()
    }

    /// Policy of the principal after each successfully applied mutation.
    pub fn history(&self, principal: &Principal) -> Vec<Policy> {
        self.read_store()
            .history
            .iter()
            .filter(|(owner, _)| owner == principal)
            .map(|(_, policy)| policy.clone())
            .collect()
    }

    /// Forget the mutation log and history.
    pub fn reset_log(&self) {
        let mut store = self.write_store();
        store.applied.clear();
        store.history.clear();
    }
}

fn record(scope: &Scope, role: Role) -> GrantRecord {
    match scope {
        Scope::Baseline => GrantRecord::organization(role),
        Scope::Workspace(name) => GrantRecord::workspace(name.clone(), role),
    }
}

fn mutation_record(mutation: &Mutation) -> GrantRecord {
    match mutation {
        Mutation::SetAdmin { .. } => GrantRecord::organization(ADMIN_ROLE),
        Mutation::Grant { scope, role } | Mutation::Revoke { scope, role } => {
            record(scope, role.clone())
        }
    }
}

fn same_grant(left: &GrantRecord, right: &GrantRecord) -> bool {
    left.resource == right.resource && left.workspace == right.workspace && left.role == right.role
}

impl RoleQuery for MemoryBackend {
    async fn fetch_roles(&self, principal: &Principal) -> Result<Vec<GrantRecord>, BackendError> {
        let store = self.read_store();
        if store.unavailable {
            return Err(BackendError::Unavailable("connection refused".into()));
        }
        Ok(store.grants.get(principal).cloned().unwrap_or_default())
    }
}

impl RoleMutator for MemoryBackend {
    async fn apply(&self, principal: &Principal, mutation: &Mutation) -> Result<(), BackendError> {
        let mut store = self.write_store();

        if store.failing.contains(mutation) {
            return Err(BackendError::Unavailable(format!("injected failure: {mutation}")));
        }

        if let (Some(workspaces), Some(name)) = (&store.workspaces, mutation.workspace()) {
            if !workspaces.contains(name) {
                return Err(BackendError::Unavailable(format!(
                    "workspace '{name}' does not exist"
                )));
            }
        }

        let target = mutation_record(mutation);
        let records = store.grants.entry(principal.clone()).or_default();
        if mutation.is_grant() {
            match records.iter_mut().find(|record| same_grant(record, &target)) {
                Some(existing) => {
                    if !existing.sources.contains(&AssignmentSource::Direct) {
                        existing.sources.push(AssignmentSource::Direct);
                    }
                }
                None => records.push(target),
            }
        } else {
            records.retain(|record| !same_grant(record, &target));
        }

        let snapshot = aggregate(principal.clone(), records.clone(), AssignmentFilter::All)?.policy;
        store.applied.push((principal.clone(), mutation.clone()));
        store.history.push((principal.clone(), snapshot));

        Ok(())
    }
}

impl WorkspaceDirectory for MemoryBackend {
    async fn list_workspaces(&self) -> Result<Workspaces, BackendError> {
        Ok(self.read_store().workspaces.clone().unwrap_or_default())
    }
}
