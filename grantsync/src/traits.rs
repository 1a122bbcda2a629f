// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interfaces to the permission backend.
//!
//! The reconciler never talks to the backend directly. Reading grants, changing a single grant
//! and listing workspaces are separate capabilities, so a real transport and an in-memory fake
//! can be swapped freely.
use crate::error::BackendError;
use crate::fetch::GrantRecord;
use crate::plan::Mutation;
use crate::principal::Principal;
use crate::workspaces::Workspaces;

/// Interface for reading the grants a principal holds.
pub trait RoleQuery {
    /// Returns one record per granted role. A principal without any grant yields an empty list.
    fn fetch_roles(
        &self,
        principal: &Principal,
    ) -> impl Future<Output = Result<Vec<GrantRecord>, BackendError>> + Send;
}

/// Interface for changing grants, one role at a time.
///
/// Every call is atomic on its own, there is no way to group several mutations into one
/// transaction.
pub trait RoleMutator {
    fn apply(
        &self,
        principal: &Principal,
        mutation: &Mutation,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;
}

/// Interface for listing the workspaces known to the backend.
pub trait WorkspaceDirectory {
    fn list_workspaces(&self) -> impl Future<Output = Result<Workspaces, BackendError>> + Send;
}
