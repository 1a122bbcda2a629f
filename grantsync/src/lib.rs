// SPDX-License-Identifier: MIT OR Apache-2.0

#![cfg_attr(doctest, doc=include_str!("../README.md"))]

//! Reconcile the declared access policy of a principal against the grants it actually holds in
//! a permission backend.
//!
//! A principal is either a user or a service account. Its access policy consists of an unscoped
//! `admin` capability, a set of baseline roles applying across all workspaces and a set of roles
//! per workspace. The four canonical roles are `viewer`, `operator`, `editor` and `owner`.
//!
//! ## Reconciliation
//!
//! The [`Reconciler`] reads the actual grants of a principal through a [`RoleQuery`], computes
//! per scope which roles are missing and which are superfluous, and applies the difference
//! through a [`RoleMutator`], one role at a time:
//!
//! 1. The admin capability is toggled if needed.
//! 2. The baseline scope is processed.
//! 3. Every workspace of the desired policy is processed.
//! 4. Every workspace which only exists in the actual policy has all its roles revoked.
//!
//! Within a scope every grant is applied before any revoke. The backend has no way to change
//! several roles atomically, so this order is what guarantees that the principal never holds less
//! than the intersection of its old and new roles while a pass is running.
//!
//! A pass stops at the first failing mutation and does not undo earlier ones. Since the actual
//! state is re-read at the start of every pass, running it again converges from wherever the
//! failed pass left off.
//!
//! ## Lifecycle
//!
//! - [`Reconciler::create`] refuses to touch a principal which already holds grants, those have
//!   to be adopted with [`Reconciler::import`] first.
//! - [`Reconciler::update`] converges to a new declaration.
//! - [`Reconciler::delete`] converges to the empty policy.
mod config;
mod declaration;
mod diff;
mod error;
mod fetch;
#[cfg(any(test, feature = "test_utils"))]
mod memory;
mod plan;
mod policy;
mod principal;
mod reconciler;
mod role;
mod scope;
pub mod traits;
mod workspaces;

pub use config::{AssignmentFilter, ReconcilerConfig};
pub use declaration::{Declaration, DeclarationError};
pub use diff::{RoleDiff, diff, diff_admin};
pub use error::{BackendError, ReconcileError};
pub use fetch::{AssignmentSource, Fetched, GrantRecord, ResourceKind, aggregate, fetch_policy};
#[cfg(any(test, feature = "test_utils"))]
pub use memory::MemoryBackend;
pub use plan::{Mutation, Plan, ScopeDiff};
pub use policy::{Policy, RoleSet};
pub use principal::{InvalidIdentifier, Principal, PrincipalKind};
pub use reconciler::{Applied, Imported, Reconciler};
pub use role::{ADMIN_ROLE, Role, sort_roles};
pub use scope::Scope;
pub use traits::{RoleMutator, RoleQuery, WorkspaceDirectory};
pub use workspaces::{WorkspaceKind, Workspaces};
