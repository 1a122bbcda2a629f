// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

use crate::declaration::DeclarationError;
use crate::plan::Mutation;
use crate::principal::{InvalidIdentifier, Principal};

/// Failure reported by a backend collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The transport failed, the message keeps the raw backend output for diagnosis.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with output which does not have the expected shape.
    #[error("unexpected backend output: {0}")]
    Parse(String),
}

/// Errors which can occur while reconciling an access policy.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Desired policy declaration is invalid, no backend call was made.
    #[error("invalid access policy declaration: {0}")]
    Configuration(#[from] DeclarationError),

    /// Imported policy identifier could not be decomposed.
    #[error(transparent)]
    InvalidIdentifier(#[from] InvalidIdentifier),

    /// Actual roles of the principal could not be read.
    #[error("failed to read roles of {principal}: {source}")]
    Fetch {
        principal: Principal,
        #[source]
        source: BackendError,
    },

    /// Roles already exist for a principal which is being declared for the first time.
    #[error(
        "an access policy already exists for {0}, it must first be imported so that no \
         permissions are accidentally removed"
    )]
    AlreadyExists(Principal),

    /// A role would be granted on a workspace missing from the workspace directory.
    #[error("workspace '{workspace}' requested for {principal} does not exist")]
    UnknownWorkspace {
        principal: Principal,
        workspace: String,
    },

    /// A mutation failed, the pass stopped and the `applied` earlier mutations stand.
    #[error("failed to {mutation} for {principal} after {applied} applied changes: {source}")]
    PartialApply {
        principal: Principal,
        mutation: Mutation,
        applied: usize,
        #[source]
        source: BackendError,
    },
}

impl ReconcileError {
    /// Returns `true` if the backend transport could not be reached or failed.
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(
            self,
            ReconcileError::Fetch {
                source: BackendError::Unavailable(_),
                ..
            } | ReconcileError::PartialApply {
                source: BackendError::Unavailable(_),
                ..
            }
        )
    }
}
