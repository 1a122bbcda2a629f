// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const USER_PREFIX: &str = "user-";

const SERVICE_PREFIX: &str = "service-";

/// A user or service account which can hold role grants.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Principal {
    User(String),
    ServiceAccount(String),
}

/// Kind of a principal, without its identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrincipalKind {
    User,
    ServiceAccount,
}

impl Principal {
    pub fn user(id: impl Into<String>) -> Self {
        Self::User(id.into())
    }

    pub fn service_account(id: impl Into<String>) -> Self {
        Self::ServiceAccount(id.into())
    }

    pub fn kind(&self) -> PrincipalKind {
        match self {
            Principal::User(_) => PrincipalKind::User,
            Principal::ServiceAccount(_) => PrincipalKind::ServiceAccount,
        }
    }

    /// Identifier of the principal within the backend, without any prefix.
    pub fn name(&self) -> &str {
        match self {
            Principal::User(id) | Principal::ServiceAccount(id) => id,
        }
    }

    /// Stable identifier of the access policy held by this principal, `user-<id>` or
    /// `service-<id>`.
    pub fn id(&self) -> String {
        match self {
            Principal::User(id) => format!("{USER_PREFIX}{id}"),
            Principal::ServiceAccount(id) => format!("{SERVICE_PREFIX}{id}"),
        }
    }

    /// Recover the principal from a policy identifier produced by [`Principal::id`].
    pub fn from_id(id: &str) -> Result<Self, InvalidIdentifier> {
        let principal = if let Some(user) = id.strip_prefix(USER_PREFIX) {
            Principal::User(user.to_owned())
        } else if let Some(service) = id.strip_prefix(SERVICE_PREFIX) {
            Principal::ServiceAccount(service.to_owned())
        } else {
            return Err(InvalidIdentifier(id.to_owned()));
        };

        if principal.name().is_empty() {
            return Err(InvalidIdentifier(id.to_owned()));
        }

        Ok(principal)
    }
}

impl FromStr for Principal {
    type Err = InvalidIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_id(s)
    }
}

impl Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::User(id) => write!(f, "user '{id}'"),
            Principal::ServiceAccount(id) => write!(f, "service account '{id}'"),
        }
    }
}

/// Policy identifier without a recognized `user-` or `service-` prefix.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("expected either 'user-' or 'service-' as a prefix, got: '{0}'")]
pub struct InvalidIdentifier(pub String);
