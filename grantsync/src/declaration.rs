// SPDX-License-Identifier: MIT OR Apache-2.0

//! Declared access policy of a principal, as written by an operator.
use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::{Policy, RoleSet};
use crate::principal::Principal;
use crate::role::Role;
use crate::scope::Scope;

/// Declared configuration surface of one access policy.
///
/// Exactly one of `user_id` or `service_account_id` names the principal, and at least one of
/// `admin`, `all_workspaces` or `workspaces` has to be present.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Declaration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_account_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<bool>,

    /// Roles applying across every workspace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_workspaces: Option<Vec<Role>>,

    /// Roles per workspace name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspaces: Option<BTreeMap<String, Vec<Role>>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DeclarationError {
    #[error("one of 'user_id' or 'service_account_id' must be set")]
    MissingPrincipal,

    #[error("only one of 'user_id' or 'service_account_id' can be set")]
    AmbiguousPrincipal,

    #[error("at least one of 'admin', 'all_workspaces' or 'workspaces' must be set")]
    NoCapabilities,

    #[error(
        "user id '{0}' must contain only alphanumeric characters, or characters in the set -_.@"
    )]
    InvalidUserId(String),

    #[error("service account id '{0}' must contain only alphanumeric characters")]
    InvalidServiceAccountId(String),

    #[error(
        "workspace name '{0}' must contain only alphanumeric characters, hyphens or underscores"
    )]
    InvalidWorkspaceName(String),

    #[error("unknown role '{role}' on {scope}, expected one of viewer, operator, editor, owner")]
    UnknownRole { role: String, scope: Scope },

    #[error("duplicate role '{role}' on {scope}")]
    DuplicateRole { role: String, scope: Scope },
}

fn validate_user_id(id: &str) -> bool {
    static USER_ID_REGEX: Lazy<Regex> = Lazy::new(|| {
        // Unwrap as we checked the regular expression for correctness
        Regex::new("^[a-zA-Z0-9_.@-]+$").unwrap()
    });

    USER_ID_REGEX.is_match(id)
}

fn validate_service_account_id(id: &str) -> bool {
    static SERVICE_ACCOUNT_ID_REGEX: Lazy<Regex> = Lazy::new(|| {
        // Unwrap as we checked the regular expression for correctness
        Regex::new("^[a-zA-Z0-9]+$").unwrap()
    });

    SERVICE_ACCOUNT_ID_REGEX.is_match(id)
}

fn validate_workspace_name(name: &str) -> bool {
    static WORKSPACE_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
        // Unwrap as we checked the regular expression for correctness
        Regex::new("^[a-zA-Z0-9_-]+$").unwrap()
    });

    WORKSPACE_NAME_REGEX.is_match(name)
}

fn role_set(roles: &[Role], scope: Scope) -> Result<RoleSet, DeclarationError> {
    let mut set = RoleSet::new();
    for role in roles {
        if !role.is_canonical() {
            return Err(DeclarationError::UnknownRole {
                role: role.to_string(),
                scope,
            });
        }

        if !set.insert(role.clone()) {
            return Err(DeclarationError::DuplicateRole {
                role: role.to_string(),
                scope,
            });
        }
    }
    Ok(set)
}

impl Declaration {
    /// Declaration for a user.
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            user_id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Declaration for a service account.
    pub fn service_account(id: impl Into<String>) -> Self {
        Self {
            service_account_id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn with_admin(mut self, admin: bool) -> Self {
        self.admin = Some(admin);
        self
    }

    pub fn with_all_workspaces(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.all_workspaces = Some(roles.into_iter().collect());
        self
    }

    pub fn with_workspace(
        mut self,
        name: impl Into<String>,
        roles: impl IntoIterator<Item = Role>,
    ) -> Self {
        self.workspaces
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), roles.into_iter().collect());
        self
    }

    /// Principal named by this declaration.
    pub fn principal(&self) -> Result<Principal, DeclarationError> {
        match (&self.user_id, &self.service_account_id) {
            (Some(_), Some(_)) => Err(DeclarationError::AmbiguousPrincipal),
            (Some(id), None) => {
                if !validate_user_id(id) {
                    return Err(DeclarationError::InvalidUserId(id.clone()));
                }
                Ok(Principal::User(id.clone()))
            }
            (None, Some(id)) => {
                if !validate_service_account_id(id) {
                    return Err(DeclarationError::InvalidServiceAccountId(id.clone()));
                }
                Ok(Principal::ServiceAccount(id.clone()))
            }
            (None, None) => Err(DeclarationError::MissingPrincipal),
        }
    }

    /// Validate the declaration and turn it into the desired policy of its principal.
    pub fn to_policy(&self) -> Result<Policy, DeclarationError> {
        let principal = self.principal()?;

        if self.admin.is_none() && self.all_workspaces.is_none() && self.workspaces.is_none() {
            return Err(DeclarationError::NoCapabilities);
        }

        let mut policy = Policy::empty(principal);
        policy.admin = self.admin.unwrap_or(false);

        if let Some(roles) = &self.all_workspaces {
            policy.baseline = role_set(roles, Scope::Baseline)?;
        }

        for (name, roles) in self.workspaces.iter().flatten() {
            if !validate_workspace_name(name) {
                return Err(DeclarationError::InvalidWorkspaceName(name.clone()));
            }
            let roles = role_set(roles, Scope::Workspace(name.clone()))?;
            policy.workspaces.insert(name.clone(), roles);
        }

        Ok(policy)
    }

    /// Declaration which would produce the given policy, used when importing existing grants.
    ///
    /// Only canonical roles can be declared. Unrecognized roles held by the policy are left out,
    /// see [`Declaration::unrecognized_roles`], so the result always passes validation.
    pub fn from_policy(policy: &Policy) -> Self {
        let (user_id, service_account_id) = match &policy.principal {
            Principal::User(id) => (Some(id.clone()), None),
            Principal::ServiceAccount(id) => (None, Some(id.clone())),
        };

        let canonical = |roles: &RoleSet| -> Vec<Role> {
            roles.iter().filter(|role| role.is_canonical()).cloned().collect()
        };

        let baseline = canonical(&policy.baseline);
        let workspaces: BTreeMap<String, Vec<Role>> = policy
            .workspaces
            .iter()
            .map(|(name, roles)| (name.clone(), canonical(roles)))
            .filter(|(_, roles)| !roles.is_empty())
            .collect();

        Self {
            user_id,
            service_account_id,
            admin: Some(policy.admin),
            all_workspaces: (!baseline.is_empty()).then_some(baseline),
            workspaces: (!workspaces.is_empty()).then_some(workspaces),
        }
    }

    /// Roles held by the policy which [`Declaration::from_policy`] can not express, per scope.
    pub fn unrecognized_roles(policy: &Policy) -> Vec<(Scope, Role)> {
        policy
            .scopes()
            .flat_map(|scope| {
                let roles: Vec<Role> = policy
                    .roles(&scope)
                    .into_iter()
                    .flatten()
                    .filter(|role| !role.is_canonical())
                    .cloned()
                    .collect();
                roles.into_iter().map(move |role| (scope.clone(), role))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::{Principal, Role, Scope};

    use super::{
        Declaration, DeclarationError, validate_service_account_id, validate_user_id,
        validate_workspace_name,
    };

    #[test]
    fn declaration_from_json() {
        let declaration: Declaration = serde_json::from_str(
            r#"{
                "user_id": "jane@example.com",
                "admin": false,
                "all_workspaces": ["viewer"],
                "workspaces": { "dev": ["operator", "editor"] }
            }"#,
        )
        .unwrap();

        let policy = declaration.to_policy().unwrap();
        assert_eq!(policy.principal, Principal::user("jane@example.com"));
        assert!(!policy.admin);
        assert_eq!(policy.baseline.as_slice(), &[Role::Viewer]);
        assert_eq!(
            policy.roles(&Scope::workspace("dev")).unwrap().as_slice(),
            &[Role::Operator, Role::Editor]
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = serde_json::from_str::<Declaration>(r#"{ "user_id": "jane", "roles": [] }"#);
        assert!(result.is_err());
    }

    #[rstest]
    #[case(Declaration::default().with_admin(false), DeclarationError::MissingPrincipal)]
    #[case(
        Declaration { service_account_id: Some("svc".into()), ..Declaration::user("jane") }
            .with_admin(false),
        DeclarationError::AmbiguousPrincipal
    )]
    #[case(Declaration::user("jane"), DeclarationError::NoCapabilities)]
    #[case(
        Declaration::user("jane doe").with_admin(true),
        DeclarationError::InvalidUserId("jane doe".into())
    )]
    #[case(
        Declaration::service_account("svc-1").with_admin(true),
        DeclarationError::InvalidServiceAccountId("svc-1".into())
    )]
    #[case(
        Declaration::user("jane").with_all_workspaces([Role::parse("test")]),
        DeclarationError::UnknownRole { role: "test".into(), scope: Scope::Baseline }
    )]
    #[case(
        Declaration::user("jane").with_all_workspaces([Role::parse("admin")]),
        DeclarationError::UnknownRole { role: "admin".into(), scope: Scope::Baseline }
    )]
    #[case(
        Declaration::user("jane").with_workspace("test", [Role::parse("test")]),
        DeclarationError::UnknownRole { role: "test".into(), scope: Scope::workspace("test") }
    )]
    #[case(
        Declaration::user("jane").with_all_workspaces([Role::Viewer, Role::Viewer]),
        DeclarationError::DuplicateRole { role: "viewer".into(), scope: Scope::Baseline }
    )]
    #[case(
        Declaration::user("jane").with_workspace("test", [Role::Viewer, Role::Viewer]),
        DeclarationError::DuplicateRole { role: "viewer".into(), scope: Scope::workspace("test") }
    )]
    #[case(
        Declaration::user("jane").with_workspace("my workspace", [Role::Viewer]),
        DeclarationError::InvalidWorkspaceName("my workspace".into())
    )]
    fn invalid_declarations(#[case] declaration: Declaration, #[case] expected: DeclarationError) {
        assert_eq!(declaration.to_policy(), Err(expected));
    }

    #[rstest]
    #[case("jane", true)]
    #[case("jane.doe_1@ex-ample.com", true)]
    #[case("jane+tag@example.com", false)]
    #[case("jane\n", false)]
    #[case("", false)]
    fn user_ids(#[case] id: &str, #[case] valid: bool) {
        assert_eq!(validate_user_id(id), valid);
    }

    #[rstest]
    #[case("abc123", true)]
    #[case("ABC", true)]
    #[case("svc_1", false)]
    #[case("svc-1", false)]
    #[case("", false)]
    fn service_account_ids(#[case] id: &str, #[case] valid: bool) {
        assert_eq!(validate_service_account_id(id), valid);
    }

    #[rstest]
    #[case("dev", true)]
    #[case("fraud_v2-live", true)]
    #[case("dev.staging", false)]
    #[case("my workspace", false)]
    #[case("", false)]
    fn workspace_names(#[case] name: &str, #[case] valid: bool) {
        assert_eq!(validate_workspace_name(name), valid);
    }

    #[test]
    fn empty_role_lists_count_as_capabilities() {
        let policy = Declaration::service_account("svc")
            .with_all_workspaces([])
            .to_policy()
            .unwrap();
        assert!(policy.is_empty());
    }

    #[test]
    fn unrecognized_roles_are_left_out_of_rebuilt_declarations() {
        let mut policy = crate::Policy::empty(Principal::user("jane"));
        policy.baseline = [Role::Viewer, Role::parse("auditor")].into();
        policy.workspaces.insert("dev".into(), [Role::parse("admin")].into());
        policy.workspaces.insert("prod".into(), [Role::parse("admin"), Role::Editor].into());

        let declaration = Declaration::from_policy(&policy);
        assert_eq!(
            declaration,
            Declaration::user("jane")
                .with_admin(false)
                .with_all_workspaces([Role::Viewer])
                .with_workspace("prod", [Role::Editor])
        );
        assert!(declaration.to_policy().is_ok());

        assert_eq!(
            Declaration::unrecognized_roles(&policy),
            vec![
                (Scope::Baseline, Role::parse("auditor")),
                (Scope::workspace("dev"), Role::parse("admin")),
                (Scope::workspace("prod"), Role::parse("admin")),
            ]
        );
    }

    #[test]
    fn rebuild_declaration_from_policy() {
        let declaration = Declaration::user("jane")
            .with_admin(true)
            .with_all_workspaces([Role::Viewer])
            .with_workspace("dev", [Role::Operator, Role::Editor]);

        let policy = declaration.to_policy().unwrap();
        assert_eq!(Declaration::from_policy(&policy), declaration);

        let empty = Declaration::from_policy(&crate::Policy::empty(Principal::service_account("svc")));
        assert_eq!(empty, Declaration::service_account("svc").with_admin(false));
    }
}
