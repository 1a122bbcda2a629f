// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aggregation of raw grant records into the actual policy of a principal.
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::AssignmentFilter;
use crate::error::BackendError;
use crate::policy::Policy;
use crate::principal::Principal;
use crate::role::{ADMIN_ROLE, Role};
use crate::scope::Scope;
use crate::traits::RoleQuery;

/// Level a grant record applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceKind {
    Organization,
    Workspace,
}

/// How a grant came to be held by the principal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AssignmentSource {
    /// Assigned to the principal itself.
    Direct,

    /// Any other origin, for example through a group membership.
    Other(String),
}

impl AssignmentSource {
    pub fn parse(value: &str) -> Self {
        match value {
            "DIRECT" => AssignmentSource::Direct,
            other => AssignmentSource::Other(other.to_owned()),
        }
    }
}

/// One granted role as reported by the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrantRecord {
    pub resource: ResourceKind,

    /// Name of the workspace, only set for workspace level records.
    pub workspace: Option<String>,

    pub role: Role,

    pub sources: Vec<AssignmentSource>,
}

impl GrantRecord {
    /// Directly assigned organization level record.
    pub fn organization(role: impl Into<Role>) -> Self {
        Self {
            resource: ResourceKind::Organization,
            workspace: None,
            role: role.into(),
            sources: vec![AssignmentSource::Direct],
        }
    }

    /// Directly assigned workspace level record.
    pub fn workspace(name: impl Into<String>, role: impl Into<Role>) -> Self {
        Self {
            resource: ResourceKind::Workspace,
            workspace: Some(name.into()),
            role: role.into(),
            sources: vec![AssignmentSource::Direct],
        }
    }

    /// Replace the assignment sources of this record.
    pub fn with_sources(mut self, sources: Vec<AssignmentSource>) -> Self {
        self.sources = sources;
        self
    }

    fn is_admin(&self) -> bool {
        self.resource == ResourceKind::Organization && self.role.as_str() == ADMIN_ROLE
    }

    fn matches(&self, filter: AssignmentFilter) -> bool {
        match filter {
            AssignmentFilter::All => true,
            AssignmentFilter::DirectOnly => {
                self.sources.is_empty() || self.sources.contains(&AssignmentSource::Direct)
            }
        }
    }
}

/// Actual policy of a principal together with whether the backend knew about it at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fetched {
    pub policy: Policy,

    /// `true` if the backend reported at least one grant record for the principal.
    pub exists: bool,
}

/// Build the actual policy of a principal from its grant records.
///
/// Organization level `admin` becomes the admin capability, other organization level roles make
/// up the baseline and workspace level roles are bucketed per workspace. Every resulting role set
/// is sorted for presentation.
pub fn aggregate(
    principal: Principal,
    records: Vec<GrantRecord>,
    filter: AssignmentFilter,
) -> Result<Fetched, BackendError> {
    let exists = !records.is_empty();
    let mut policy = Policy::empty(principal);

    for record in records {
        if !record.matches(filter) {
            trace!(role = %record.role, "skip grant which is not directly assigned");
            continue;
        }

        if record.is_admin() {
            policy.admin = true;
            continue;
        }

        let scope = match (record.resource, record.workspace) {
            (ResourceKind::Organization, _) => Scope::Baseline,
            (ResourceKind::Workspace, Some(name)) if !name.is_empty() => Scope::Workspace(name),
            (ResourceKind::Workspace, _) => {
                return Err(BackendError::Parse(format!(
                    "workspace grant of role '{}' without a workspace name",
                    record.role
                )));
            }
        };

        policy.roles_mut(&scope).insert(record.role);
    }

    policy.sort();

    Ok(Fetched { policy, exists })
}

/// Fetch the grants of a principal from the backend and aggregate them.
pub async fn fetch_policy<Q>(
    query: &Q,
    principal: &Principal,
    filter: AssignmentFilter,
) -> Result<Fetched, BackendError>
where
    Q: RoleQuery,
{
    let records = query.fetch_roles(principal).await?;
    debug!(%principal, records = records.len(), "read roles");
    aggregate(principal.clone(), records, filter)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use crate::config::AssignmentFilter;
    use crate::error::BackendError;
    use crate::{Principal, Role, Scope};

    use super::{AssignmentSource, GrantRecord, ResourceKind, aggregate};

    #[test]
    fn empty_result() {
        let fetched =
            aggregate(Principal::user("jane"), vec![], AssignmentFilter::All).unwrap();
        assert!(!fetched.exists);
        assert!(fetched.policy.is_empty());
    }

    #[test]
    fn buckets_records_by_scope() {
        let records = vec![
            GrantRecord::organization("admin"),
            GrantRecord::organization("owner"),
            GrantRecord::organization("viewer"),
            GrantRecord::workspace("dev", "editor"),
            GrantRecord::workspace("dev", "viewer"),
            GrantRecord::workspace("prod", "operator"),
        ];

        let fetched =
            aggregate(Principal::user("jane"), records, AssignmentFilter::All).unwrap();
        let policy = fetched.policy;

        assert!(fetched.exists);
        assert!(policy.admin);
        assert!(!policy.baseline.contains(&Role::Other("admin".into())));
        assert_eq!(policy.baseline.as_slice(), &[Role::Viewer, Role::Owner]);
        assert_eq!(
            policy.roles(&Scope::workspace("dev")).unwrap().as_slice(),
            &[Role::Viewer, Role::Editor]
        );
        assert_eq!(
            policy.roles(&Scope::workspace("prod")).unwrap().as_slice(),
            &[Role::Operator]
        );
    }

    #[test]
    fn workspace_admin_is_an_ordinary_role() {
        let records = vec![GrantRecord::workspace("dev", "admin")];
        let fetched =
            aggregate(Principal::user("jane"), records, AssignmentFilter::All).unwrap();

        assert!(!fetched.policy.admin);
        assert!(
            fetched
                .policy
                .roles(&Scope::workspace("dev"))
                .unwrap()
                .contains(&Role::Other("admin".into()))
        );
    }

    #[test]
    fn direct_only_filter() {
        let inherited = vec![AssignmentSource::parse("PRINCIPAL_GROUP")];
        let records = vec![
            GrantRecord::organization("editor").with_sources(inherited.clone()),
            GrantRecord::workspace("dev", "owner").with_sources(inherited),
            GrantRecord::workspace("dev", "viewer").with_sources(vec![]),
            GrantRecord::workspace("dev", "operator"),
        ];

        let all = aggregate(
            Principal::service_account("svc"),
            records.clone(),
            AssignmentFilter::All,
        )
        .unwrap();
        assert_eq!(all.policy.baseline.as_slice(), &[Role::Editor]);

        let direct = aggregate(
            Principal::service_account("svc"),
            records,
            AssignmentFilter::DirectOnly,
        )
        .unwrap();
        assert!(direct.exists);
        assert!(direct.policy.baseline.is_empty());
        assert_eq!(
            direct
                .policy
                .roles(&Scope::workspace("dev"))
                .unwrap()
                .as_slice(),
            &[Role::Viewer, Role::Operator]
        );
    }

    #[test]
    fn workspace_record_without_name() {
        let record = GrantRecord {
            resource: ResourceKind::Workspace,
            workspace: None,
            role: Role::Viewer,
            sources: vec![],
        };
        let result = aggregate(Principal::user("jane"), vec![record], AssignmentFilter::All);
        assert_matches!(result, Err(BackendError::Parse(_)));
    }
}
