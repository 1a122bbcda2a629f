// SPDX-License-Identifier: MIT OR Apache-2.0

//! Role sets and access policies.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::principal::Principal;
use crate::role::{Role, sort_roles};
use crate::scope::Scope;

/// Set of roles held on one scope.
///
/// Insertion order is kept so that presentation and mutation order stay deterministic, but
/// equality is plain set equality and duplicates are never stored.
#[derive(Clone, Debug, Default, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Role>", into = "Vec<Role>")]
pub struct RoleSet(Vec<Role>);

impl RoleSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Add a role. Returns `false` if the role was already present.
    pub fn insert(&mut self, role: Role) -> bool {
        if self.contains(&role) {
            return false;
        }
        self.0.push(role);
        true
    }

    /// Remove a role. Returns `false` if the role was not present.
    pub fn remove(&mut self, role: &Role) -> bool {
        let len = self.0.len();
        self.0.retain(|item| item != role);
        self.0.len() != len
    }

    pub fn contains(&self, role: &Role) -> bool {
        self.0.contains(role)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Role> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Role] {
        &self.0
    }

    /// Roles in `self` which are not in `other`, in the order of `self`.
    pub fn difference(&self, other: &RoleSet) -> RoleSet {
        self.iter()
            .filter(|role| !other.contains(role))
            .cloned()
            .collect()
    }

    /// Roles present in both sets, in the order of `self`.
    pub fn intersection(&self, other: &RoleSet) -> RoleSet {
        self.iter()
            .filter(|role| other.contains(role))
            .cloned()
            .collect()
    }

    /// Roles present in either set, `self` first.
    pub fn union(&self, other: &RoleSet) -> RoleSet {
        self.iter().chain(other.iter()).cloned().collect()
    }

    /// Returns `true` if every role of `self` is also in `other`.
    pub fn is_subset(&self, other: &RoleSet) -> bool {
        self.iter().all(|role| other.contains(role))
    }

    /// Reorder the roles by increasing power, see [`sort_roles`].
    pub fn sort(&mut self) {
        sort_roles(&mut self.0);
    }
}

impl PartialEq for RoleSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.is_subset(other)
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<T: IntoIterator<Item = Role>>(iter: T) -> Self {
        let mut set = RoleSet::new();
        set.extend(iter);
        set
    }
}

impl Extend<Role> for RoleSet {
    fn extend<T: IntoIterator<Item = Role>>(&mut self, iter: T) {
        for role in iter {
            self.insert(role);
        }
    }
}

impl<const N: usize> From<[Role; N]> for RoleSet {
    fn from(roles: [Role; N]) -> Self {
        roles.into_iter().collect()
    }
}

impl From<Vec<Role>> for RoleSet {
    fn from(roles: Vec<Role>) -> Self {
        roles.into_iter().collect()
    }
}

impl From<RoleSet> for Vec<Role> {
    fn from(set: RoleSet) -> Self {
        set.0
    }
}

impl IntoIterator for RoleSet {
    type Item = Role;
    type IntoIter = std::vec::IntoIter<Role>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a RoleSet {
    type Item = &'a Role;
    type IntoIter = std::slice::Iter<'a, Role>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Roles and admin capability held by one principal.
///
/// The same shape describes both what is declared (desired policy) and what the backend reports
/// (actual policy). A workspace mapped to an empty role set is equivalent to a workspace which is
/// not mapped at all.
#[derive(Clone, Debug, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub principal: Principal,

    /// Unscoped admin capability, reconciled independently of the ordered roles.
    pub admin: bool,

    /// Roles applying across every workspace.
    pub baseline: RoleSet,

    /// Roles per workspace name.
    pub workspaces: BTreeMap<String, RoleSet>,
}

impl Policy {
    /// Policy holding no roles and no admin capability, the target of a deletion.
    pub fn empty(principal: Principal) -> Self {
        Self {
            principal,
            admin: false,
            baseline: RoleSet::new(),
            workspaces: BTreeMap::new(),
        }
    }

    /// Returns `true` if the principal holds nothing at all under this policy.
    pub fn is_empty(&self) -> bool {
        !self.admin && self.baseline.is_empty() && self.workspaces.values().all(RoleSet::is_empty)
    }

    /// Roles held on a scope, `None` for workspaces which are not mapped.
    pub fn roles(&self, scope: &Scope) -> Option<&RoleSet> {
        match scope {
            Scope::Baseline => Some(&self.baseline),
            Scope::Workspace(name) => self.workspaces.get(name),
        }
    }

    /// Mutable roles of a scope, mapping the workspace if needed.
    pub fn roles_mut(&mut self, scope: &Scope) -> &mut RoleSet {
        match scope {
            Scope::Baseline => &mut self.baseline,
            Scope::Workspace(name) => self.workspaces.entry(name.clone()).or_default(),
        }
    }

    /// Every scope mentioned by this policy, baseline first.
    pub fn scopes(&self) -> impl Iterator<Item = Scope> + '_ {
        std::iter::once(Scope::Baseline).chain(self.workspaces.keys().cloned().map(Scope::Workspace))
    }

    /// Derived scope list of a reconciliation: the baseline, every workspace of `self`, then
    /// every workspace only mapped by `other`.
    pub fn scopes_with<'a>(&'a self, other: &'a Policy) -> impl Iterator<Item = Scope> + 'a {
        self.scopes().chain(
            other
                .workspaces
                .keys()
                .filter(|name| !self.workspaces.contains_key(*name))
                .cloned()
                .map(Scope::Workspace),
        )
    }

    /// Sort every role set for presentation.
    pub fn sort(&mut self) {
        self.baseline.sort();
        for roles in self.workspaces.values_mut() {
            roles.sort();
        }
    }

    /// Drop workspaces mapped to no roles.
    pub fn prune(&mut self) {
        self.workspaces.retain(|_, roles| !roles.is_empty());
    }
}

impl PartialEq for Policy {
    fn eq(&self, other: &Self) -> bool {
        let empty = RoleSet::new();
        self.principal == other.principal
            && self.admin == other.admin
            && self.scopes_with(other).all(|scope| {
                self.roles(&scope).unwrap_or(&empty) == other.roles(&scope).unwrap_or(&empty)
            })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::{Principal, Role, Scope};

    use super::{Policy, RoleSet};

    #[test]
    fn role_sets_drop_duplicates() {
        let mut set = RoleSet::from([Role::Viewer, Role::Editor, Role::Viewer]);
        assert_eq!(set.len(), 2);
        assert!(!set.insert(Role::Editor));
        assert!(set.insert(Role::Owner));
        assert!(set.remove(&Role::Viewer));
        assert!(!set.remove(&Role::Viewer));
        assert_eq!(set.as_slice(), &[Role::Editor, Role::Owner]);

        let parsed: RoleSet = serde_json::from_str(r#"["owner", "owner", "viewer"]"#).unwrap();
        assert_eq!(parsed.as_slice(), &[Role::Owner, Role::Viewer]);
    }

    #[test]
    fn role_set_equality_ignores_order() {
        let left = RoleSet::from([Role::Viewer, Role::Editor]);
        let right = RoleSet::from([Role::Editor, Role::Viewer]);
        assert_eq!(left, right);
        assert_ne!(left, RoleSet::from([Role::Editor]));
    }

    #[test]
    fn set_operations_keep_left_order() {
        let left = RoleSet::from([Role::Owner, Role::Viewer, Role::Operator]);
        let right = RoleSet::from([Role::Operator, Role::Editor]);
        assert_eq!(left.difference(&right).as_slice(), &[Role::Owner, Role::Viewer]);
        assert_eq!(left.intersection(&right).as_slice(), &[Role::Operator]);
        assert_eq!(
            left.union(&right).as_slice(),
            &[Role::Owner, Role::Viewer, Role::Operator, Role::Editor]
        );
    }

    #[test]
    fn derived_scope_list() {
        let principal = Principal::user("jane");
        let mut desired = Policy::empty(principal.clone());
        desired.roles_mut(&Scope::workspace("prod")).insert(Role::Viewer);
        desired.roles_mut(&Scope::workspace("dev")).insert(Role::Editor);

        let mut actual = Policy::empty(principal);
        actual.roles_mut(&Scope::workspace("dev")).insert(Role::Viewer);
        actual.roles_mut(&Scope::workspace("staging")).insert(Role::Owner);

        let scopes: Vec<_> = desired.scopes_with(&actual).collect();
        assert_eq!(
            scopes,
            vec![
                Scope::Baseline,
                Scope::workspace("dev"),
                Scope::workspace("prod"),
                Scope::workspace("staging"),
            ]
        );
    }

    #[test]
    fn empty_workspaces_do_not_affect_equality() {
        let principal = Principal::service_account("abc");
        let mut left = Policy::empty(principal.clone());
        left.workspaces.insert("dev".into(), RoleSet::new());
        let right = Policy {
            workspaces: BTreeMap::new(),
            ..Policy::empty(principal)
        };

        assert!(left.is_empty());
        assert_eq!(left, right);

        left.prune();
        assert!(left.workspaces.is_empty());
    }
}
