// SPDX-License-Identifier: MIT OR Apache-2.0

//! Set difference between desired and actual roles of one scope.
use serde::{Deserialize, Serialize};

use crate::policy::RoleSet;

/// Roles to grant and to revoke so that one scope moves from its actual to its desired state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDiff {
    pub to_grant: RoleSet,
    pub to_revoke: RoleSet,
}

impl RoleDiff {
    /// Returns `true` if the scope is already converged.
    pub fn is_empty(&self) -> bool {
        self.to_grant.is_empty() && self.to_revoke.is_empty()
    }
}

/// Compute `desired \ actual` as roles to grant and `actual \ desired` as roles to revoke.
///
/// Purely set based: role power plays no part, so holding `owner` does not make a desired
/// `viewer` redundant.
pub fn diff(desired: &RoleSet, actual: &RoleSet) -> RoleDiff {
    RoleDiff {
        to_grant: desired.difference(actual),
        to_revoke: actual.difference(desired),
    }
}

/// Admin toggle required to move from `actual` to `desired`, `None` if nothing changes.
pub fn diff_admin(desired: bool, actual: bool) -> Option<bool> {
    (desired != actual).then_some(desired)
}

#[cfg(test)]
mod tests {
    use crate::{Role, RoleSet};

    use super::{RoleDiff, diff, diff_admin};

    #[test]
    fn boundary_cases() {
        let roles = RoleSet::from([Role::Viewer, Role::Editor]);
        let empty = RoleSet::new();

        assert_eq!(diff(&roles, &roles), RoleDiff::default());
        assert_eq!(
            diff(&roles, &empty),
            RoleDiff {
                to_grant: roles.clone(),
                to_revoke: RoleSet::new(),
            }
        );
        assert_eq!(
            diff(&empty, &roles),
            RoleDiff {
                to_grant: RoleSet::new(),
                to_revoke: roles.clone(),
            }
        );
        assert!(diff(&empty, &empty).is_empty());
    }

    #[test]
    fn overlapping_sets() {
        let desired = RoleSet::from([Role::Operator, Role::Editor]);
        let actual = RoleSet::from([Role::Editor, Role::Owner, Role::Other("auditor".into())]);

        let result = diff(&desired, &actual);
        assert_eq!(result.to_grant.as_slice(), &[Role::Operator]);
        assert_eq!(
            result.to_revoke.as_slice(),
            &[Role::Owner, Role::Other("auditor".into())]
        );
    }

    #[test]
    fn power_does_not_short_circuit() {
        let desired = RoleSet::from([Role::Viewer, Role::Owner]);
        let actual = RoleSet::from([Role::Owner]);
        assert_eq!(diff(&desired, &actual).to_grant.as_slice(), &[Role::Viewer]);
    }

    #[test]
    fn admin_toggle() {
        assert_eq!(diff_admin(true, false), Some(true));
        assert_eq!(diff_admin(false, true), Some(false));
        assert_eq!(diff_admin(true, true), None);
        assert_eq!(diff_admin(false, false), None);
    }
}
