// SPDX-License-Identifier: MIT OR Apache-2.0

//! Role vocabulary and its ordering table.
use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Role string reserved for the unscoped admin capability.
pub const ADMIN_ROLE: &str = "admin";

/// A permission level which can be granted to a principal on a scope.
///
/// The four canonical levels carry a strict power order, `viewer < operator < editor < owner`.
/// Roles reported by the backend which are not part of that vocabulary are kept as
/// `Role::Other`: they take part in diffing like any other role but have no defined order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Permission to look at resources.
    Viewer,

    /// Permission to run operational tasks on resources.
    Operator,

    /// Permission to change resources.
    Editor,

    /// Full control over resources, including their access policies.
    Owner,

    /// Role unknown to this crate.
    Other(String),
}

impl Role {
    /// All canonical roles, in order of increasing power.
    pub const CANONICAL: [Role; 4] = [Role::Viewer, Role::Operator, Role::Editor, Role::Owner];

    /// Parse a role string. Unknown strings are preserved as `Role::Other`.
    pub fn parse(value: &str) -> Self {
        match value {
            "viewer" => Role::Viewer,
            "operator" => Role::Operator,
            "editor" => Role::Editor,
            "owner" => Role::Owner,
            other => Role::Other(other.to_owned()),
        }
    }

    /// Position of the role in the power order, `None` for unrecognized roles.
    pub fn power(&self) -> Option<u8> {
        match self {
            Role::Viewer => Some(0),
            Role::Operator => Some(1),
            Role::Editor => Some(2),
            Role::Owner => Some(3),
            Role::Other(_) => None,
        }
    }

    /// Returns `true` if this is one of the four canonical roles.
    pub fn is_canonical(&self) -> bool {
        self.power().is_some()
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Viewer => "viewer",
            Role::Operator => "operator",
            Role::Editor => "editor",
            Role::Owner => "owner",
            Role::Other(value) => value,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl Serialize for Role {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Role::parse(&value))
    }
}

/// Sort roles in order of increasing power, for presentation only.
///
/// Canonical roles are reordered among the positions they already occupy. Unrecognized roles keep
/// their absolute index in the slice, not their order relative to the canonical roles around
/// them: `[owner, custom, viewer]` becomes `[viewer, custom, owner]`. The result is deterministic
/// and never depends on a comparator which would have to treat unknown roles as equal to
/// everything.
pub fn sort_roles(roles: &mut [Role]) {
    let slots: Vec<usize> = roles
        .iter()
        .enumerate()
        .filter(|(_, role)| role.is_canonical())
        .map(|(index, _)| index)
        .collect();

    let mut known: Vec<Role> = slots.iter().map(|index| roles[*index].clone()).collect();
    known.sort_by_key(Role::power);

    for (index, role) in slots.into_iter().zip(known) {
        roles[index] = role;
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{Role, sort_roles};

    fn roles(values: &[&str]) -> Vec<Role> {
        values.iter().map(|value| Role::parse(value)).collect()
    }

    #[test]
    fn canonical_power_order() {
        let powers: Vec<_> = Role::CANONICAL.iter().map(Role::power).collect();
        assert_eq!(powers, vec![Some(0), Some(1), Some(2), Some(3)]);
        assert_eq!(Role::parse("superuser").power(), None);
    }

    #[rstest]
    #[case(&["owner", "viewer", "editor"], &["viewer", "editor", "owner"])]
    #[case(&["owner", "operator", "viewer", "editor"], &["viewer", "operator", "editor", "owner"])]
    #[case(&["owner", "custom", "viewer"], &["viewer", "custom", "owner"])]
    #[case(&["custom", "editor", "viewer"], &["custom", "viewer", "editor"])]
    #[case(&["zeta", "alpha"], &["zeta", "alpha"])]
    #[case(&[], &[])]
    fn sorting(#[case] input: &[&str], #[case] expected: &[&str]) {
        let mut input = roles(input);
        sort_roles(&mut input);
        assert_eq!(input, roles(expected));
    }

    #[test]
    fn string_round_trip_keeps_unknown_roles() {
        let role: Role = serde_json::from_str("\"auditor\"").unwrap();
        assert_eq!(role, Role::Other("auditor".into()));
        assert_eq!(serde_json::to_string(&role).unwrap(), "\"auditor\"");
        assert_eq!(serde_json::to_string(&Role::Editor).unwrap(), "\"editor\"");
    }
}
