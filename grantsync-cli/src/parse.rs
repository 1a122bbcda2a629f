// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsers for the output of the backend executable.
use grantsync::{
    AssignmentSource, BackendError, GrantRecord, ResourceKind, Role, WorkspaceKind, Workspaces,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

const LIVE_HEADER: &str = "Live Workspaces:";

const DEV_HEADER: &str = "Development Workspaces:";

/// Roles granted on one resource, as printed by `access-control get-roles --json-out`.
#[derive(Debug, Deserialize)]
struct RolesEntry {
    resource_type: ResourceKind,
    #[serde(default)]
    workspace_name: Option<String>,
    #[serde(default)]
    roles_granted: Vec<RoleGranted>,
}

#[derive(Debug, Deserialize)]
struct RoleGranted {
    role: String,
    #[serde(default)]
    assignment_sources: Vec<RoleAssignmentSource>,
}

#[derive(Debug, Deserialize)]
struct RoleAssignmentSource {
    assignment_type: String,
}

/// Flatten the JSON role listing into one record per granted role.
pub fn parse_roles(output: &[u8]) -> Result<Vec<GrantRecord>, BackendError> {
    let entries: Vec<RolesEntry> = serde_json::from_slice(output).map_err(|err| {
        BackendError::Parse(format!(
            "failed to parse role listing: {err}\nGot: {}",
            String::from_utf8_lossy(output)
        ))
    })?;

    let records = entries
        .into_iter()
        .flat_map(|entry| {
            let workspace = match entry.resource_type {
                ResourceKind::Organization => None,
                ResourceKind::Workspace => entry.workspace_name.clone(),
            };
            entry
                .roles_granted
                .into_iter()
                .map(move |granted| GrantRecord {
                    resource: entry.resource_type,
                    workspace: workspace.clone(),
                    role: Role::parse(&granted.role),
                    sources: granted
                        .assignment_sources
                        .iter()
                        .map(|source| AssignmentSource::parse(&source.assignment_type))
                        .collect(),
                })
        })
        .collect();

    Ok(records)
}

/// Parse the workspace listing printed by `workspace list`.
///
/// The listing starts with a live section followed by a development section. Every entry is a
/// workspace name without spaces, indented by at least one space, and the currently selected
/// workspace is marked with a leading `*`. Blank lines are allowed anywhere, any other line makes
/// the whole listing invalid.
pub fn parse_workspaces(output: &str) -> Result<Workspaces, BackendError> {
    static ENTRY_REGEX: Lazy<Regex> = Lazy::new(|| {
        // Unwrap as we checked the regular expression for correctness
        Regex::new(r"^\*? +(\S+)$").unwrap()
    });

    let unexpected = |reason: String| {
        BackendError::Parse(format!(
            "unexpected workspace listing, {reason}\nGot: \"{output}\""
        ))
    };

    let mut workspaces = Workspaces::new();
    let mut section = None;

    for line in output.lines().map(str::trim_end) {
        if line.is_empty() {
            continue;
        }

        match (line, section) {
            (LIVE_HEADER, None) => {
                section = Some(WorkspaceKind::Live);
                continue;
            }
            (DEV_HEADER, Some(WorkspaceKind::Live)) => {
                section = Some(WorkspaceKind::Development);
                continue;
            }
            _ => (),
        }

        let Some(kind) = section else {
            return Err(unexpected(format!("expected '{LIVE_HEADER}' first")));
        };

        let Some(name) = ENTRY_REGEX.captures(line).and_then(|captures| captures.get(1)) else {
            return Err(unexpected(format!("invalid line '{line}'")));
        };

        match kind {
            WorkspaceKind::Live => workspaces.live.insert(name.as_str().to_owned()),
            WorkspaceKind::Development => workspaces.dev.insert(name.as_str().to_owned()),
        };
    }

    if section != Some(WorkspaceKind::Development) {
        return Err(unexpected(format!(
            "expected '{LIVE_HEADER}' and '{DEV_HEADER}' sections"
        )));
    }

    Ok(workspaces)
}
