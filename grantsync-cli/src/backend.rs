// SPDX-License-Identifier: MIT OR Apache-2.0

//! Permission backend reached through its command line tool.
use std::ffi::OsString;

use grantsync::traits::{RoleMutator, RoleQuery, WorkspaceDirectory};
use grantsync::{
    ADMIN_ROLE, BackendError, GrantRecord, Mutation, Principal, PrincipalKind, Workspaces,
};
use tokio::process::Command;
use tracing::{debug, trace};

use crate::config::BackendConfig;
use crate::parse::{parse_roles, parse_workspaces};

/// Runs the backend executable once per operation.
#[derive(Clone, Debug)]
pub struct CommandBackend {
    config: BackendConfig,
}

impl CommandBackend {
    pub fn new(config: BackendConfig) -> Self {
        Self { config }
    }

    /// Run the executable with `args` and return its standard output.
    ///
    /// A failed spawn or a non-zero exit status turns into `Unavailable`, carrying the command
    /// line together with everything the tool printed.
    async fn run(&self, args: Vec<OsString>) -> Result<Vec<u8>, BackendError> {
        let command_line = format!(
            "{} {}",
            self.config.executable.display(),
            args.iter()
                .map(|arg| arg.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );
        debug!(command = %command_line, "run backend command");

        let output = Command::new(&self.config.executable)
            .args(&args)
            .envs(self.config.command_env())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| {
                BackendError::Unavailable(format!("failed to run '{command_line}': {err}"))
            })?;

        if !output.status.success() {
            return Err(BackendError::Unavailable(format!(
                "'{command_line}' exited with {}\nOutput: {}{}",
                output.status,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr),
            )));
        }

        trace!(command = %command_line, bytes = output.stdout.len(), "backend command finished");
        Ok(output.stdout)
    }
}

fn principal_args(principal: &Principal) -> [OsString; 2] {
    let flag = match principal.kind() {
        PrincipalKind::User => "--user",
        PrincipalKind::ServiceAccount => "--service-account",
    };
    [flag.into(), principal.name().into()]
}

/// Arguments changing a single role assignment.
fn mutation_args(principal: &Principal, mutation: &Mutation) -> Vec<OsString> {
    let (subcommand, role, workspace) = match mutation {
        Mutation::SetAdmin { grant } => (*grant, ADMIN_ROLE, None),
        Mutation::Grant { scope, role } => (true, role.as_str(), scope.workspace_name()),
        Mutation::Revoke { scope, role } => (false, role.as_str(), scope.workspace_name()),
    };
    let subcommand = if subcommand {
        "assign-role"
    } else {
        "unassign-role"
    };

    let mut args: Vec<OsString> = vec![
        "access-control".into(),
        subcommand.into(),
        "--role".into(),
        role.into(),
    ];
    if let Some(workspace) = workspace {
        args.push("--workspace".into());
        args.push(workspace.into());
    }
    args.extend(principal_args(principal));
    args
}

impl RoleQuery for CommandBackend {
    async fn fetch_roles(&self, principal: &Principal) -> Result<Vec<GrantRecord>, BackendError> {
        let mut args: Vec<OsString> =
            vec!["access-control".into(), "get-roles".into(), "--json-out".into()];
        args.extend(principal_args(principal));

        let output = self.run(args).await?;
        parse_roles(&output)
    }
}

impl RoleMutator for CommandBackend {
    async fn apply(&self, principal: &Principal, mutation: &Mutation) -> Result<(), BackendError> {
        self.run(mutation_args(principal, mutation)).await?;
        Ok(())
    }
}

impl WorkspaceDirectory for CommandBackend {
    async fn list_workspaces(&self) -> Result<Workspaces, BackendError> {
        let output = self.run(vec!["workspace".into(), "list".into()]).await?;
        parse_workspaces(&String::from_utf8_lossy(&output))
    }
}
