// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconcile declared access policies against the permission backend.
//!
//! Declarations are read from JSON files, results are printed to stdout as JSON and logs go to
//! stderr. Set `RUST_LOG` to change the log level, it defaults to `info`.
mod backend;
mod config;
mod parse;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use grantsync::traits::WorkspaceDirectory;
use grantsync::{AssignmentFilter, Declaration, Principal, Reconciler, ReconcilerConfig};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::backend::CommandBackend;
use crate::config::{BackendConfig, DEFAULT_EXECUTABLE};

pub fn setup_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()
        .ok();
}

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Backend executable to invoke.
    #[arg(long, env = "GRANTSYNC_EXECUTABLE", default_value = DEFAULT_EXECUTABLE)]
    executable: PathBuf,

    /// Base URL of the backend service.
    #[arg(long, env = "GRANTSYNC_URL")]
    url: String,

    /// API key used by the backend executable.
    #[arg(long, env = "GRANTSYNC_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Only consider roles assigned directly to the principal.
    #[arg(long, action)]
    direct_only: bool,

    /// Do not check declared workspaces against the workspace listing.
    #[arg(long, action)]
    skip_workspace_check: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the changes an update would make, without applying them.
    Plan {
        #[arg(long, value_name = "FILE")]
        policy: PathBuf,
    },

    /// Declare the access policy of a principal without any grants yet.
    Create {
        #[arg(long, value_name = "FILE")]
        policy: PathBuf,
    },

    /// Converge the grants of a principal to its declaration.
    Update {
        #[arg(long, value_name = "FILE")]
        policy: PathBuf,
    },

    /// Revoke every grant of a principal.
    Delete {
        /// Policy identifier, `user-<id>` or `service-<id>`.
        #[arg(long)]
        id: String,
    },

    /// Print the declaration matching the current grants of a principal.
    Import {
        /// Policy identifier, `user-<id>` or `service-<id>`.
        #[arg(long)]
        id: String,
    },

    /// List the workspaces known to the backend.
    Workspaces,
}

fn read_declaration(path: &Path) -> Result<Declaration> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read declaration {}", path.display()))?;
    let declaration = serde_json::from_slice(&bytes)
        .with_context(|| format!("failed to parse declaration {}", path.display()))?;
    Ok(declaration)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();

    let args = Args::parse();

    let backend = CommandBackend::new(BackendConfig {
        executable: args.executable,
        url: args.url,
        api_key: args.api_key,
    });

    let config = ReconcilerConfig {
        assignment_filter: if args.direct_only {
            AssignmentFilter::DirectOnly
        } else {
            AssignmentFilter::All
        },
        validate_workspaces: !args.skip_workspace_check,
    };

    let mut reconciler = Reconciler::from_config(backend.clone(), backend.clone(), config);

    if matches!(args.command, Command::Create { .. } | Command::Update { .. })
        && !args.skip_workspace_check
    {
        let workspaces = backend
            .list_workspaces()
            .await
            .context("failed to list workspaces")?;
        info!(count = workspaces.len(), "fetched workspaces");
        reconciler = reconciler.with_workspaces(workspaces);
    }

    match args.command {
        Command::Plan { policy } => {
            let desired = read_declaration(&policy)?.to_policy()?;
            let plan = reconciler.plan(&desired).await?;
            for mutation in plan.mutations() {
                info!("would {mutation}");
            }
            print_json(&plan)?;
        }
        Command::Create { policy } => {
            let applied = reconciler.create(&read_declaration(&policy)?).await?;
            print_json(&applied)?;
        }
        Command::Update { policy } => {
            let applied = reconciler.update(&read_declaration(&policy)?).await?;
            print_json(&applied)?;
        }
        Command::Delete { id } => {
            let principal = Principal::from_id(&id)?;
            let applied = reconciler.delete(&principal).await?;
            print_json(&applied)?;
        }
        Command::Import { id } => {
            let imported = reconciler.import(&id).await?;
            print_json(&imported)?;
        }
        Command::Workspaces => {
            let workspaces = backend
                .list_workspaces()
                .await
                .context("failed to list workspaces")?;
            print_json(&workspaces)?;
        }
    }

    Ok(())
}
