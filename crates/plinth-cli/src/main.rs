//! `plinthctl`: operator commands for the Plinth control plane.
//!
//! Reads `plinth.toml` (or the path given with `--config`) and `PLINTH_*`
//! environment variables, opens the catalog and the tenant data directory,
//! runs one command and prints its result as JSON.
//!
//! # Usage
//!
//! ```
//! plinthctl member add --organization <ORG> --user <USER>
//! plinthctl --principal <USER> project create --organization <ORG> --name Storefront
//! plinthctl --principal <USER> reconcile <PROJECT>
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use plinth_core::{
  project::{Principal, Role},
  request::CreateProject,
};
use plinth_service::{Services, Settings};
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "plinthctl", author, version, about = "Plinth control-plane operator tool")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "plinth.toml", global = true)]
  config: PathBuf,

  /// User the command acts as.
  #[arg(long, env = "PLINTH_PRINCIPAL", global = true)]
  principal: Option<Uuid>,

  /// Organization role of the acting user.
  #[arg(long, default_value = "owner", global = true)]
  role: Role,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Organization membership.
  #[command(subcommand)]
  Member(MemberCommand),

  /// Project lifecycle.
  #[command(subcommand)]
  Project(ProjectCommand),

  /// List every tenant database in the data directory.
  Databases,

  /// List a project's tables.
  Tables {
    project: Uuid,

    /// Report the engine's view (with size estimates) instead of the catalog.
    #[arg(long)]
    physical: bool,
  },

  /// Compare a project's catalog with its database. Read-only.
  Reconcile { project: Uuid },
}

#[derive(Subcommand)]
enum MemberCommand {
  Add {
    #[arg(long)]
    organization: Uuid,
    #[arg(long)]
    user:         Uuid,
  },
}

#[derive(Subcommand)]
enum ProjectCommand {
  /// Register a project and provision its database.
  Create {
    #[arg(long)]
    organization: Uuid,
    #[arg(long)]
    name:         String,
  },
  List {
    #[arg(long)]
    organization: Uuid,
  },
  /// Delete a project and drop its database. Irreversible.
  Drop { project: Uuid },
}

impl Cli {
  fn principal(&self) -> anyhow::Result<Principal> {
    let id = self.principal.context("this command needs --principal (or PLINTH_PRINCIPAL)")?;
    Ok(Principal::new(id, self.role))
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let settings = Settings::load(&cli.config)
    .with_context(|| format!("failed to load settings from {:?}", cli.config))?;
  let services = Services::open(&settings)
    .await
    .with_context(|| format!("failed to open catalog at {:?}", settings.catalog_path))?;

  match &cli.command {
    Command::Member(MemberCommand::Add { organization, user }) => {
      services.add_organization_member(*organization, *user).await?;
      print_json(&serde_json::json!({ "organization": organization, "user": user }))
    }
    Command::Project(ProjectCommand::Create { organization, name }) => {
      let request = CreateProject { organization_id: *organization, name: name.clone() };
      let created = services.create_project(&cli.principal()?, request).await?;
      if created.seed.skipped > 0 {
        tracing::warn!(skipped = created.seed.skipped, "some seed statements were skipped");
      }
      print_json(&created)
    }
    Command::Project(ProjectCommand::List { organization }) => {
      print_json(&services.list_projects(&cli.principal()?, *organization).await?)
    }
    Command::Project(ProjectCommand::Drop { project }) => {
      services.delete_project(&cli.principal()?, *project).await?;
      print_json(&serde_json::json!({ "deleted": project }))
    }
    Command::Databases => print_json(&services.databases().await?),
    Command::Tables { project, physical: false } => {
      print_json(&services.list_tables(&cli.principal()?, *project).await?)
    }
    Command::Tables { project, physical: true } => {
      print_json(&services.physical_tables(&cli.principal()?, *project).await?)
    }
    Command::Reconcile { project } => {
      let drift = services.reconcile(&cli.principal()?, *project).await?;
      if !drift.is_clean() {
        tracing::warn!("catalog and database disagree");
      }
      print_json(&drift)
    }
  }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  let text = serde_json::to_string_pretty(value).context("failed to serialise output")?;
  println!("{text}");
  Ok(())
}

#[cfg(test)]
mod tests {
  use clap::CommandFactory;

  use super::*;

  #[test]
  fn command_tree_is_well_formed() { Cli::command().debug_assert(); }

  #[test]
  fn global_flags_follow_the_subcommand() {
    let (org, user) = (Uuid::new_v4(), Uuid::new_v4());
    let (org_arg, user_arg) = (org.to_string(), user.to_string());
    let cli = Cli::try_parse_from([
      "plinthctl",
      "project",
      "create",
      "--organization",
      org_arg.as_str(),
      "--name",
      "Storefront",
      "--principal",
      user_arg.as_str(),
      "--role",
      "developer",
    ])
    .unwrap();

    let principal = cli.principal().unwrap();
    assert_eq!(principal, Principal::new(user, Role::Developer));
    assert!(matches!(
      cli.command,
      Command::Project(ProjectCommand::Create { organization, .. }) if organization == org
    ));
  }
}
