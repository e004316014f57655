//! `stvd dump` / `stvd restore` — Print the MongoDB dump and restore
//! commands for a database service.

use std::path::PathBuf;

use clap::Args;
use stevedore_common::constants::DEFAULT_DUMP_DIR;
use stevedore_compose::{ComposeDocument, resolve_service};
use stevedore_runbook::{DumpOp, container_name, dump_restore};

use crate::commands::GlobalArgs;
use crate::context::Project;

/// Options shared by `dump` and `restore`.
#[derive(Args, Debug)]
pub struct BackupTarget {
    /// Database service (default: the only service running a `mongo` image).
    #[arg(short, long)]
    pub service: Option<String>,

    /// Host directory, relative to the compose file's directory as written
    /// in its `volumes:`.
    #[arg(short, long, default_value = DEFAULT_DUMP_DIR)]
    pub dir: PathBuf,

    /// Print the password instead of masking it.
    #[arg(long)]
    pub show_secrets: bool,
}

/// Arguments for the `dump` command.
#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Target service and directory.
    #[command(flatten)]
    pub target: BackupTarget,
}

/// Arguments for the `restore` command.
#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Target service and directory.
    #[command(flatten)]
    pub target: BackupTarget,

    /// Drop each collection before restoring it.
    #[arg(long)]
    pub drop: bool,
}

/// Picks the service named on the command line, or the single service
/// whose image repository ends in `mongo`.
fn pick_service<'a>(
    document: &'a ComposeDocument,
    requested: Option<&'a str>,
) -> anyhow::Result<&'a str> {
    if let Some(name) = requested {
        return Ok(name);
    }
    let mut candidates = document.services.iter().filter(|s| {
        let repository = s.image.repository();
        repository.rsplit('/').next() == Some("mongo")
    });
    match (candidates.next(), candidates.next()) {
        (Some(service), None) => Ok(&service.name),
        (None, _) => anyhow::bail!("no service runs a mongo image; pass --service"),
        (Some(_), Some(_)) => anyhow::bail!("several services run a mongo image; pass --service"),
    }
}

fn run(global: &GlobalArgs, target: &BackupTarget, op: DumpOp) -> anyhow::Result<()> {
    let project = Project::load(global)?;
    let name = pick_service(&project.document, target.service.as_deref())?;
    let service = project.service(name)?;
    let resolved = resolve_service(service, &project.variables()?)?;
    let container = container_name(&project.name()?, service);

    let invocation = dump_restore(&resolved, &container, op, &target.dir)?;
    if target.show_secrets {
        println!("{}", invocation.reveal());
    } else {
        println!("{invocation}");
    }
    Ok(())
}

/// Executes the `dump` command.
///
/// # Errors
///
/// Returns an error if the service cannot be chosen or resolved, or no
/// volume covers the directory.
pub fn execute_dump(global: &GlobalArgs, args: &DumpArgs) -> anyhow::Result<()> {
    run(global, &args.target, DumpOp::Dump)
}

/// Executes the `restore` command.
///
/// # Errors
///
/// Returns an error if the service cannot be chosen or resolved, or no
/// volume covers the directory.
pub fn execute_restore(global: &GlobalArgs, args: &RestoreArgs) -> anyhow::Result<()> {
    run(global, &args.target, DumpOp::Restore { drop: args.drop })
}
