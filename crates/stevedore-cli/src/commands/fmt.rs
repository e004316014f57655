//! `stvd fmt` — Print or rewrite a compose file in canonical form.

use clap::Args;
use stevedore_compose::render;

use crate::commands::GlobalArgs;
use crate::context::Project;

/// Arguments for the `fmt` command.
#[derive(Args, Debug)]
pub struct FmtArgs {
    /// Rewrite the file in place instead of printing it.
    #[arg(long, conflicts_with = "check")]
    pub write: bool,

    /// Fail if the file is not already in canonical form.
    #[arg(long)]
    pub check: bool,
}

/// Executes the `fmt` command.
///
/// # Errors
///
/// Returns an error if the file cannot be loaded or written, or with
/// `--check` if it is not canonical.
pub fn execute(global: &GlobalArgs, args: &FmtArgs) -> anyhow::Result<()> {
    let project = Project::load(global)?;
    let rendered = render(&project.document);
    let path = project.file();

    if !args.write && !args.check {
        print!("{rendered}");
        return Ok(());
    }

    let current = std::fs::read_to_string(path)?;
    if current == rendered {
        tracing::info!(path = %path.display(), "already canonical");
        return Ok(());
    }
    if args.check {
        anyhow::bail!("{} is not in canonical form", path.display());
    }
    std::fs::write(path, &rendered)?;
    println!("Formatted {}", path.display());
    Ok(())
}
