//! `stvd resolve` — Print services with placeholders substituted.

use clap::Args;
use stevedore_compose::resolve;

use crate::commands::GlobalArgs;
use crate::context::Project;
use crate::output::{self, Format};

/// Arguments for the `resolve` command.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Yaml)]
    pub format: Format,

    /// Print values of password, token and similar variables.
    #[arg(long)]
    pub show_secrets: bool,
}

/// Executes the `resolve` command.
///
/// # Errors
///
/// Returns an error if loading fails or a placeholder has no value.
pub fn execute(global: &GlobalArgs, args: &ResolveArgs) -> anyhow::Result<()> {
    let project = Project::load(global)?;
    let vars = project.variables()?;
    let mut resolved = resolve(&project.document, &vars)?;
    if !args.show_secrets {
        output::mask_secrets(&mut resolved);
    }
    print!("{}", output::serialize(&resolved, args.format)?);
    Ok(())
}
