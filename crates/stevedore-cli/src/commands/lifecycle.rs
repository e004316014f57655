//! `stvd up` / `stvd down` — Print the orchestration command.

use clap::Args;
use stevedore_compose::resolve;
use stevedore_runbook::{Verb, orchestration};

use crate::commands::GlobalArgs;
use crate::context::Project;

/// Arguments for the `up` and `down` commands.
#[derive(Args, Debug)]
pub struct LifecycleArgs {}

/// Executes `up` or `down`.
///
/// `up` resolves every placeholder first so a missing variable is reported
/// here rather than by the orchestration tool.
///
/// # Errors
///
/// Returns an error if loading fails, no project name can be derived, or
/// (for `up`) a placeholder has no value.
pub fn execute(global: &GlobalArgs, _args: &LifecycleArgs, verb: Verb) -> anyhow::Result<()> {
    let project = Project::load(global)?;
    if verb == Verb::Up {
        let _ = resolve(&project.document, &project.variables()?)?;
    }
    let name = project.name()?;
    println!("{}", orchestration(project.file(), Some(&name), verb));
    Ok(())
}
