//! `stvd plan` — Display the deployment order before starting anything.

use std::fmt::Write as _;
use std::path::Path;

use clap::Args;
use stevedore_compose::ComposeDocument;
use stevedore_compose::graph::deployment_order;
use stevedore_runbook::{Verb, container_name, orchestration};

use crate::commands::GlobalArgs;
use crate::context::Project;
use crate::output::{count, rule};

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {}

fn joined<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders the plan: services in start order with their container names,
/// ports and volumes, followed by the command that starts them.
///
/// # Errors
///
/// Returns an error if the dependency graph has a cycle.
pub fn build_plan(
    document: &ComposeDocument,
    file: &Path,
    project: &str,
) -> anyhow::Result<String> {
    let order = deployment_order(document)?;
    let title = format!("Deployment plan for: {} (project {project})", file.display());

    let mut out = String::new();
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", rule(&title));
    let _ = writeln!(out);

    for (step, name) in order.iter().enumerate() {
        let Some(service) = document.service(name) else {
            continue;
        };
        let _ = writeln!(out, "  {}. {name}", step + 1);
        let image = &service.image;
        match (image.tag(), image.effective_tag()) {
            (None, Some(implied)) => {
                let _ = writeln!(out, "       image:     {image} (tag {implied})");
            }
            _ => {
                let _ = writeln!(out, "       image:     {image}");
            }
        }
        let _ = writeln!(out, "       container: {}", container_name(project, service));
        if !service.ports.is_empty() {
            let _ = writeln!(out, "       ports:     {}", joined(&service.ports));
        }
        if !service.volumes.is_empty() {
            let _ = writeln!(out, "       volumes:   {}", joined(&service.volumes));
        }
        if !service.depends_on.is_empty() {
            let _ = writeln!(out, "       after:     {}", service.depends_on.join(", "));
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "  {} will be started with:", count(order.len(), "service"));
    let _ = writeln!(out, "    {}", orchestration(file, Some(project), Verb::Up));
    Ok(out)
}

/// Executes the `plan` command.
///
/// # Errors
///
/// Returns an error if loading fails or no project name can be derived.
pub fn execute(global: &GlobalArgs, _args: &PlanArgs) -> anyhow::Result<()> {
    let project = Project::load(global)?;
    let name = project.name()?;
    print!("{}", build_plan(&project.document, project.file(), &name)?);
    Ok(())
}
