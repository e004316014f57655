//! `stvd check` — Parse and validate a compose file.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use clap::Args;
use stevedore_compose::ComposeDocument;

use crate::commands::GlobalArgs;
use crate::context::Project;
use crate::output::count;

/// Arguments for the `check` command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Also fail if a placeholder has no value and no default.
    #[arg(long)]
    pub strict: bool,
}

/// A placeholder that would fail resolution.
#[derive(Debug, PartialEq, Eq)]
struct Unresolved<'a> {
    variable: &'a str,
    service: &'a str,
    key: &'a str,
}

/// Placeholders without a default whose variable is absent from `vars`.
fn unresolved<'a>(
    document: &'a ComposeDocument,
    vars: &BTreeMap<String, String>,
) -> Vec<Unresolved<'a>> {
    let mut missing = Vec::new();
    for service in &document.services {
        for entry in &service.environment {
            for placeholder in entry.value.placeholders() {
                if placeholder.fallback.is_none() && !vars.contains_key(&placeholder.name) {
                    missing.push(Unresolved {
                        variable: &placeholder.name,
                        service: &service.name,
                        key: &entry.key,
                    });
                }
            }
        }
    }
    missing
}

fn summary(file: &str, document: &ComposeDocument, missing: &[Unresolved<'_>]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{file}: valid, {}", count(document.services.len(), "service"));
    for service in &document.services {
        let _ = writeln!(
            out,
            "  {}  {}  ({}, {}, {})",
            service.name,
            service.image,
            count(service.environment.len(), "variable"),
            count(service.volumes.len(), "volume"),
            count(service.ports.len(), "port"),
        );
    }
    for m in missing {
        let _ = writeln!(
            out,
            "  warning: ${{{}}} is not set ({}.environment.{})",
            m.variable, m.service, m.key
        );
    }
    out
}

/// Executes the `check` command.
///
/// # Errors
///
/// Returns an error if the file cannot be loaded or fails validation, or
/// with `--strict` if a placeholder cannot be resolved.
pub fn execute(global: &GlobalArgs, args: &CheckArgs) -> anyhow::Result<()> {
    let project = Project::load(global)?;
    let vars = project.variables()?;
    let missing = unresolved(&project.document, &vars);

    print!(
        "{}",
        summary(&project.file().display().to_string(), &project.document, &missing)
    );

    if args.strict && !missing.is_empty() {
        anyhow::bail!("{} without a value", count(missing.len(), "placeholder"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use stevedore_compose::parse_compose;

    use super::*;

    const MONGO: &str = "services:
  mongo:
    image: mongo:7.0.4
    environment:
      - MONGO_INITDB_ROOT_USERNAME=${MONGOUSER}
      - MONGO_INITDB_ROOT_PASSWORD=${MONGOPASSWORD}
      - TZ=${TZ:-UTC}
    volumes:
      - ./mongodb:/data
    ports:
      - 127.0.0.1:27017:27017
";

    #[test]
    fn unresolved_skips_defaults_and_known_variables() {
        let doc = parse_compose(MONGO).expect("should parse");
        let vars = BTreeMap::from([("MONGOUSER".to_string(), "admin".to_string())]);
        let missing = unresolved(&doc, &vars);
        assert_eq!(
            missing,
            vec![Unresolved {
                variable: "MONGOPASSWORD",
                service: "mongo",
                key: "MONGO_INITDB_ROOT_PASSWORD",
            }]
        );
    }

    #[test]
    fn summary_lists_services_and_warnings() {
        let doc = parse_compose(MONGO).expect("should parse");
        let missing = unresolved(&doc, &BTreeMap::new());
        let text = summary("docker-compose.yml", &doc, &missing);
        assert!(text.starts_with("docker-compose.yml: valid, 1 service\n"), "got: {text}");
        assert!(text.contains("mongo  mongo:7.0.4  (3 variables, 1 volume, 1 port)"));
        assert!(text.contains("warning: ${MONGOUSER} is not set"), "got: {text}");
        assert_eq!(text.matches("warning").count(), 2);
    }
}
