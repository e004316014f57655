//! CLI command definitions and dispatch.

pub mod backup;
pub mod check;
pub mod fmt;
pub mod lifecycle;
pub mod plan;
pub mod resolve;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use stevedore_common::config::StevedoreConfig;
use stevedore_compose::load::find_compose_file;
use stevedore_compose::parser::entry::validate_env_key;

/// Stevedore — check, resolve and operate compose service definitions.
#[derive(Parser, Debug)]
#[command(name = "stvd", version, about, long_about = None)]
pub struct Cli {
    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Where the document and its variables come from.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Compose file (default: compose.yaml, compose.yml, docker-compose.yaml
    /// or docker-compose.yml in the current directory).
    #[arg(short, long, global = true, env = "STVD_FILE")]
    pub file: Option<PathBuf>,

    /// Env file merged beneath the process environment (default: `.env`
    /// beside the compose file, if present).
    #[arg(long, global = true, env = "STVD_ENV_FILE")]
    pub env_file: Option<PathBuf>,

    /// Set a variable for placeholder resolution; overrides everything else.
    #[arg(
        short,
        long = "env",
        global = true,
        value_name = "KEY=VALUE",
        value_parser = parse_key_val
    )]
    pub env: Vec<(String, String)>,

    /// Ignore the process environment when resolving placeholders.
    ///
    /// `${VAR}` references inside the env file itself are still expanded
    /// while it is read, from the process environment first and then from
    /// earlier lines of the file; single-quote a value to keep it literal.
    #[arg(long, global = true)]
    pub no_process_env: bool,

    /// Project name (default: the document's `name:`, else the directory).
    #[arg(short, long, global = true, env = "STVD_PROJECT_NAME")]
    pub project_name: Option<String>,

    /// Emit logs as JSON on stderr.
    #[arg(long, global = true)]
    pub log_json: bool,
}

impl GlobalArgs {
    /// Builds the run configuration, discovering the compose file in the
    /// current directory when none was given.
    ///
    /// # Errors
    ///
    /// Returns an error if no compose file is given and none is found.
    pub fn to_config(&self) -> anyhow::Result<StevedoreConfig> {
        let compose_file = match &self.file {
            Some(file) => file.clone(),
            None => find_compose_file(Path::new("."))?,
        };
        Ok(StevedoreConfig {
            env_file: self.env_file.clone(),
            inherit_process_env: !self.no_process_env,
            overrides: self.env.clone(),
            project_name: self.project_name.clone(),
            ..StevedoreConfig::new(compose_file)
        })
    }
}

/// Parses a `KEY=VALUE` command-line assignment.
fn parse_key_val(text: &str) -> Result<(String, String), String> {
    let (key, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got \"{text}\""))?;
    validate_env_key(key).map_err(|e| e.message)?;
    Ok((key.to_string(), value.to_string()))
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse and validate the compose file.
    Check(check::CheckArgs),
    /// Print every service with placeholders substituted.
    Resolve(resolve::ResolveArgs),
    /// Print or rewrite the compose file in canonical form.
    Fmt(fmt::FmtArgs),
    /// Show the deployment order and the command that starts it.
    Plan(plan::PlanArgs),
    /// Print the command that starts the services.
    Up(lifecycle::LifecycleArgs),
    /// Print the command that stops and removes the services.
    Down(lifecycle::LifecycleArgs),
    /// Print the mongodump command for a database service.
    Dump(backup::DumpArgs),
    /// Print the mongorestore command for a database service.
    Restore(backup::RestoreArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let Cli { global, command } = cli;
    match command {
        Command::Check(args) => check::execute(&global, &args),
        Command::Resolve(args) => resolve::execute(&global, &args),
        Command::Fmt(args) => fmt::execute(&global, &args),
        Command::Plan(args) => plan::execute(&global, &args),
        Command::Up(args) => lifecycle::execute(&global, &args, stevedore_runbook::Verb::Up),
        Command::Down(args) => lifecycle::execute(&global, &args, stevedore_runbook::Verb::Down),
        Command::Dump(args) => backup::execute_dump(&global, &args),
        Command::Restore(args) => backup::execute_restore(&global, &args),
    }
}
