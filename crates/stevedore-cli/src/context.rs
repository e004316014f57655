//! Loading the compose document and the variables it is resolved against.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use stevedore_common::config::StevedoreConfig;
use stevedore_compose::load::load_file;
use stevedore_compose::{ComposeDocument, ServiceDescriptor};

use crate::commands::GlobalArgs;

/// A loaded, validated document together with its run configuration.
#[derive(Debug)]
pub struct Project {
    /// Where the document and variables come from.
    pub config: StevedoreConfig,
    /// The parsed document.
    pub document: ComposeDocument,
}

impl Project {
    /// Loads the document named by the global options.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be found, read, or parsed.
    pub fn load(global: &GlobalArgs) -> anyhow::Result<Self> {
        let config = global.to_config()?;
        let document = load_file(&config.compose_file)
            .with_context(|| format!("in {}", config.compose_file.display()))?;
        Ok(Self { config, document })
    }

    /// The compose file path as given or discovered.
    pub fn file(&self) -> &Path {
        &self.config.compose_file
    }

    /// Project name: the explicit option, else the document's `name:`,
    /// else the compose directory's name.
    ///
    /// # Errors
    ///
    /// Returns an error if no name can be derived.
    pub fn name(&self) -> anyhow::Result<String> {
        if let Some(name) = &self.config.project_name {
            return Ok(name.clone());
        }
        let dir = absolute_dir(self.config.project_dir());
        Ok(stevedore_runbook::project_name(&self.document, &dir)?)
    }

    /// Looks up a service, failing with the list of known names.
    ///
    /// # Errors
    ///
    /// Returns an error if the document declares no such service.
    pub fn service(&self, name: &str) -> anyhow::Result<&ServiceDescriptor> {
        self.document.service(name).ok_or_else(|| {
            let known: Vec<&str> =
                self.document.services.iter().map(|s| s.name.as_str()).collect();
            anyhow::anyhow!("no service named \"{name}\" (declared: {})", known.join(", "))
        })
    }

    /// Variables for placeholder resolution, merged by precedence.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named env file is missing or any
    /// env file cannot be parsed.
    pub fn variables(&self) -> anyhow::Result<BTreeMap<String, String>> {
        load_variables(&self.config)
    }
}

fn absolute_dir(dir: &Path) -> PathBuf {
    std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf())
}

/// Reads `KEY=VALUE` pairs from an env file.
///
/// dotenvy expands `${VAR}` in unquoted and double-quoted values as it
/// reads, looking in the process environment before earlier lines of the
/// file, regardless of `inherit_process_env`. Single-quoted values are
/// taken literally.
fn read_env_file(path: &Path) -> anyhow::Result<Vec<(String, String)>> {
    let entries = dotenvy::from_path_iter(path)
        .with_context(|| format!("failed to read env file {}", path.display()))?;
    entries
        .map(|entry| entry.with_context(|| format!("failed to parse env file {}", path.display())))
        .collect()
}

/// Merges variable layers; later layers win.
pub fn merge_variables<F, P>(
    file: F,
    process: P,
    overrides: &[(String, String)],
) -> BTreeMap<String, String>
where
    F: IntoIterator<Item = (String, String)>,
    P: IntoIterator<Item = (String, String)>,
{
    let mut vars: BTreeMap<String, String> = file.into_iter().collect();
    vars.extend(process);
    vars.extend(overrides.iter().cloned());
    vars
}

/// Collects variables with precedence `--env` > process environment >
/// env file.
///
/// # Errors
///
/// Returns an error if an explicitly named env file is missing or an env
/// file cannot be parsed.
pub fn load_variables(config: &StevedoreConfig) -> anyhow::Result<BTreeMap<String, String>> {
    let env_file = config.effective_env_file();
    let file_vars = if env_file.is_file() {
        tracing::debug!(path = %env_file.display(), "reading env file");
        read_env_file(&env_file)?
    } else if config.env_file.is_some() {
        anyhow::bail!("env file not found: {}", env_file.display());
    } else {
        Vec::new()
    };

    let process_vars: Vec<(String, String)> = if config.inherit_process_env {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    } else {
        Vec::new()
    };

    tracing::debug!(
        file = file_vars.len(),
        process = process_vars.len(),
        overrides = config.overrides.len(),
        "merging variables"
    );
    Ok(merge_variables(file_vars, process_vars, &config.overrides))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn merge_precedence() {
        let vars = merge_variables(
            pairs(&[("A", "file"), ("B", "file"), ("C", "file")]),
            pairs(&[("B", "process"), ("C", "process")]),
            &pairs(&[("C", "flag")]),
        );
        assert_eq!(vars["A"], "file");
        assert_eq!(vars["B"], "process");
        assert_eq!(vars["C"], "flag");
    }

    #[test]
    fn load_reads_env_file_beside_compose_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(".env"),
            "# credentials\nMONGOUSER=admin\nMONGOPASSWORD=\"s3 cret\"\n",
        )
        .expect("write");
        let config = StevedoreConfig {
            inherit_process_env: false,
            overrides: pairs(&[("MONGOUSER", "root")]),
            ..StevedoreConfig::new(dir.path().join("docker-compose.yml"))
        };

        let vars = load_variables(&config).expect("should load");
        assert_eq!(vars.get("MONGOUSER").map(String::as_str), Some("root"));
        assert_eq!(vars.get("MONGOPASSWORD").map(String::as_str), Some("s3 cret"));
        assert_eq!(vars.len(), 2);
    }

    #[test]
    fn env_file_references_expand_from_earlier_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(".env"),
            "STVD_TEST_MONGO_HOST=db\n\
             MONGO_URL=mongodb://${STVD_TEST_MONGO_HOST}:27017\n\
             MONGO_TEMPLATE='mongodb://${STVD_TEST_MONGO_HOST}'\n",
        )
        .expect("write");
        let config = StevedoreConfig {
            inherit_process_env: false,
            ..StevedoreConfig::new(dir.path().join("docker-compose.yml"))
        };

        let vars = load_variables(&config).expect("should load");
        assert_eq!(vars["MONGO_URL"], "mongodb://db:27017");
        assert_eq!(vars["MONGO_TEMPLATE"], "mongodb://${STVD_TEST_MONGO_HOST}");
        assert!(!vars.contains_key("PATH"));
    }

    #[test]
    fn missing_default_env_file_is_fine() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = StevedoreConfig {
            inherit_process_env: false,
            ..StevedoreConfig::new(dir.path().join("docker-compose.yml"))
        };
        assert!(load_variables(&config).expect("should load").is_empty());
    }

    #[test]
    fn missing_explicit_env_file_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = StevedoreConfig {
            env_file: Some(dir.path().join("prod.env")),
            inherit_process_env: false,
            ..StevedoreConfig::new(dir.path().join("docker-compose.yml"))
        };
        let err = load_variables(&config).unwrap_err();
        assert!(err.to_string().contains("not found"), "got: {err}");
    }
}
