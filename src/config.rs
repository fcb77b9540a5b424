//! `build-farm.toml` loading.
//!
//! Every section and key is optional. Relative paths resolve against the
//! directory holding the config file, or the project directory when no file
//! exists.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::images::ImageNames;

pub const CONFIG_FILE_NAME: &str = "build-farm.toml";

const DEFAULT_TEMPLATES_DIR: &str = "templates";
const DEFAULT_OUTPUT_DIR: &str = ".";
const DEFAULT_WORKFLOWS_DIR: &str = ".github/workflows";
const DEFAULT_README: &str = "README.md";
const DEFAULT_PROJECT_NAME: &str = "build-farm";
const DEFAULT_REPO: &str = "elijahr/build-farm";
const DEFAULT_DOCKER: &str = "docker";
const DEFAULT_COMPOSE: &str = "docker-compose";
const DEFAULT_SMOKE_TEST_DELAY_SECS: u64 = 5;

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// File this configuration was read from, if any.
    pub source: Option<PathBuf>,
    pub templates_dir: PathBuf,
    pub output_dir: PathBuf,
    pub workflows_dir: PathBuf,
    pub readme: PathBuf,
    pub project_name: String,
    pub repo: String,
    pub images: ImageNames,
    pub docker: String,
    pub compose: String,
    pub smoke_test_delay: Duration,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigToml {
    #[serde(default)]
    project: ProjectToml,
    #[serde(default)]
    images: ImageNames,
    #[serde(default)]
    toolchain: ToolchainToml,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectToml {
    templates_dir: Option<String>,
    output_dir: Option<String>,
    workflows_dir: Option<String>,
    readme: Option<String>,
    project_name: Option<String>,
    repo: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ToolchainToml {
    docker: Option<String>,
    compose: Option<String>,
    smoke_test_delay_secs: Option<u64>,
}

impl Config {
    /// Defaults rooted at `project_dir`.
    pub fn defaults(project_dir: &Path) -> Self {
        Self::from_toml(project_dir, None, ConfigToml::default())
    }

    /// Load `explicit` if given, else `<project_dir>/build-farm.toml` if it
    /// exists, else defaults. An explicit path that does not exist is an error.
    pub fn load(project_dir: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = project_dir.join(CONFIG_FILE_NAME);
                if !candidate.is_file() {
                    return Ok(Self::defaults(project_dir));
                }
                candidate
            }
        };

        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let parsed: ConfigToml = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;

        let base = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => project_dir.to_path_buf(),
        };
        let config = Self::from_toml(&base, Some(path), parsed);
        config.validate()?;
        Ok(config)
    }

    fn from_toml(base: &Path, source: Option<PathBuf>, parsed: ConfigToml) -> Self {
        let project = parsed.project;
        let toolchain = parsed.toolchain;
        let path = |value: Option<String>, default: &str| {
            resolve_path(base, value.as_deref().unwrap_or(default))
        };

        Self {
            source,
            templates_dir: path(project.templates_dir, DEFAULT_TEMPLATES_DIR),
            output_dir: path(project.output_dir, DEFAULT_OUTPUT_DIR),
            workflows_dir: path(project.workflows_dir, DEFAULT_WORKFLOWS_DIR),
            readme: path(project.readme, DEFAULT_README),
            project_name: project
                .project_name
                .unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string()),
            repo: project.repo.unwrap_or_else(|| DEFAULT_REPO.to_string()),
            images: parsed.images,
            docker: toolchain.docker.unwrap_or_else(|| DEFAULT_DOCKER.to_string()),
            compose: toolchain
                .compose
                .unwrap_or_else(|| DEFAULT_COMPOSE.to_string()),
            smoke_test_delay: Duration::from_secs(
                toolchain
                    .smoke_test_delay_secs
                    .unwrap_or(DEFAULT_SMOKE_TEST_DELAY_SECS),
            ),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("project.project_name", &self.project_name),
            ("project.repo", &self.repo),
            ("images.host_pkg", &self.images.host_pkg),
            ("images.client_pkg", &self.images.client_pkg),
            ("images.tmp_pkg", &self.images.tmp_pkg),
            ("toolchain.docker", &self.docker),
            ("toolchain.compose", &self.compose),
        ];
        for (key, value) in checks {
            if value.trim().is_empty() {
                return Err(self.invalid(format!("{key} must not be empty")));
            }
        }
        Ok(())
    }

    fn invalid(&self, detail: String) -> ConfigError {
        ConfigError::Invalid {
            path: self.source.clone().unwrap_or_default(),
            detail,
        }
    }
}

fn resolve_path(base: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else if path == "." {
        base.to_path_buf()
    } else {
        base.join(candidate)
    }
}
