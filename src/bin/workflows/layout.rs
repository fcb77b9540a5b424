use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use build_farm::config::CONFIG_FILE_NAME;

/// Project directory: `--project-dir` if given, else the nearest ancestor of
/// the working directory holding a config file or a `templates/` tree, else
/// the working directory itself.
pub(crate) fn locate_project_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return dir
            .canonicalize()
            .with_context(|| format!("resolving project directory '{}'", dir.display()));
    }

    let cwd = env::current_dir().context("reading current directory")?;
    for candidate in cwd.ancestors() {
        if candidate.join(CONFIG_FILE_NAME).is_file() || candidate.join("templates").is_dir() {
            return Ok(candidate.to_path_buf());
        }
    }
    Ok(cwd)
}
