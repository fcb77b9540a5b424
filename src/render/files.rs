//! Output file handling: writing rendered files, copying static build
//! context files and removing generated trees.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;
use walkdir::WalkDir;

use super::TEMPLATE_SUFFIX;
use crate::error::RenderError;

/// Write `content` to `path`, creating parent directories and replacing any existing file.
pub fn write_output(path: &Path, content: &str) -> Result<(), RenderError> {
    let write_err = |source| RenderError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, content).map_err(write_err)?;
    Ok(())
}

/// Copy every non-template file under `src` into `dst`, keeping relative paths.
///
/// A missing `src` copies nothing. Returns the destination paths in walk order.
pub fn copy_static_tree(src: &Path, dst: &Path) -> Result<Vec<PathBuf>, RenderError> {
    let mut copied = Vec::new();
    if !src.is_dir() {
        return Ok(copied);
    }

    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.map_err(|err| RenderError::Read {
            path: src.to_path_buf(),
            source: err.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().contains(TEMPLATE_SUFFIX) {
            continue;
        }

        let Ok(rel) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(rel);
        let write_err = |source| RenderError::Write {
            path: target.clone(),
            source,
        };
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::copy(entry.path(), &target).map_err(write_err)?;
        info!("Copied {} -> {}", entry.path().display(), target.display());
        copied.push(target);
    }

    Ok(copied)
}

/// Remove a generated file or directory. Returns whether anything was removed.
pub fn remove_output(path: &Path) -> Result<bool, RenderError> {
    let remove_err = |source| RenderError::Write {
        path: path.to_path_buf(),
        source,
    };
    if path.is_dir() {
        fs::remove_dir_all(path).map_err(remove_err)?;
    } else if path.exists() || path.is_symlink() {
        fs::remove_file(path).map_err(remove_err)?;
    } else {
        return Ok(false);
    }
    info!("Removed {}", path.display());
    Ok(true)
}
