//! Preflight checks for toolchain operations.
//!
//! Verifies the container tools are on `PATH` before any build, push or
//! smoke test starts, so a missing binary fails up front instead of halfway
//! through a matrix.
//!
//! # Example
//!
//! ```rust
//! use build_farm::preflight::{command_exists, check_required_tools};
//!
//! if !command_exists("docker") {
//!     println!("docker not installed");
//! }
//!
//! let tools = &[("docker", "docker"), ("docker-compose", "docker-compose")];
//! if let Err(e) = check_required_tools(tools) {
//!     eprintln!("{}", e);
//! }
//! ```

use anyhow::{bail, Result};

/// Check if a command exists on the host system.
///
/// Only the first word is looked up, so `"docker compose"` checks `docker`.
pub fn command_exists(cmd: &str) -> bool {
    cmd.split_whitespace()
        .next()
        .is_some_and(|program| which::which(program).is_ok())
}

/// Check that specific tools are available.
///
/// Each tuple is (command, package to install). Reports every missing tool
/// at once.
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<()> {
    let missing: Vec<_> = tools
        .iter()
        .filter(|(tool, _)| !command_exists(tool))
        .collect();

    if !missing.is_empty() {
        let msg = missing
            .iter()
            .map(|(t, p)| format!("  {} (install: {})", t, p))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("Missing required host tools:\n{}", msg);
    }

    Ok(())
}

/// Tools needed to build and push images.
pub fn check_build_tools(docker: &str) -> Result<()> {
    check_required_tools(&[(docker, "docker")])
}

/// Tools needed to run the smoke test.
pub fn check_test_tools(docker: &str, compose: &str) -> Result<()> {
    check_required_tools(&[(docker, "docker"), (compose, "docker-compose")])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_exists() {
        assert!(command_exists("sh"));
        assert!(command_exists("sh -c"));
        assert!(!command_exists("definitely_not_a_real_command_12345"));
        assert!(!command_exists("   "));
    }

    #[test]
    fn test_check_required_tools_success() {
        let tools = &[("sh", "dash"), ("cat", "coreutils")];
        assert!(check_required_tools(tools).is_ok());
    }

    #[test]
    fn test_check_required_tools_lists_every_missing_tool() {
        let tools = &[
            ("nonexistent_command_xyz", "fake-package"),
            ("sh", "dash"),
            ("nonexistent_command_abc", "other-package"),
        ];
        let err = check_required_tools(tools).unwrap_err().to_string();
        assert!(err.contains("nonexistent_command_xyz (install: fake-package)"));
        assert!(err.contains("nonexistent_command_abc (install: other-package)"));
        assert!(!err.contains("dash"));
    }
}
