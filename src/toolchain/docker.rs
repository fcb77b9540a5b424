//! `docker` and `docker-compose` command lines used by the farm.

use std::path::Path;

use tracing::{info, warn};

use super::{CommandRunner, Invocation};
use crate::arch::Arch;
use crate::error::ToolError;

/// Exit status `docker pull` uses for an image that does not exist yet.
const PULL_NOT_FOUND: i32 = 1;

/// Thin wrapper building docker invocations and handing them to a runner.
pub struct Docker<'r> {
    runner: &'r dyn CommandRunner,
    docker: String,
    compose: String,
}

impl<'r> Docker<'r> {
    pub fn new(runner: &'r dyn CommandRunner, docker: &str, compose: &str) -> Self {
        Self {
            runner,
            docker: docker.to_string(),
            compose: compose.to_string(),
        }
    }

    fn docker(&self) -> Invocation {
        Invocation::new(&self.docker)
    }

    fn manifest(&self) -> Invocation {
        self.docker()
            .env("DOCKER_CLI_EXPERIMENTAL", "enabled")
            .arg("manifest")
    }

    /// `docker pull <image>`. Any failure is an error.
    pub fn pull(&self, image: &str) -> Result<(), ToolError> {
        self.runner.run(&self.docker().args(["pull", image]))
    }

    /// `docker pull <image> --platform linux/<arch>`, tolerating a missing
    /// image. Returns whether the image was pulled.
    pub fn pull_optional(&self, image: &str, arch: Arch) -> Result<bool, ToolError> {
        let inv = self
            .docker()
            .args(["pull", image, "--platform"])
            .arg(arch.platform());
        match self.runner.run(&inv) {
            Ok(()) => Ok(true),
            Err(err) if err.exit_code() == Some(PULL_NOT_FOUND) => {
                warn!("{image} not pulled, building without cache ({err})");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// `docker build` of one image, using the image itself as cache.
    pub fn build(
        &self,
        context: &Path,
        dockerfile: &Path,
        image: &str,
        arch: Arch,
    ) -> Result<(), ToolError> {
        let inv = self
            .docker()
            .arg("build")
            .arg(context.display().to_string())
            .arg("--file")
            .arg(dockerfile.display().to_string())
            .args(["--tag", image, "--cache-from", image, "--platform"])
            .arg(arch.platform())
            .args(["--progress", "plain"]);
        self.runner.run(&inv)
    }

    pub fn push(&self, image: &str) -> Result<(), ToolError> {
        self.runner.run(&self.docker().args(["push", image]))
    }

    /// `docker manifest create --amend`, falling back to a plain create when
    /// the amend exits with status 1. Any other failure is returned.
    pub fn manifest_create(&self, manifest: &str, images: &[String]) -> Result<(), ToolError> {
        let amend = self
            .manifest()
            .args(["create", "--amend", manifest])
            .args(images.iter().cloned());
        match self.runner.run(&amend) {
            Ok(()) => Ok(()),
            Err(err) if err.exit_code() == Some(1) => {
                info!("amend of {manifest} failed ({err}), creating it");
                let create = self
                    .manifest()
                    .args(["create", manifest])
                    .args(images.iter().cloned());
                self.runner.run(&create)
            }
            Err(err) => Err(err),
        }
    }

    pub fn manifest_annotate(&self, manifest: &str, image: &str, arch: Arch) -> Result<(), ToolError> {
        let inv = self
            .manifest()
            .args(["annotate", manifest, image, "--os", "linux"])
            .args(arch.manifest_args());
        self.runner.run(&inv)
    }

    pub fn manifest_push(&self, manifest: &str) -> Result<(), ToolError> {
        self.runner.run(&self.manifest().args(["push", manifest]))
    }

    /// IDs of running containers whose name matches `name`.
    pub fn running(&self, name: &str) -> Result<Vec<String>, ToolError> {
        let inv = self
            .docker()
            .args(["ps", "--filter"])
            .arg(format!("name={name}"))
            .args(["--format", "{{.ID}}"]);
        let out = self.runner.capture(&inv)?;
        Ok(out.split_whitespace().map(str::to_string).collect())
    }

    /// Kill every running container matching `name`.
    pub fn kill_running(&self, name: &str) -> Result<(), ToolError> {
        for id in self.running(name)? {
            self.runner.capture(&self.docker().args(["kill", id.as_str()]))?;
        }
        Ok(())
    }

    /// `docker-compose -f <file> up -d <service>`.
    pub fn compose_up(&self, compose_file: &Path, service: &str) -> Result<(), ToolError> {
        let inv = Invocation::new(&self.compose)
            .arg("-f")
            .arg(compose_file.display().to_string())
            .args(["up", "-d", service]);
        self.runner.run(&inv)
    }

    /// `docker run -t --platform linux/<arch> <image> <command...>`.
    pub fn run(&self, image: &str, arch: Arch, command: &[&str]) -> Result<(), ToolError> {
        let inv = self
            .docker()
            .args(["run", "-t", "--platform"])
            .arg(arch.platform())
            .arg(image)
            .args(command.iter().copied());
        self.runner.run(&inv)
    }
}
