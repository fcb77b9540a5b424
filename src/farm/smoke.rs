//! End-to-end smoke test: a client image compiles through a running host.

use std::thread;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use super::Farm;
use crate::arch::Arch;
use crate::images::Role;
use crate::toolchain::Docker;

/// Path of the client build script inside client images.
const CLIENT_TEST_SCRIPT: &str = "/scripts/build-cjson.sh";

/// Kills the host container when dropped.
struct HostGuard<'a, 'r> {
    docker: &'a Docker<'r>,
    service: &'a str,
}

impl Drop for HostGuard<'_, '_> {
    fn drop(&mut self) {
        if let Err(err) = self.docker.kill_running(self.service) {
            warn!("failed to stop {}: {err}", self.service);
        }
    }
}

impl Farm<'_> {
    /// Bring up the host service of `host_arch` (default: this machine's
    /// architecture), run the client build script in the `client_arch`
    /// image and stop the host again, whatever the outcome.
    pub fn smoke_test(
        &self,
        distro: &str,
        client_arch: &str,
        version: &str,
        host_arch: Option<&str>,
    ) -> Result<()> {
        let distro = self.distro(distro)?;
        let client = distro.compiler_arch(client_arch)?;
        let host = match host_arch {
            Some(arch) => distro.host_arch(arch)?,
            None => {
                let current = Arch::current()
                    .context("unknown architecture for this machine, pass --host-arch")?;
                distro.host_arch(current.as_str())?
            }
        };
        distro.ensure_pair(host, client)?;

        let compose = self.layout().compose_file(distro);
        if !compose.is_file() {
            bail!(
                "{} not found, render {} first",
                compose.display(),
                distro.name()
            );
        }

        let docker = self.docker();
        let service = format!("host-{}", host.slug());
        docker
            .kill_running(&service)
            .with_context(|| format!("stopping stale {service}"))?;
        docker
            .compose_up(&compose, &service)
            .with_context(|| format!("starting {service}"))?;
        let _guard = HostGuard {
            docker: &docker,
            service: &service,
        };

        thread::sleep(self.config.smoke_test_delay);

        let image = self
            .config
            .images
            .image_tag(Role::Client, distro, client, version);
        info!("Testing {} against {}", image, service);
        docker
            .run(&image, client, &["sh", CLIENT_TEST_SCRIPT])
            .with_context(|| format!("running {CLIENT_TEST_SCRIPT} in {image}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::farm::tests::farm_in;
    use crate::toolchain::fake::FakeRunner;
    use tempfile::TempDir;

    #[test]
    fn test_smoke_test_sequence() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::new().output("docker ps", "c0ffee");
        let farm = farm_in(&temp, &runner);
        farm.render("1.0", Some("archlinux")).unwrap();

        farm.smoke_test("archlinux", "arm/v7", "1.0", Some("amd64"))
            .unwrap();

        let compose = temp.path().join("archlinux/docker-compose.yml");
        assert_eq!(
            runner.lines(),
            vec![
                "docker ps --filter name=host-amd64 --format {{.ID}}".to_string(),
                "docker kill c0ffee".to_string(),
                format!("docker-compose -f {} up -d host-amd64", compose.display()),
                "docker run -t --platform linux/arm/v7 \
                 elijahru/tmp:build-farm-client--archlinux--arm32v7--1.0 \
                 sh /scripts/build-cjson.sh"
                    .to_string(),
                "docker ps --filter name=host-amd64 --format {{.ID}}".to_string(),
                "docker kill c0ffee".to_string(),
            ]
        );
    }

    #[test]
    fn test_host_killed_when_client_fails() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::new()
            .output("docker ps", "c0ffee")
            .fail("docker run", 2);
        let farm = farm_in(&temp, &runner);
        farm.render("1.0", Some("alpine:3.12")).unwrap();

        let err = farm
            .smoke_test("alpine:3.12", "arm64/v8", "1.0", Some("amd64"))
            .unwrap_err();

        assert!(err.to_string().contains("build-cjson.sh"));
        let lines = runner.lines();
        assert_eq!(lines.last().unwrap(), "docker kill c0ffee");
    }

    #[test]
    fn test_unrendered_distro_is_an_error() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::new();
        let farm = farm_in(&temp, &runner);

        assert!(farm
            .smoke_test("debian:buster", "amd64", "1.0", Some("amd64"))
            .is_err());
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_unsupported_pair_is_rejected() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::new();
        let farm = farm_in(&temp, &runner);

        let err = farm
            .smoke_test("debian:buster", "amd64", "1.0", Some("s390x"))
            .unwrap_err();
        assert!(err.to_string().contains("no amd64 compiler"));
    }
}
