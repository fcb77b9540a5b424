//! Orchestration over the distribution matrix.
//!
//! [`Farm`] ties the registry, the renderer and the container toolchain
//! together. Every operation is sequential; errors carry context naming the
//! distribution and image involved.

mod smoke;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::arch::Arch;
use crate::config::Config;
use crate::images::Role;
use crate::registry::{Distro, Registry};
use crate::render::context::readme_context;
use crate::render::files::{remove_output, write_output};
use crate::render::plan::{
    copy_static_files, distro_jobs, execute, workflow_job, Layout, README_TEMPLATE,
};
use crate::render::Renderer;
use crate::toolchain::{CommandRunner, Docker};

pub struct Farm<'r> {
    registry: Registry,
    config: Config,
    runner: &'r dyn CommandRunner,
}

impl<'r> Farm<'r> {
    pub fn new(registry: Registry, config: Config, runner: &'r dyn CommandRunner) -> Self {
        Self {
            registry,
            config,
            runner,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn layout(&self) -> Layout {
        Layout::new(&self.config.output_dir, &self.config.workflows_dir)
    }

    fn renderer(&self) -> Renderer {
        Renderer::new(&self.config.templates_dir)
    }

    fn docker(&self) -> Docker<'r> {
        Docker::new(self.runner, &self.config.docker, &self.config.compose)
    }

    fn distro(&self, name: &str) -> Result<&Distro> {
        Ok(self.registry.get(name)?)
    }

    /// One distribution, or all of them in registry order.
    fn selected(&self, distro: Option<&str>) -> Result<Vec<&Distro>> {
        match distro {
            Some(name) => Ok(vec![self.distro(name)?]),
            None => Ok(self.registry.iter().collect()),
        }
    }

    pub fn list_distros(&self) -> Vec<&str> {
        self.registry.names().collect()
    }

    pub fn list_host_archs(&self, distro: &str) -> Result<Vec<Arch>> {
        Ok(self.distro(distro)?.host_archs().to_vec())
    }

    pub fn list_compiler_archs(&self, distro: &str) -> Result<Vec<Arch>> {
        Ok(self.distro(distro)?.compiler_archs().to_vec())
    }

    /// Render every cell of one distribution, or of all of them. Nothing is
    /// written unless every template renders.
    pub fn render(&self, version: &str, distro: Option<&str>) -> Result<Vec<PathBuf>> {
        let distros = self.selected(distro)?;
        let layout = self.layout();

        let mut jobs = Vec::new();
        for distro in &distros {
            let planned = distro_jobs(distro, &self.config.images, &layout, version)
                .with_context(|| format!("planning render of {}", distro.name()))?;
            jobs.extend(planned);
        }

        let mut written = execute(&mut self.renderer(), &jobs).context("rendering templates")?;
        for distro in &distros {
            let copied = copy_static_files(&self.config.templates_dir, distro, &layout)
                .with_context(|| format!("copying build contexts of {}", distro.name()))?;
            written.extend(copied);
        }
        Ok(written)
    }

    /// Render the CI workflow of every distribution.
    pub fn render_github_actions(&self) -> Result<Vec<PathBuf>> {
        let layout = self.layout();
        let jobs = self
            .registry
            .iter()
            .map(|distro| workflow_job(distro, &self.config.images, &layout))
            .collect::<Result<Vec<_>, _>>()?;
        execute(&mut self.renderer(), &jobs).context("rendering CI workflows")
    }

    /// Render the project README from every distribution's context.
    pub fn render_readme(&self) -> Result<PathBuf> {
        let ctx = readme_context(
            &self.registry,
            &self.config.images,
            &self.config.project_name,
            &self.config.repo,
        )?;
        let template = PathBuf::from(README_TEMPLATE);
        let rendered = self
            .renderer()
            .render_to_string(&template, &ctx)
            .context("rendering README")?;
        write_output(&self.config.readme, &rendered)?;
        info!(
            "Rendered {} -> {}",
            template.display(),
            self.config.readme.display()
        );
        Ok(self.config.readme.clone())
    }

    pub fn build_host(&self, distro: &str, arch: &str, version: &str, push: bool) -> Result<()> {
        let distro = self.distro(distro)?;
        let arch = distro.host_arch(arch)?;
        self.render(version, Some(distro.name()))?;
        self.build_image(Role::Host, distro, arch, version, push)
    }

    pub fn build_client(&self, distro: &str, arch: &str, version: &str, push: bool) -> Result<()> {
        let distro = self.distro(distro)?;
        let arch = distro.compiler_arch(arch)?;
        self.render(version, Some(distro.name()))?;
        self.build_image(Role::Client, distro, arch, version, push)
    }

    /// Build every host image and every distinct client image of every
    /// distribution. Each distribution is rendered once.
    pub fn build_all(&self, version: &str, push: bool) -> Result<()> {
        for distro in self.registry.iter() {
            self.render(version, Some(distro.name()))?;
            for host in distro.host_archs() {
                self.build_image(Role::Host, distro, *host, version, push)?;
            }
            for compiler in distro.compiler_archs() {
                self.build_image(Role::Client, distro, *compiler, version, push)?;
            }
        }
        Ok(())
    }

    fn build_image(
        &self,
        role: Role,
        distro: &Distro,
        arch: Arch,
        version: &str,
        push: bool,
    ) -> Result<()> {
        let layout = self.layout();
        let (context, dockerfile) = match role {
            Role::Host => (
                layout.host_build_context(distro),
                layout.host_dockerfile(distro, arch),
            ),
            Role::Client => (
                layout.client_build_context(distro),
                layout.client_dockerfile(distro, arch),
            ),
        };
        let image = self.config.images.image_tag(role, distro, arch, version);
        info!("Building {} image {}", role.as_str(), image);

        let docker = self.docker();
        docker
            .pull_optional(&image, arch)
            .with_context(|| format!("pulling {image}"))?;
        docker
            .build(&context, &dockerfile, &image, arch)
            .with_context(|| format!("building {image}"))?;
        if push {
            docker
                .push(&image)
                .with_context(|| format!("pushing {image}"))?;
        }
        Ok(())
    }

    /// Publish the versioned and simple host manifests.
    pub fn push_host_manifest(&self, distro: &str, version: &str) -> Result<()> {
        let distro = self.distro(distro)?;
        let tags = self.config.images.manifest_tags(Role::Host, distro, version);
        self.push_manifests(Role::Host, distro, version, &tags)
    }

    /// Publish the versioned and simple client manifests.
    pub fn push_client_manifest(&self, distro: &str, version: &str) -> Result<()> {
        let distro = self.distro(distro)?;
        let tags = self
            .config
            .images
            .manifest_tags(Role::Client, distro, version);
        self.push_manifests(Role::Client, distro, version, &tags)
    }

    /// Point the simple host and client manifests at `version`'s images.
    /// Versioned manifests are left alone.
    pub fn tag_latest(&self, distro: &str, version: &str) -> Result<()> {
        let distro = self.distro(distro)?;
        for role in [Role::Host, Role::Client] {
            let tag = self.config.images.simple_manifest_tag(role, distro);
            self.push_manifests(role, distro, version, &[tag])?;
        }
        Ok(())
    }

    fn push_manifests(
        &self,
        role: Role,
        distro: &Distro,
        version: &str,
        tags: &[String],
    ) -> Result<()> {
        let archs = match role {
            Role::Host => distro.host_archs(),
            Role::Client => distro.compiler_archs(),
        };
        let images: Vec<String> = archs
            .iter()
            .map(|arch| self.config.images.image_tag(role, distro, *arch, version))
            .collect();

        let docker = self.docker();
        for image in &images {
            docker
                .pull(image)
                .with_context(|| format!("pulling {image}"))?;
        }

        for manifest in tags {
            docker
                .manifest_create(manifest, &images)
                .with_context(|| format!("creating manifest {manifest}"))?;
            for (arch, image) in archs.iter().zip(&images) {
                docker
                    .manifest_annotate(manifest, image, *arch)
                    .with_context(|| format!("annotating {image} in {manifest}"))?;
            }
            docker
                .manifest_push(manifest)
                .with_context(|| format!("pushing manifest {manifest}"))?;
            info!("Pushed manifest {}", manifest);
        }
        Ok(())
    }

    /// Remove the generated tree and CI workflow of one distribution, or of
    /// all of them. Returns the removed paths.
    pub fn clean(&self, distro: Option<&str>) -> Result<Vec<PathBuf>> {
        let layout = self.layout();
        let mut removed = Vec::new();
        for distro in self.selected(distro)? {
            for path in [layout.distro_dir(distro), layout.workflow_file(distro)] {
                if remove_output(&path)? {
                    removed.push(path);
                }
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::fake::FakeRunner;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    pub(super) fn farm_in<'r>(temp: &TempDir, runner: &'r FakeRunner) -> Farm<'r> {
        let mut config = Config::defaults(temp.path());
        config.templates_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("templates");
        config.smoke_test_delay = std::time::Duration::ZERO;
        Farm::new(Registry::builtin().unwrap(), config, runner)
    }

    #[test]
    fn test_list_archs_in_configured_order() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::new();
        let farm = farm_in(&temp, &runner);

        let hosts = farm.list_host_archs("archlinux").unwrap();
        assert_eq!(hosts.first(), Some(&Arch::Amd64));
        assert_eq!(
            farm.list_distros(),
            vec!["debian:buster", "debian:buster-slim", "archlinux", "alpine:3.12"]
        );
    }

    #[test]
    fn test_unknown_distro_lists_valid_names() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::new();
        let farm = farm_in(&temp, &runner);

        let err = farm.render("1.0", Some("fedora")).unwrap_err();
        assert!(err.to_string().contains("debian:buster, debian:buster-slim"));
        assert!(fs::read_dir(temp.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_render_all_distros() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::new();
        let farm = farm_in(&temp, &runner);

        farm.render("1.0", None).unwrap();

        let root = temp.path();
        assert!(root.join("debian-buster/host/Dockerfile.arm32v7").is_file());
        assert!(root.join("debian-buster-slim/client/Dockerfile.s390x").is_file());
        assert!(root
            .join("archlinux/host/build-context/init/amd64/usr/lib/systemd/system/distccd-arm64v8.service")
            .is_file());
        assert!(root
            .join("alpine-3.12/host/build-context/init/amd64/etc/init.d/distccd-ppc64le")
            .is_file());
        assert!(root
            .join("debian-buster/host/build-context/init/amd64/etc/init.d/distccd-aarch64-linux-gnu")
            .is_file());
        assert!(root.join("alpine-3.12/client/build-context/scripts/build-cjson.sh").is_file());
        assert!(root.join(".github/workflows/archlinux.yml").is_file());

        let run = fs::read_to_string(root.join("archlinux/host/build-context/scripts/run-amd64.sh"))
            .unwrap();
        assert!(run.starts_with("#!"));
        assert!(run.lines().nth(1).unwrap().starts_with("# Rendered from"));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_render_is_deterministic() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::new();
        let farm = farm_in(&temp, &runner);
        let compose = temp.path().join("debian-buster/docker-compose.yml");

        farm.render("1.0", Some("debian:buster")).unwrap();
        let first = fs::read(&compose).unwrap();
        farm.render("1.0", Some("debian:buster")).unwrap();
        assert_eq!(first, fs::read(&compose).unwrap());
    }

    #[test]
    fn test_workflow_has_no_anchors() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::new();
        let farm = farm_in(&temp, &runner);

        let written = farm.render_github_actions().unwrap();
        assert_eq!(written.len(), 4);

        let workflow =
            fs::read_to_string(temp.path().join(".github/workflows/alpine-3.12.yml")).unwrap();
        assert!(workflow.starts_with("# Rendered from github/build.yml.tera\n"));
        assert!(!workflow.contains("_anchors"));
        let value: serde_yaml::Value = serde_yaml::from_str(&workflow).unwrap();
        assert!(value.get("jobs").is_some());
    }

    #[test]
    fn test_render_readme() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::new();
        let farm = farm_in(&temp, &runner);

        let path = farm.render_readme().unwrap();
        let readme = fs::read_to_string(path).unwrap();
        assert!(!readme.starts_with("# Rendered from"));
        assert!(readme.contains("elijahru/build-farm:debian-buster"));
        assert!(readme.contains("alpine:3.12"));
    }

    #[test]
    fn test_clean_leaves_other_distros() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::new();
        let farm = farm_in(&temp, &runner);
        farm.render("1.0", None).unwrap();

        let removed = farm.clean(Some("archlinux")).unwrap();

        assert_eq!(
            removed,
            vec![
                temp.path().join("archlinux"),
                temp.path().join(".github/workflows/archlinux.yml"),
            ]
        );
        assert!(temp.path().join("debian-buster").is_dir());
        assert!(temp.path().join(".github/workflows/debian-buster.yml").is_file());
    }

    #[test]
    fn test_build_host_commands() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::new().fail("docker pull", 1);
        let farm = farm_in(&temp, &runner);

        farm.build_host("debian:buster", "arm64/v8", "1.0", true).unwrap();

        let ctx = temp.path().join("debian-buster/host/build-context");
        let dockerfile = temp.path().join("debian-buster/host/Dockerfile.arm64v8");
        let image = "elijahru/tmp:build-farm--debian-buster--arm64v8--1.0";
        assert_eq!(
            runner.lines(),
            vec![
                format!("docker pull {image} --platform linux/arm64/v8"),
                format!(
                    "docker build {} --file {} --tag {image} --cache-from {image} \
                     --platform linux/arm64/v8 --progress plain",
                    ctx.display(),
                    dockerfile.display()
                ),
                format!("docker push {image}"),
            ]
        );
    }

    #[test]
    fn test_build_aborts_on_pull_failure() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::new().fail("docker pull", 125);
        let farm = farm_in(&temp, &runner);

        assert!(farm.build_client("archlinux", "amd64", "1.0", false).is_err());
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_build_host_rejects_undeclared_arch() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::new();
        let farm = farm_in(&temp, &runner);

        let err = farm.build_host("alpine:3.12", "s390x", "1.0", false).unwrap_err();
        assert!(err.to_string().contains("s390x"));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_build_all_builds_each_client_once() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::new();
        let farm = farm_in(&temp, &runner);

        farm.build_all("1.0", false).unwrap();

        let builds = runner
            .lines()
            .into_iter()
            .filter(|l| l.starts_with("docker build"))
            .count();
        let expected: usize = farm
            .registry()
            .iter()
            .map(|d| d.host_archs().len() + d.compiler_archs().len())
            .sum();
        assert_eq!(builds, expected);
    }

    #[test]
    fn test_push_host_manifest_commands() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::new().fail("docker manifest create --amend", 1);
        let farm = farm_in(&temp, &runner);

        farm.push_host_manifest("archlinux", "1.0").unwrap();

        let lines = runner.lines();
        let hosts = farm.list_host_archs("archlinux").unwrap();
        let images: Vec<_> = hosts
            .iter()
            .map(|a| format!("elijahru/tmp:build-farm--archlinux--{}--1.0", a.slug()))
            .collect();

        for (line, image) in lines.iter().zip(&images) {
            assert_eq!(line, &format!("docker pull {image}"));
        }
        let manifests: Vec<_> = lines
            .iter()
            .filter(|l| l.starts_with("docker manifest push"))
            .collect();
        assert_eq!(
            manifests,
            vec![
                "docker manifest push elijahru/build-farm:archlinux--1.0",
                "docker manifest push elijahru/build-farm:archlinux",
            ]
        );
        let creates = lines
            .iter()
            .filter(|l| l.starts_with("docker manifest create elijahru"))
            .count();
        assert_eq!(creates, 2);
        let annotates = lines
            .iter()
            .filter(|l| l.starts_with("docker manifest annotate"))
            .count();
        assert_eq!(annotates, hosts.len() * 2);
    }

    #[test]
    fn test_tag_latest_touches_simple_manifests_only() {
        let temp = TempDir::new().unwrap();
        let runner = FakeRunner::new();
        let farm = farm_in(&temp, &runner);

        farm.tag_latest("alpine:3.12", "2.0").unwrap();

        let pushed: Vec<_> = runner
            .lines()
            .into_iter()
            .filter(|l| l.starts_with("docker manifest push"))
            .collect();
        assert_eq!(
            pushed,
            vec![
                "docker manifest push elijahru/build-farm:alpine-3.12",
                "docker manifest push elijahru/build-farm-client:alpine-3.12",
            ]
        );
        assert!(runner
            .lines()
            .iter()
            .any(|l| l == "docker pull elijahru/tmp:build-farm-client--alpine-3.12--arm32v7--2.0"));
    }
}
