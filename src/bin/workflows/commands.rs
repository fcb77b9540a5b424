use anyhow::{Context, Result};
use build_farm::config::Config;
use build_farm::farm::Farm;
use build_farm::preflight::{check_build_tools, check_test_tools};
use build_farm::registry::Registry;
use build_farm::toolchain::SystemRunner;
use tracing::{debug, info};

use crate::workflows::{locate_project_dir, Cli, Commands};

pub(crate) fn run(cli: Cli) -> Result<()> {
    let project_dir = locate_project_dir(cli.project_dir.as_deref())?;
    let config = Config::load(&project_dir, cli.config.as_deref())?;
    debug!("project directory {}", project_dir.display());

    let registry = Registry::builtin().context("loading distribution registry")?;
    let runner = SystemRunner;
    let farm = Farm::new(registry, config, &runner);
    dispatch(&farm, cli.command)
}

fn dispatch(farm: &Farm<'_>, command: Commands) -> Result<()> {
    let config = farm.config();
    match command {
        Commands::ListDistros => {
            for name in farm.list_distros() {
                println!("{name}");
            }
            Ok(())
        }
        Commands::ListHostArchs { distro } => {
            for arch in farm.list_host_archs(&distro)? {
                println!("{arch}");
            }
            Ok(())
        }
        Commands::ListCompilerArchs { distro } => {
            for arch in farm.list_compiler_archs(&distro)? {
                println!("{arch}");
            }
            Ok(())
        }
        Commands::Render { version, distro } => {
            let written = farm.render(&version, distro.as_deref())?;
            info!("Rendered {} files", written.len());
            Ok(())
        }
        Commands::RenderGithubActions => {
            farm.render_github_actions()?;
            Ok(())
        }
        Commands::BuildHost {
            distro,
            arch,
            version,
            push,
        } => {
            check_build_tools(&config.docker)?;
            farm.build_host(&distro, &arch, &version, push)
                .with_context(|| format!("building {distro} host image for {arch}"))
        }
        Commands::BuildClient {
            distro,
            arch,
            version,
            push,
        } => {
            check_build_tools(&config.docker)?;
            farm.build_client(&distro, &arch, &version, push)
                .with_context(|| format!("building {distro} client image for {arch}"))
        }
        Commands::BuildAll { version, push } => {
            check_build_tools(&config.docker)?;
            farm.build_all(&version, push)
        }
        Commands::PushHostManifest { distro, version } => {
            check_build_tools(&config.docker)?;
            farm.push_host_manifest(&distro, &version)
        }
        Commands::PushClientManifest { distro, version } => {
            check_build_tools(&config.docker)?;
            farm.push_client_manifest(&distro, &version)
        }
        Commands::TagLatest { distro, version } => {
            check_build_tools(&config.docker)?;
            farm.tag_latest(&distro, &version)
        }
        Commands::Test {
            distro,
            client_arch,
            version,
            host_arch,
        } => {
            check_test_tools(&config.docker, &config.compose)?;
            farm.smoke_test(&distro, &client_arch, &version, host_arch.as_deref())
        }
        Commands::Clean { distro } => {
            let removed = farm.clean(distro.as_deref())?;
            if removed.is_empty() {
                info!("Nothing to clean");
            }
            Ok(())
        }
        Commands::RenderReadme => {
            farm.render_readme()?;
            Ok(())
        }
    }
}
