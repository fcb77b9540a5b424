//! Render plans: the full list of (template, output, context) jobs for a
//! distribution, and their two-phase execution.
//!
//! Every job is rendered in memory before anything is written, so a template
//! error in any cell leaves the previous output tree untouched.

use std::path::{Path, PathBuf};

use tracing::info;

use super::context::{cell_context, distro_context, RenderContext};
use super::files::{copy_static_tree, write_output};
use super::{with_header, yaml, Renderer};
use crate::arch::Arch;
use crate::error::{MatrixError, RenderError};
use crate::images::ImageNames;
use crate::registry::{Distro, InitSystem};

/// Shared build context trees, relative to the templates root.
pub const SHARED_CONTEXT_DIR: &str = "shared-build-context";
/// CI workflow template, relative to the templates root.
pub const WORKFLOW_TEMPLATE: &str = "github/build.yml.tera";
/// README template, relative to the templates root.
pub const README_TEMPLATE: &str = "README.md.tera";

/// Where generated files go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Root of the per-distribution output directories.
    pub output_root: PathBuf,
    /// Directory receiving one CI workflow per distribution.
    pub workflows_dir: PathBuf,
}

impl Layout {
    pub fn new(output_root: impl Into<PathBuf>, workflows_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            workflows_dir: workflows_dir.into(),
        }
    }

    pub fn distro_dir(&self, distro: &Distro) -> PathBuf {
        self.output_root.join(distro.slug())
    }

    pub fn workflow_file(&self, distro: &Distro) -> PathBuf {
        self.workflows_dir.join(format!("{}.yml", distro.slug()))
    }

    pub fn compose_file(&self, distro: &Distro) -> PathBuf {
        self.distro_dir(distro).join("docker-compose.yml")
    }

    pub fn host_dockerfile(&self, distro: &Distro, host: Arch) -> PathBuf {
        self.distro_dir(distro)
            .join("host")
            .join(format!("Dockerfile.{}", host.slug()))
    }

    pub fn client_dockerfile(&self, distro: &Distro, compiler: Arch) -> PathBuf {
        self.distro_dir(distro)
            .join("client")
            .join(format!("Dockerfile.{}", compiler.slug()))
    }

    pub fn host_build_context(&self, distro: &Distro) -> PathBuf {
        self.distro_dir(distro).join("host/build-context")
    }

    pub fn client_build_context(&self, distro: &Distro) -> PathBuf {
        self.distro_dir(distro).join("client/build-context")
    }

    pub fn run_script(&self, distro: &Distro, host: Arch) -> PathBuf {
        self.host_build_context(distro)
            .join("scripts")
            .join(format!("run-{}.sh", host.slug()))
    }

    /// Root filesystem overlay with the init configuration of one host.
    pub fn init_root(&self, distro: &Distro, host: Arch) -> PathBuf {
        self.host_build_context(distro).join("init").join(host.slug())
    }
}

/// One template to render.
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Template path relative to the templates root.
    pub template: PathBuf,
    pub output: PathBuf,
    pub context: RenderContext,
    /// Expand YAML aliases in the rendered text.
    pub interpolate_yaml: bool,
}

impl RenderJob {
    fn new(template: impl Into<PathBuf>, output: PathBuf, context: RenderContext) -> Self {
        Self {
            template: template.into(),
            output,
            context,
            interpolate_yaml: false,
        }
    }
}

/// An init-system file for one (host, compiler) cell.
struct InitUnit {
    /// Template relative to the family's `init/` directory.
    template: &'static str,
    /// Output relative to the host's init root.
    dest: String,
}

fn init_units(init: InitSystem, toolchain: &str, compiler_slug: &str) -> Vec<InitUnit> {
    match init {
        InitSystem::SysV => vec![
            InitUnit {
                template: "etc/default/distccd.tera",
                dest: format!("etc/default/distccd-{toolchain}"),
            },
            InitUnit {
                template: "etc/init.d/distccd.tera",
                dest: format!("etc/init.d/distccd-{toolchain}"),
            },
            InitUnit {
                template: "etc/logrotate.d/distccd.tera",
                dest: format!("etc/logrotate.d/distccd-{toolchain}"),
            },
        ],
        InitSystem::Systemd => vec![
            InitUnit {
                template: "etc/conf.d/distccd.tera",
                dest: format!("etc/conf.d/distccd-{compiler_slug}"),
            },
            InitUnit {
                template: "usr/lib/systemd/system/distccd.service.tera",
                dest: format!("usr/lib/systemd/system/distccd-{compiler_slug}.service"),
            },
        ],
        InitSystem::OpenRc => vec![
            InitUnit {
                template: "etc/conf.d/distccd.tera",
                dest: format!("etc/conf.d/distccd-{compiler_slug}"),
            },
            InitUnit {
                template: "etc/init.d/distccd.tera",
                dest: format!("etc/init.d/distccd-{compiler_slug}"),
            },
        ],
    }
}

/// Host whose context a client Dockerfile is rendered in.
///
/// Client containers run on the compiler's own platform, so the compiler
/// architecture is used when it is also a host of itself; otherwise the first
/// host that serves it.
pub fn client_host(distro: &Distro, compiler: Arch) -> Result<Arch, MatrixError> {
    if distro
        .compilers_for(compiler)
        .is_ok_and(|compilers| compilers.contains(&compiler))
    {
        return Ok(compiler);
    }
    for host in distro.host_archs() {
        if distro.compilers_for(*host)?.contains(&compiler) {
            return Ok(*host);
        }
    }
    Err(MatrixError::UnknownArch {
        distro: distro.name().to_string(),
        role: "compiler",
        arch: compiler.to_string(),
        valid: distro.compiler_archs().iter().map(|a| a.to_string()).collect(),
    })
}

/// Every job needed to render one distribution's output tree, CI workflow included.
pub fn distro_jobs(
    distro: &Distro,
    images: &ImageNames,
    layout: &Layout,
    version: &str,
) -> Result<Vec<RenderJob>, MatrixError> {
    let family = Path::new(distro.family().template_dir());
    let version = Some(version);
    let mut jobs = Vec::new();

    for host in distro.host_archs() {
        let ctx = cell_context(distro, images, version, *host, None)?;
        jobs.push(RenderJob::new(
            family.join("host/Dockerfile.tera"),
            layout.host_dockerfile(distro, *host),
            ctx.clone(),
        ));
        jobs.push(RenderJob::new(
            Path::new(SHARED_CONTEXT_DIR).join("host/scripts/run.sh.tera"),
            layout.run_script(distro, *host),
            ctx,
        ));
    }

    for compiler in distro.compiler_archs() {
        let host = client_host(distro, *compiler)?;
        jobs.push(RenderJob::new(
            family.join("client/Dockerfile.tera"),
            layout.client_dockerfile(distro, *compiler),
            cell_context(distro, images, version, host, Some(*compiler))?,
        ));
    }

    let init = distro.family().init_system();
    for host in distro.host_archs() {
        let init_root = layout.init_root(distro, *host);
        for compiler in distro.compilers_for(*host)? {
            let ctx = cell_context(distro, images, version, *host, Some(*compiler))?;
            for unit in init_units(init, distro.toolchain(*compiler)?, &compiler.slug()) {
                jobs.push(RenderJob::new(
                    family.join("init").join(unit.template),
                    init_root.join(unit.dest),
                    ctx.clone(),
                ));
            }
        }
    }

    jobs.push(RenderJob::new(
        family.join("docker-compose.yml.tera"),
        layout.compose_file(distro),
        distro_context(distro, images, version)?,
    ));

    jobs.push(workflow_job(distro, images, layout)?);
    Ok(jobs)
}

/// The CI workflow job. Its context is version-independent.
pub fn workflow_job(
    distro: &Distro,
    images: &ImageNames,
    layout: &Layout,
) -> Result<RenderJob, MatrixError> {
    let mut job = RenderJob::new(
        WORKFLOW_TEMPLATE,
        layout.workflow_file(distro),
        distro_context(distro, images, None)?,
    );
    job.interpolate_yaml = true;
    Ok(job)
}

/// Render every job in memory, then write them all.
pub fn execute(renderer: &mut Renderer, jobs: &[RenderJob]) -> Result<Vec<PathBuf>, RenderError> {
    let mut staged = Vec::with_capacity(jobs.len());
    for job in jobs {
        let mut body = renderer.render_to_string(&job.template, &job.context)?;
        if job.interpolate_yaml {
            body = yaml::interpolate(&body).map_err(|source| RenderError::Yaml {
                path: job.output.clone(),
                source,
            })?;
        }
        staged.push((job, with_header(&body, &job.template)));
    }

    let mut written = Vec::with_capacity(staged.len());
    for (job, content) in staged {
        write_output(&job.output, &content)?;
        info!(
            "Rendered {} -> {}",
            job.template.display(),
            job.output.display()
        );
        written.push(job.output.clone());
    }
    Ok(written)
}

/// Copy the static (non-template) files of the family tree and the shared
/// build contexts into the distribution's output directory.
pub fn copy_static_files(
    templates_root: &Path,
    distro: &Distro,
    layout: &Layout,
) -> Result<Vec<PathBuf>, RenderError> {
    let shared = templates_root.join(SHARED_CONTEXT_DIR);
    let host_ctx = layout.host_build_context(distro);
    let client_ctx = layout.client_build_context(distro);

    let mut copied = copy_static_tree(
        &templates_root.join(distro.family().template_dir()),
        &layout.distro_dir(distro),
    )?;
    copied.extend(copy_static_tree(&shared.join("host"), &host_ctx)?);
    copied.extend(copy_static_tree(&shared.join("client"), &client_ctx)?);
    copied.extend(copy_static_tree(&shared.join("shared"), &host_ctx)?);
    copied.extend(copy_static_tree(&shared.join("shared"), &client_ctx)?);
    Ok(copied)
}
