//! Command-line definitions for `build-farm`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "build-farm")]
#[command(version)]
#[command(about = "Generate, build and publish a multi-architecture distcc farm", long_about = None)]
pub(crate) struct Cli {
    /// Configuration file (default: <project dir>/build-farm.toml if present)
    #[arg(long, global = true)]
    pub(crate) config: Option<PathBuf>,

    /// Project directory holding templates and generated output
    #[arg(long, global = true)]
    pub(crate) project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// List supported distributions
    ListDistros,

    /// List host architectures of a distribution
    ListHostArchs {
        #[arg(long)]
        distro: String,
    },

    /// List compiler architectures of a distribution
    ListCompilerArchs {
        #[arg(long)]
        distro: String,
    },

    /// Render Dockerfiles, compose files, init units and CI workflows
    Render {
        #[arg(long)]
        version: String,

        /// Only this distribution (default: all)
        #[arg(long)]
        distro: Option<String>,
    },

    /// Render the CI workflow of every distribution
    RenderGithubActions,

    /// Build a host image
    BuildHost {
        #[arg(long)]
        distro: String,

        #[arg(long)]
        arch: String,

        #[arg(long)]
        version: String,

        /// Push the image after building
        #[arg(long)]
        push: bool,
    },

    /// Build a client image
    BuildClient {
        #[arg(long)]
        distro: String,

        #[arg(long)]
        arch: String,

        #[arg(long)]
        version: String,

        /// Push the image after building
        #[arg(long)]
        push: bool,
    },

    /// Build every host and client image of every distribution
    BuildAll {
        #[arg(long)]
        version: String,

        /// Push each image after building
        #[arg(long)]
        push: bool,
    },

    /// Publish the multi-architecture host manifests
    PushHostManifest {
        #[arg(long)]
        distro: String,

        #[arg(long)]
        version: String,
    },

    /// Publish the multi-architecture client manifests
    PushClientManifest {
        #[arg(long)]
        distro: String,

        #[arg(long)]
        version: String,
    },

    /// Point the unversioned manifests at a published version
    TagLatest {
        #[arg(long)]
        distro: String,

        #[arg(long)]
        version: String,
    },

    /// Compile a test project in a client image through a running host
    Test {
        #[arg(long)]
        distro: String,

        #[arg(long)]
        client_arch: String,

        #[arg(long)]
        version: String,

        /// Host architecture to start (default: this machine's)
        #[arg(long)]
        host_arch: Option<String>,
    },

    /// Remove generated files
    Clean {
        /// Only this distribution (default: all)
        #[arg(long)]
        distro: Option<String>,
    },

    /// Render README.md
    RenderReadme,
}
