//! Generator and orchestrator for a multi-architecture distcc build farm.
//!
//! The farm is a matrix of distributions x host architectures x compiler
//! architectures. Every distribution gets one distccd host image per host
//! architecture, serving a cross compiler per compiler architecture, and a
//! client image per compiler architecture that compiles through the hosts.
//!
//! - **Registry** - validated, immutable matrix tables per distribution
//! - **Render** - Tera templates turned into Dockerfiles, compose files,
//!   init-system units and CI workflows
//! - **Toolchain** - `docker` / `docker-compose` invocations behind a runner trait
//! - **Farm** - render, build, push and smoke-test orchestration
//! - **Preflight checks** - host tool validation before toolchain operations
//!
//! # Architecture
//!
//! ```text
//! build-farm (this crate)
//!     │
//!     ├── registry ── Arch, Family, Distro, Registry
//!     │       │
//!     │       └── render::context (pure) ── render::plan ── Renderer (tera)
//!     │
//!     └── farm ── render + toolchain::Docker ── CommandRunner
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use build_farm::config::Config;
//! use build_farm::farm::Farm;
//! use build_farm::registry::Registry;
//! use build_farm::toolchain::SystemRunner;
//!
//! let config = Config::load(std::path::Path::new("."), None)?;
//! let runner = SystemRunner;
//! let farm = Farm::new(Registry::builtin()?, config, &runner);
//! farm.render("1.0", Some("debian:buster"))?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod arch;
pub mod config;
pub mod error;
pub mod farm;
pub mod images;
pub mod preflight;
pub mod registry;
pub mod render;
pub mod toolchain;

pub use arch::Arch;
pub use config::Config;
pub use error::{ConfigError, MatrixError, RenderError, ToolError};
pub use farm::Farm;
pub use registry::{Distro, Family, Registry};
