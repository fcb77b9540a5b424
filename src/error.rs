//! Error types shared by the registry, renderer, configuration and toolchain layers.
//!
//! Orchestration code wraps these in `anyhow` with context; the library
//! boundaries keep them typed so tests can match on the failure kind.

use std::path::PathBuf;

/// Matrix and registry configuration errors.
///
/// These are always fatal and are raised before any file is written.
#[derive(Debug, thiserror::Error)]
pub enum MatrixError {
    /// Lookup of a distribution that is not registered.
    #[error("unsupported distro '{name}', choose from {}", .valid.join(", "))]
    UnknownDistro { name: String, valid: Vec<String> },

    /// An architecture that the distribution does not build for.
    #[error("unsupported {role} architecture '{arch}' for {distro}, choose from {}", .valid.join(", "))]
    UnknownArch {
        distro: String,
        role: &'static str,
        arch: String,
        valid: Vec<String>,
    },

    /// A compiler architecture the host cannot run.
    #[error("{distro}: host architecture {host} has no {compiler} compiler")]
    UnsupportedPair {
        distro: String,
        host: String,
        compiler: String,
    },

    /// A host architecture without any compilers.
    #[error("{distro}: host architecture {host} has no compiler architectures")]
    EmptyCompilerSet { distro: String, host: String },

    /// A host -> compiler edge that points outside the declared compiler set.
    #[error("{distro}: host architecture {host} lists undeclared compiler architecture {compiler}")]
    UndeclaredCompiler {
        distro: String,
        host: String,
        compiler: String,
    },

    /// A declared compiler architecture that no host serves.
    #[error("{distro}: compiler architecture {compiler} is not served by any host architecture")]
    UnservedCompiler { distro: String, compiler: String },

    /// A compiler-list key that is not a declared host architecture.
    #[error("{distro}: compiler list given for undeclared host architecture {host}")]
    UndeclaredHost { distro: String, host: String },

    /// A per-architecture metadata table lacks an entry.
    #[error("{distro}: compiler architecture {arch} has no {table} entry")]
    MissingEntry {
        distro: String,
        table: &'static str,
        arch: String,
    },

    /// Two compiler architectures share a distccd port.
    #[error("{distro}: port {port} is assigned to both {first} and {second}")]
    DuplicatePort {
        distro: String,
        port: u16,
        first: String,
        second: String,
    },

    #[error("distro '{0}' is registered more than once")]
    DuplicateDistro(String),

    #[error("unknown architecture '{0}'")]
    ParseArch(String),
}

/// Template rendering and output errors.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template not found: {}", .path.display())]
    MissingTemplate { path: PathBuf },

    #[error("reading {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rendering template {template}")]
    Template {
        template: String,
        #[source]
        source: tera::Error,
    },

    #[error("writing {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("interpolating YAML in {}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Matrix(#[from] MatrixError),
}

/// External container toolchain errors.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("failed to run {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {}", .code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}")))]
    Failed { command: String, code: Option<i32> },
}

impl ToolError {
    /// Exit code of a failed invocation, if it exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ToolError::Failed { code, .. } => *code,
            ToolError::Spawn { .. } => None,
        }
    }
}

/// Configuration file errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config {}: {detail}", .path.display())]
    Invalid { path: PathBuf, detail: String },
}
