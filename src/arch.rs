//! CPU architectures in docker platform notation.
//!
//! Docker names platforms `linux/<arch>[/<variant>]`; the farm keys every
//! table on the `<arch>[/<variant>]` part and uses a slash-free slug for
//! file names and image tags.

use std::fmt;
use std::str::FromStr;

use crate::error::MatrixError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Arch {
    Amd64,
    I386,
    ArmV5,
    ArmV6,
    ArmV7,
    Arm64V8,
    Ppc,
    Ppc64le,
    S390x,
    Mips64le,
}

impl Arch {
    pub const ALL: &'static [Arch] = &[
        Arch::Amd64,
        Arch::I386,
        Arch::ArmV5,
        Arch::ArmV6,
        Arch::ArmV7,
        Arch::Arm64V8,
        Arch::Ppc,
        Arch::Ppc64le,
        Arch::S390x,
        Arch::Mips64le,
    ];

    /// Docker platform name without the `linux/` prefix.
    pub fn as_str(self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::I386 => "386",
            Arch::ArmV5 => "arm/v5",
            Arch::ArmV6 => "arm/v6",
            Arch::ArmV7 => "arm/v7",
            Arch::Arm64V8 => "arm64/v8",
            Arch::Ppc => "ppc",
            Arch::Ppc64le => "ppc64le",
            Arch::S390x => "s390x",
            Arch::Mips64le => "mips64le",
        }
    }

    /// File-name and tag safe form: `arm/v7` -> `arm32v7`, `arm64/v8` -> `arm64v8`.
    pub fn slug(self) -> String {
        arch_slug(self.as_str())
    }

    /// Value for `docker --platform`.
    pub fn platform(self) -> String {
        format!("linux/{}", self.as_str())
    }

    /// Arguments for `docker manifest annotate`.
    pub fn manifest_args(self) -> Vec<&'static str> {
        match self {
            Arch::Amd64 => vec!["--arch", "amd64"],
            Arch::I386 => vec!["--arch", "386"],
            Arch::ArmV5 => vec!["--arch", "arm", "--variant", "v5"],
            Arch::ArmV6 => vec!["--arch", "arm", "--variant", "v6"],
            Arch::ArmV7 => vec!["--arch", "arm", "--variant", "v7"],
            Arch::Arm64V8 => vec!["--arch", "arm64", "--variant", "v8"],
            Arch::Ppc => vec!["--arch", "ppc"],
            Arch::Ppc64le => vec!["--arch", "ppc64le"],
            Arch::S390x => vec!["--arch", "s390x"],
            Arch::Mips64le => vec!["--arch", "mips64le"],
        }
    }

    /// Architecture of the machine running this process, if the farm knows it.
    pub fn current() -> Option<Arch> {
        from_rust_arch(std::env::consts::ARCH, cfg!(target_endian = "little"))
    }
}

/// Map a Rust target architecture name to the docker architecture.
fn from_rust_arch(arch: &str, little_endian: bool) -> Option<Arch> {
    match arch {
        "x86_64" => Some(Arch::Amd64),
        "x86" => Some(Arch::I386),
        "aarch64" => Some(Arch::Arm64V8),
        // 32-bit ARM hosts in the farm are hard-float v7.
        "arm" => Some(Arch::ArmV7),
        "powerpc" => Some(Arch::Ppc),
        "powerpc64" if little_endian => Some(Arch::Ppc64le),
        "s390x" => Some(Arch::S390x),
        "mips64" if little_endian => Some(Arch::Mips64le),
        _ => None,
    }
}

/// Slug form of a docker architecture string.
pub fn arch_slug(arch: &str) -> String {
    arch.replace("arm/", "arm32").replace("arm64/", "arm64")
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Arch {
    type Err = MatrixError;

    /// Accepts both the platform form (`arm/v7`) and the slug (`arm32v7`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_start_matches("linux/");
        Arch::ALL
            .iter()
            .copied()
            .find(|arch| arch.as_str() == wanted || arch.slug() == wanted)
            .ok_or_else(|| MatrixError::ParseArch(s.to_string()))
    }
}
