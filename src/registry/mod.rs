//! Distribution and architecture registry.
//!
//! Every supported distribution declares which host architectures it runs
//! distccd on, which compiler architectures each host serves, and per
//! compiler architecture the distccd port, toolchain triple, packages and
//! init-system flag. The registry is built once, validated eagerly and is
//! read-only afterwards.
//!
//! ```text
//! Registry
//!   ├── debian:buster        (debian-like,    SysV init)
//!   ├── debian:buster-slim   (debian-like,    SysV init)
//!   ├── archlinux            (archlinux-like, systemd, x-tools)
//!   └── alpine:3.12          (alpine-like,    OpenRC,  x-tools)
//! ```

mod alpine;
mod archlinux;
mod debian;

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::arch::Arch;
use crate::error::MatrixError;

/// Release of the prebuilt crosstool-NG toolchains used by x-tools families.
pub const XTOOLS_RELEASE: &str = "devel-20201227";

/// Init system that supervises the distccd daemons inside a host image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitSystem {
    /// `/etc/init.d` scripts configured through `/etc/default`.
    SysV,
    /// systemd units configured through `/etc/conf.d`.
    Systemd,
    /// OpenRC services configured through `/etc/conf.d`.
    OpenRc,
}

impl InitSystem {
    pub fn as_str(self) -> &'static str {
        match self {
            InitSystem::SysV => "sysv",
            InitSystem::Systemd => "systemd",
            InitSystem::OpenRc => "openrc",
        }
    }
}

/// Template family shared by related distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    DebianLike,
    ArchLinuxLike,
    AlpineLike,
}

impl Family {
    /// Directory under the templates root holding this family's templates.
    pub fn template_dir(self) -> &'static str {
        match self {
            Family::DebianLike => "debian-like",
            Family::ArchLinuxLike => "archlinux-like",
            Family::AlpineLike => "alpine-like",
        }
    }

    pub fn init_system(self) -> InitSystem {
        match self {
            Family::DebianLike => InitSystem::SysV,
            Family::ArchLinuxLike => InitSystem::Systemd,
            Family::AlpineLike => InitSystem::OpenRc,
        }
    }

    /// x-tools release for families that download prebuilt toolchains.
    pub fn xtools_release(self) -> Option<&'static str> {
        match self {
            Family::DebianLike => None,
            Family::ArchLinuxLike | Family::AlpineLike => Some(XTOOLS_RELEASE),
        }
    }

    /// Directory holding `<triple>/bin` for cross compilers.
    fn toolchain_root(self) -> &'static str {
        match self {
            Family::DebianLike => "/usr/local",
            Family::ArchLinuxLike | Family::AlpineLike => "/usr/lib/gcc-cross",
        }
    }

    /// Packages every host image installs regardless of its compilers.
    fn base_packages(self) -> &'static [&'static str] {
        match self {
            Family::DebianLike => &["build-essential", "g++", "distcc", "lsb-base"],
            Family::ArchLinuxLike => &["base-devel", "distcc"],
            Family::AlpineLike => &["build-base", "distcc", "openrc"],
        }
    }
}

/// Architecture tables of one distribution.
///
/// Fields are public so alternative matrices can be assembled; a
/// [`Registry`] refuses to load tables that fail [`ArchTables::validate`].
#[derive(Debug, Clone, Default)]
pub struct ArchTables {
    pub host_archs: Vec<Arch>,
    pub compiler_archs: Vec<Arch>,
    pub compilers_by_host: BTreeMap<Arch, Vec<Arch>>,
    pub ports: BTreeMap<Arch, u16>,
    pub toolchains: BTreeMap<Arch, String>,
    pub packages: BTreeMap<Arch, Vec<String>>,
    pub flags: BTreeMap<Arch, String>,
}

impl ArchTables {
    /// Check referential completeness of the tables.
    pub fn validate(&self, distro: &str) -> Result<(), MatrixError> {
        for host in self.compilers_by_host.keys() {
            if !self.host_archs.contains(host) {
                return Err(MatrixError::UndeclaredHost {
                    distro: distro.to_string(),
                    host: host.to_string(),
                });
            }
        }

        for host in &self.host_archs {
            let compilers = self
                .compilers_by_host
                .get(host)
                .filter(|compilers| !compilers.is_empty())
                .ok_or_else(|| MatrixError::EmptyCompilerSet {
                    distro: distro.to_string(),
                    host: host.to_string(),
                })?;

            for compiler in compilers {
                if !self.compiler_archs.contains(compiler) {
                    return Err(MatrixError::UndeclaredCompiler {
                        distro: distro.to_string(),
                        host: host.to_string(),
                        compiler: compiler.to_string(),
                    });
                }
            }
        }

        for compiler in &self.compiler_archs {
            if !self
                .compilers_by_host
                .values()
                .any(|compilers| compilers.contains(compiler))
            {
                return Err(MatrixError::UnservedCompiler {
                    distro: distro.to_string(),
                    compiler: compiler.to_string(),
                });
            }
        }

        for arch in &self.compiler_archs {
            let missing = |table: &'static str| MatrixError::MissingEntry {
                distro: distro.to_string(),
                table,
                arch: arch.to_string(),
            };
            if !self.ports.contains_key(arch) {
                return Err(missing("port"));
            }
            if !self.toolchains.contains_key(arch) {
                return Err(missing("toolchain"));
            }
            if !self.packages.contains_key(arch) {
                return Err(missing("packages"));
            }
            if !self.flags.contains_key(arch) {
                return Err(missing("flag"));
            }
        }

        let mut seen: BTreeMap<u16, Arch> = BTreeMap::new();
        for arch in &self.compiler_archs {
            let port = self.ports[arch];
            match seen.entry(port) {
                Entry::Occupied(first) => {
                    return Err(MatrixError::DuplicatePort {
                        distro: distro.to_string(),
                        port,
                        first: first.get().to_string(),
                        second: arch.to_string(),
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(*arch);
                }
            }
        }

        Ok(())
    }
}

/// Build [`ArchTables`] from the static slices the family modules declare.
pub(crate) struct TableSource {
    pub host_archs: &'static [Arch],
    pub compiler_archs: &'static [Arch],
    pub compilers_by_host: &'static [(Arch, &'static [Arch])],
    pub ports: &'static [(Arch, u16)],
    pub toolchains: &'static [(Arch, &'static str)],
    pub packages: &'static [(Arch, &'static str)],
    pub flags: &'static [(Arch, &'static str)],
}

impl TableSource {
    pub(crate) fn to_tables(&self) -> ArchTables {
        ArchTables {
            host_archs: self.host_archs.to_vec(),
            compiler_archs: self.compiler_archs.to_vec(),
            compilers_by_host: self
                .compilers_by_host
                .iter()
                .map(|(host, compilers)| (*host, compilers.to_vec()))
                .collect(),
            ports: self.ports.iter().copied().collect(),
            toolchains: self
                .toolchains
                .iter()
                .map(|(arch, triple)| (*arch, triple.to_string()))
                .collect(),
            packages: self
                .packages
                .iter()
                .map(|(arch, pkgs)| {
                    (
                        *arch,
                        pkgs.split_whitespace().map(str::to_string).collect(),
                    )
                })
                .collect(),
            flags: self
                .flags
                .iter()
                .map(|(arch, flag)| (*arch, flag.to_string()))
                .collect(),
        }
    }
}

/// A supported distribution and its architecture matrix.
#[derive(Debug, Clone)]
pub struct Distro {
    name: String,
    family: Family,
    tables: ArchTables,
}

impl Distro {
    pub fn new(name: impl Into<String>, family: Family, tables: ArchTables) -> Self {
        Self {
            name: name.into(),
            family,
            tables,
        }
    }

    /// Docker image name of the distribution, e.g. `debian:buster`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path and tag safe name, e.g. `debian-buster`, `alpine-3.12`.
    pub fn slug(&self) -> String {
        slugify(&self.name, '-', ".")
    }

    /// Identifier safe name, e.g. `alpine_3_12`.
    pub fn identifier(&self) -> String {
        slugify(&self.name, '_', "")
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn tables(&self) -> &ArchTables {
        &self.tables
    }

    pub fn host_archs(&self) -> &[Arch] {
        &self.tables.host_archs
    }

    pub fn compiler_archs(&self) -> &[Arch] {
        &self.tables.compiler_archs
    }

    /// Resolve a host architecture name against this distribution.
    pub fn host_arch(&self, value: &str) -> Result<Arch, MatrixError> {
        self.resolve_arch(value, "host", &self.tables.host_archs)
    }

    /// Resolve a compiler architecture name against this distribution.
    pub fn compiler_arch(&self, value: &str) -> Result<Arch, MatrixError> {
        self.resolve_arch(value, "compiler", &self.tables.compiler_archs)
    }

    fn resolve_arch(
        &self,
        value: &str,
        role: &'static str,
        allowed: &[Arch],
    ) -> Result<Arch, MatrixError> {
        let unknown = || MatrixError::UnknownArch {
            distro: self.name.clone(),
            role,
            arch: value.to_string(),
            valid: allowed.iter().map(|a| a.to_string()).collect(),
        };
        let arch: Arch = value.parse().map_err(|_| unknown())?;
        if allowed.contains(&arch) {
            Ok(arch)
        } else {
            Err(unknown())
        }
    }

    /// Compiler architectures served by `host`, in configured order.
    pub fn compilers_for(&self, host: Arch) -> Result<&[Arch], MatrixError> {
        self.tables
            .compilers_by_host
            .get(&host)
            .map(Vec::as_slice)
            .ok_or_else(|| MatrixError::UnknownArch {
                distro: self.name.clone(),
                role: "host",
                arch: host.to_string(),
                valid: self.tables.host_archs.iter().map(|a| a.to_string()).collect(),
            })
    }

    /// Fail unless `host` serves `compiler`.
    pub fn ensure_pair(&self, host: Arch, compiler: Arch) -> Result<(), MatrixError> {
        if self.compilers_for(host)?.contains(&compiler) {
            return Ok(());
        }
        Err(MatrixError::UnsupportedPair {
            distro: self.name.clone(),
            host: host.to_string(),
            compiler: compiler.to_string(),
        })
    }

    fn lookup<'a, T>(
        &self,
        table: &'a BTreeMap<Arch, T>,
        name: &'static str,
        arch: Arch,
    ) -> Result<&'a T, MatrixError> {
        table.get(&arch).ok_or_else(|| MatrixError::MissingEntry {
            distro: self.name.clone(),
            table: name,
            arch: arch.to_string(),
        })
    }

    pub fn port(&self, arch: Arch) -> Result<u16, MatrixError> {
        self.lookup(&self.tables.ports, "port", arch).copied()
    }

    pub fn toolchain(&self, arch: Arch) -> Result<&str, MatrixError> {
        self.lookup(&self.tables.toolchains, "toolchain", arch)
            .map(String::as_str)
    }

    pub fn packages(&self, arch: Arch) -> Result<&[String], MatrixError> {
        self.lookup(&self.tables.packages, "packages", arch)
            .map(Vec::as_slice)
    }

    pub fn flag(&self, arch: Arch) -> Result<&str, MatrixError> {
        self.lookup(&self.tables.flags, "flag", arch)
            .map(String::as_str)
    }

    /// Base image for containers of architecture `arch`.
    pub fn from_image(&self, arch: Arch) -> String {
        match (self.family, arch) {
            (Family::ArchLinuxLike, Arch::Amd64) => "archlinux:base-devel".to_string(),
            (Family::ArchLinuxLike, _) => "lopsided/archlinux:devel".to_string(),
            _ => self.name.clone(),
        }
    }

    /// `PATH` prefix that puts the cross compiler for `compiler` first.
    ///
    /// Empty when the host compiles natively.
    pub fn compiler_path_part(&self, host: Arch, compiler: Arch) -> Result<String, MatrixError> {
        if host == compiler {
            return Ok(String::new());
        }
        Ok(format!(
            "{}/{}/bin:",
            self.family.toolchain_root(),
            self.toolchain(compiler)?
        ))
    }

    /// Download URL of the prebuilt x-tools toolchain, for x-tools families.
    pub fn toolchain_url(&self, host: Arch, compiler: Arch) -> Result<Option<String>, MatrixError> {
        let Some(release) = self.family.xtools_release() else {
            return Ok(None);
        };
        let os = self.name.replace(':', "");
        let tarball = format!(
            "x-tools--host.{os}-{}--target.{}--{release}.tar.xz",
            host.slug(),
            self.toolchain(compiler)?
        );
        Ok(Some(format!(
            "https://github.com/elijahr/x-tools/releases/download/{release}/{tarball}"
        )))
    }

    /// Packages installed into the host image for `host`.
    ///
    /// Base packages of the family followed by every compiler's packages,
    /// deduplicated in first-seen order.
    pub fn host_packages(&self, host: Arch) -> Result<Vec<String>, MatrixError> {
        let mut pkgs: Vec<String> = self
            .family
            .base_packages()
            .iter()
            .map(|p| p.to_string())
            .collect();
        for compiler in self.compilers_for(host)? {
            for pkg in self.packages(*compiler)? {
                if !pkgs.contains(pkg) {
                    pkgs.push(pkg.clone());
                }
            }
        }
        Ok(pkgs)
    }

    pub fn validate(&self) -> Result<(), MatrixError> {
        self.tables.validate(&self.name)
    }
}

/// Immutable, validated set of distributions.
#[derive(Debug, Clone)]
pub struct Registry {
    distros: Vec<Distro>,
}

impl Registry {
    /// Validate and register `distros`, keeping their order.
    pub fn new(distros: Vec<Distro>) -> Result<Self, MatrixError> {
        for (idx, distro) in distros.iter().enumerate() {
            distro.validate()?;
            if distros[..idx]
                .iter()
                .any(|other| other.name == distro.name || other.slug() == distro.slug())
            {
                return Err(MatrixError::DuplicateDistro(distro.name.clone()));
            }
        }
        Ok(Self { distros })
    }

    /// The distributions the farm ships images for.
    pub fn builtin() -> Result<Self, MatrixError> {
        Self::new(vec![
            Distro::new("debian:buster", Family::DebianLike, debian::tables()),
            Distro::new("debian:buster-slim", Family::DebianLike, debian::tables()),
            Distro::new("archlinux", Family::ArchLinuxLike, archlinux::tables()),
            Distro::new("alpine:3.12", Family::AlpineLike, alpine::tables()),
        ])
    }

    /// Look up a distribution by name or slug.
    pub fn get(&self, name: &str) -> Result<&Distro, MatrixError> {
        let wanted = name.trim();
        self.distros
            .iter()
            .find(|d| d.name == wanted || d.slug() == wanted)
            .ok_or_else(|| MatrixError::UnknownDistro {
                name: name.to_string(),
                valid: self.names().map(str::to_string).collect(),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.distros.iter().map(|d| d.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Distro> {
        self.distros.iter()
    }
}

/// Lowercase `value`, replacing every character that is not alphanumeric,
/// `_` or one of `allowed` with `delim`.
pub fn slugify(value: &str, delim: char, allowed: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || allowed.contains(c) {
                c
            } else {
                delim
            }
        })
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::builtin().unwrap()
    }

    #[test]
    fn test_builtin_registry_validates() {
        let registry = registry();
        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["debian:buster", "debian:buster-slim", "archlinux", "alpine:3.12"]
        );
    }

    #[test]
    fn test_every_host_has_complete_compilers() {
        for distro in registry().iter() {
            for host in distro.host_archs() {
                let compilers = distro.compilers_for(*host).unwrap();
                assert!(!compilers.is_empty(), "{} {host}", distro.name());
                for compiler in compilers {
                    assert!(distro.port(*compiler).is_ok());
                    assert!(distro.toolchain(*compiler).is_ok());
                    assert!(distro.packages(*compiler).is_ok());
                    assert!(distro.flag(*compiler).is_ok());
                }
            }
        }
    }

    #[test]
    fn test_host_archs_keep_configured_order() {
        let registry = registry();
        let alpine = registry.get("alpine:3.12").unwrap();
        assert_eq!(
            alpine.host_archs(),
            &[
                Arch::I386,
                Arch::Amd64,
                Arch::ArmV6,
                Arch::ArmV7,
                Arch::Arm64V8,
                Arch::Ppc64le
            ]
        );
        let archlinux = registry.get("archlinux").unwrap();
        assert_eq!(
            archlinux.compilers_for(Arch::Amd64).unwrap(),
            &[
                Arch::Amd64,
                Arch::ArmV5,
                Arch::ArmV6,
                Arch::ArmV7,
                Arch::Arm64V8
            ]
        );
    }

    #[test]
    fn test_unknown_distro_lists_valid_names() {
        let err = registry().get("fedora").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("fedora"));
        assert!(msg.contains("debian:buster, debian:buster-slim, archlinux, alpine:3.12"));
    }

    #[test]
    fn test_lookup_by_slug() {
        let registry = registry();
        assert_eq!(registry.get("alpine-3.12").unwrap().name(), "alpine:3.12");
    }

    #[test]
    fn test_missing_toolchain_fails_registry() {
        let mut tables = debian::tables();
        tables.toolchains.remove(&Arch::S390x);
        let err = Registry::new(vec![Distro::new("debian:buster", Family::DebianLike, tables)])
            .unwrap_err();
        assert!(matches!(
            err,
            MatrixError::MissingEntry { table: "toolchain", .. }
        ));
    }

    #[test]
    fn test_empty_compiler_set_fails() {
        let mut tables = alpine::tables();
        tables.compilers_by_host.insert(Arch::I386, Vec::new());
        let err = Distro::new("alpine:3.12", Family::AlpineLike, tables)
            .validate()
            .unwrap_err();
        assert!(matches!(err, MatrixError::EmptyCompilerSet { .. }));
    }

    #[test]
    fn test_unserved_compiler_fails_registry() {
        let mut tables = archlinux::tables();
        for compilers in tables.compilers_by_host.values_mut() {
            compilers.retain(|c| *c != Arch::ArmV6);
        }
        tables.compilers_by_host.insert(Arch::ArmV6, vec![Arch::ArmV7]);
        let err = Registry::new(vec![Distro::new("archlinux", Family::ArchLinuxLike, tables)])
            .unwrap_err();
        match err {
            MatrixError::UnservedCompiler { compiler, .. } => assert_eq!(compiler, "arm/v6"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_archlinux_flags() {
        let registry = registry();
        let archlinux = registry.get("archlinux").unwrap();
        assert_eq!(
            archlinux.flag(Arch::Amd64).unwrap(),
            "START_DISTCC_X86_64_PC_LINUX_GNU"
        );
        assert_eq!(archlinux.toolchain(Arch::Amd64).unwrap(), "x86_64-build_pc-linux-gnu");
        assert_eq!(
            archlinux.flag(Arch::ArmV7).unwrap(),
            "START_DISTCC_ARMV7L_UNKNOWN_LINUX_GNUEABIHF"
        );
    }

    #[test]
    fn test_duplicate_port_fails() {
        let mut tables = archlinux::tables();
        tables.ports.insert(Arch::ArmV6, 3705);
        let err = Distro::new("archlinux", Family::ArchLinuxLike, tables)
            .validate()
            .unwrap_err();
        assert!(matches!(err, MatrixError::DuplicatePort { port: 3705, .. }));
    }

    #[test]
    fn test_duplicate_distro_fails() {
        let err = Registry::new(vec![
            Distro::new("archlinux", Family::ArchLinuxLike, archlinux::tables()),
            Distro::new("archlinux", Family::ArchLinuxLike, archlinux::tables()),
        ])
        .unwrap_err();
        assert!(matches!(err, MatrixError::DuplicateDistro(_)));
    }

    #[test]
    fn test_slug_and_identifier() {
        let registry = registry();
        let distro = registry.get("alpine:3.12").unwrap();
        assert_eq!(distro.slug(), "alpine-3.12");
        assert_eq!(distro.identifier(), "alpine_3_12");
        let slim = registry.get("debian:buster-slim").unwrap();
        assert_eq!(slim.slug(), "debian-buster-slim");
        assert_eq!(slim.identifier(), "debian_buster_slim");
    }

    #[test]
    fn test_compiler_path_part() {
        let registry = registry();
        let debian = registry.get("debian:buster").unwrap();
        assert_eq!(debian.compiler_path_part(Arch::Amd64, Arch::Amd64).unwrap(), "");
        assert_eq!(
            debian.compiler_path_part(Arch::Amd64, Arch::ArmV7).unwrap(),
            "/usr/local/arm-linux-gnueabihf/bin:"
        );
        let alpine = registry.get("alpine:3.12").unwrap();
        assert_eq!(
            alpine.compiler_path_part(Arch::Amd64, Arch::Arm64V8).unwrap(),
            "/usr/lib/gcc-cross/aarch64-alpine-linux-musl/bin:"
        );
    }

    #[test]
    fn test_toolchain_url_only_for_xtools() {
        let registry = registry();
        let debian = registry.get("debian:buster").unwrap();
        assert_eq!(debian.toolchain_url(Arch::Amd64, Arch::I386).unwrap(), None);
        let alpine = registry.get("alpine:3.12").unwrap();
        assert_eq!(
            alpine.toolchain_url(Arch::Amd64, Arch::ArmV7).unwrap().unwrap(),
            "https://github.com/elijahr/x-tools/releases/download/devel-20201227/\
             x-tools--host.alpine3.12-amd64--target.armv7-alpine-linux-musleabihf--devel-20201227.tar.xz"
        );
    }

    #[test]
    fn test_from_image() {
        let registry = registry();
        let archlinux = registry.get("archlinux").unwrap();
        assert_eq!(archlinux.from_image(Arch::Amd64), "archlinux:base-devel");
        assert_eq!(archlinux.from_image(Arch::ArmV7), "lopsided/archlinux:devel");
        let debian = registry.get("debian:buster").unwrap();
        assert_eq!(debian.from_image(Arch::S390x), "debian:buster");
    }

    #[test]
    fn test_debian_host_packages_include_cross_compilers() {
        let registry = registry();
        let debian = registry.get("debian:buster").unwrap();
        let pkgs = debian.host_packages(Arch::S390x).unwrap();
        assert_eq!(
            pkgs,
            vec![
                "build-essential",
                "g++",
                "distcc",
                "lsb-base",
                "gcc-s390x-linux-gnu",
                "g++-s390x-linux-gnu",
                "binutils-s390x-linux-gnu",
            ]
        );
    }

    #[test]
    fn test_resolve_arch_rejects_unsupported() {
        let registry = registry();
        let alpine = registry.get("alpine:3.12").unwrap();
        assert_eq!(alpine.host_arch("arm32v6").unwrap(), Arch::ArmV6);
        let err = alpine.host_arch("s390x").unwrap_err();
        assert!(matches!(err, MatrixError::UnknownArch { role: "host", .. }));
        assert!(alpine.ensure_pair(Arch::I386, Arch::Amd64).is_err());
        assert!(alpine.ensure_pair(Arch::Amd64, Arch::I386).is_ok());
    }
}
