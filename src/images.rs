//! Image and manifest naming.
//!
//! Per-architecture images are pushed to a scratch repository and then
//! aggregated into multi-architecture manifests in the public repositories.

use serde::Deserialize;

use crate::arch::Arch;
use crate::registry::{slugify, Distro};

pub const DEFAULT_HOST_PKG: &str = "elijahru/build-farm";
pub const DEFAULT_CLIENT_PKG: &str = "elijahru/build-farm-client";
pub const DEFAULT_TMP_PKG: &str = "elijahru/tmp";

/// Which side of the farm an image belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Runs distccd.
    Host,
    /// Runs distcc against a host.
    Client,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Host => "host",
            Role::Client => "client",
        }
    }
}

/// Repositories the farm publishes to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ImageNames {
    pub host_pkg: String,
    pub client_pkg: String,
    pub tmp_pkg: String,
}

impl Default for ImageNames {
    fn default() -> Self {
        Self {
            host_pkg: DEFAULT_HOST_PKG.to_string(),
            client_pkg: DEFAULT_CLIENT_PKG.to_string(),
            tmp_pkg: DEFAULT_TMP_PKG.to_string(),
        }
    }
}

impl ImageNames {
    fn pkg(&self, role: Role) -> &str {
        match role {
            Role::Host => &self.host_pkg,
            Role::Client => &self.client_pkg,
        }
    }

    /// Per-architecture image, e.g.
    /// `elijahru/tmp:build-farm--debian-buster--arm32v7--1.0`.
    pub fn image_tag(&self, role: Role, distro: &Distro, arch: Arch, version: &str) -> String {
        let pkg = self.pkg(role);
        let repo = pkg.split_once('/').map_or(pkg, |(_, repo)| repo);
        format!(
            "{}:{}--{}--{}--{}",
            self.tmp_pkg,
            slugify(repo, '-', ""),
            distro.slug(),
            arch.slug(),
            version
        )
    }

    /// Manifest that always points at the most recently published version.
    pub fn simple_manifest_tag(&self, role: Role, distro: &Distro) -> String {
        format!("{}:{}", self.pkg(role), distro.slug())
    }

    pub fn versioned_manifest_tag(&self, role: Role, distro: &Distro, version: &str) -> String {
        format!("{}:{}--{}", self.pkg(role), distro.slug(), version)
    }

    /// Versioned manifest first, then the simple one.
    pub fn manifest_tags(&self, role: Role, distro: &Distro, version: &str) -> [String; 2] {
        [
            self.versioned_manifest_tag(role, distro, version),
            self.simple_manifest_tag(role, distro),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    #[test]
    fn test_image_tags() {
        let registry = Registry::builtin().unwrap();
        let distro = registry.get("debian:buster").unwrap();
        let names = ImageNames::default();

        assert_eq!(
            names.image_tag(Role::Host, distro, Arch::ArmV7, "1.2"),
            "elijahru/tmp:build-farm--debian-buster--arm32v7--1.2"
        );
        assert_eq!(
            names.image_tag(Role::Client, distro, Arch::Amd64, "1.2"),
            "elijahru/tmp:build-farm-client--debian-buster--amd64--1.2"
        );
    }

    #[test]
    fn test_manifest_tags() {
        let registry = Registry::builtin().unwrap();
        let distro = registry.get("alpine:3.12").unwrap();
        let names = ImageNames::default();

        assert_eq!(
            names.manifest_tags(Role::Client, distro, "0.3"),
            [
                "elijahru/build-farm-client:alpine-3.12--0.3".to_string(),
                "elijahru/build-farm-client:alpine-3.12".to_string(),
            ]
        );
    }

    #[test]
    fn test_repo_without_namespace() {
        let registry = Registry::builtin().unwrap();
        let distro = registry.get("archlinux").unwrap();
        let names = ImageNames {
            host_pkg: "farm".into(),
            client_pkg: "farm-client".into(),
            tmp_pkg: "localhost:5000/tmp".into(),
        };
        assert_eq!(
            names.image_tag(Role::Host, distro, Arch::Amd64, "dev"),
            "localhost:5000/tmp:farm--archlinux--amd64--dev"
        );
    }
}
