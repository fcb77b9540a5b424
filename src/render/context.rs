//! Template context construction.
//!
//! Contexts are plain data computed from the registry: no I/O, no state,
//! and the same inputs always give an identical context. Top-level keys are
//! flat; list-valued keys (`hosts`, `compilers`, `host_compilers`) carry
//! the matrix rows templates iterate over.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::arch::Arch;
use crate::error::MatrixError;
use crate::images::{ImageNames, Role};
use crate::registry::{Distro, Registry};

/// Key/value mapping handed to the template engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderContext {
    values: BTreeMap<String, Value>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn to_tera(&self) -> tera::Result<tera::Context> {
        tera::Context::from_serialize(&self.values)
    }
}

/// Distribution-level context: no host or compiler selected.
///
/// Image tags are only present when a `version` is given, so templates that
/// need them fail loudly when rendered without one.
pub fn distro_context(
    distro: &Distro,
    images: &ImageNames,
    version: Option<&str>,
) -> Result<RenderContext, MatrixError> {
    let mut ctx = RenderContext::new();
    ctx.insert("distro", distro_value(distro, images, version));

    let mut hosts = Vec::with_capacity(distro.host_archs().len());
    for host in distro.host_archs() {
        let mut entry = arch_value(*host);
        entry.insert("from_image".into(), distro.from_image(*host).into());
        entry.insert(
            "packages".into(),
            distro.host_packages(*host)?.join(" ").into(),
        );
        if let Some(version) = version {
            entry.insert(
                "image".into(),
                images.image_tag(Role::Host, distro, *host, version).into(),
            );
        }
        let compilers = distro
            .compilers_for(*host)?
            .iter()
            .map(|compiler| compiler_value(distro, images, version, Some(*host), *compiler))
            .collect::<Result<Vec<_>, _>>()?;
        entry.insert("compilers".into(), compilers.into());
        hosts.push(Value::Object(entry));
    }
    ctx.insert("hosts", hosts);

    let compilers = distro
        .compiler_archs()
        .iter()
        .map(|compiler| compiler_value(distro, images, version, None, *compiler))
        .collect::<Result<Vec<_>, _>>()?;
    ctx.insert("compilers", compilers);

    if let Some(version) = version {
        ctx.insert("version", version);
    }
    Ok(ctx)
}

/// Context for one matrix cell: a host, and optionally one of its compilers.
pub fn cell_context(
    distro: &Distro,
    images: &ImageNames,
    version: Option<&str>,
    host: Arch,
    compiler: Option<Arch>,
) -> Result<RenderContext, MatrixError> {
    if !distro.host_archs().contains(&host) {
        return Err(MatrixError::UnknownArch {
            distro: distro.name().to_string(),
            role: "host",
            arch: host.to_string(),
            valid: distro.host_archs().iter().map(|a| a.to_string()).collect(),
        });
    }
    if let Some(compiler) = compiler {
        distro.ensure_pair(host, compiler)?;
    }

    let mut ctx = distro_context(distro, images, version)?;

    ctx.insert("host_arch", host.as_str());
    ctx.insert("host_arch_slug", host.slug());
    ctx.insert("host_platform", host.platform());
    ctx.insert("from_image", distro.from_image(host));
    ctx.insert("host_packages", distro.host_packages(host)?.join(" "));
    let host_compilers = distro
        .compilers_for(host)?
        .iter()
        .map(|c| compiler_value(distro, images, version, Some(host), *c))
        .collect::<Result<Vec<_>, _>>()?;
    ctx.insert("host_compilers", host_compilers);
    if let Some(version) = version {
        ctx.insert(
            "host_image",
            images.image_tag(Role::Host, distro, host, version),
        );
    }

    if let Some(compiler) = compiler {
        ctx.insert("compiler_arch", compiler.as_str());
        ctx.insert("compiler_arch_slug", compiler.slug());
        ctx.insert("compiler_platform", compiler.platform());
        ctx.insert("compiler_port", distro.port(compiler)?);
        ctx.insert("toolchain", distro.toolchain(compiler)?);
        ctx.insert("compiler_path_part", distro.compiler_path_part(host, compiler)?);
        ctx.insert("flag", distro.flag(compiler)?);
        ctx.insert("packages", distro.packages(compiler)?.join(" "));
        ctx.insert(
            "toolchain_url",
            distro
                .toolchain_url(host, compiler)?
                .map_or(Value::Null, Value::from),
        );
        if let Some(version) = version {
            ctx.insert(
                "client_image",
                images.image_tag(Role::Client, distro, compiler, version),
            );
        }
    }

    Ok(ctx)
}

/// README context: project metadata plus one entry per distribution, both in
/// a `distros` list (registry order) and under the distribution identifier.
pub fn readme_context(
    registry: &Registry,
    images: &ImageNames,
    project_name: &str,
    repo: &str,
) -> Result<RenderContext, MatrixError> {
    let mut ctx = RenderContext::new();
    ctx.insert("project_name", project_name);
    ctx.insert("repo", repo);

    let mut distros = Vec::new();
    for distro in registry.iter() {
        let mut entry = distro_value(distro, images, None);
        let rows = distro_context(distro, images, None)?;
        if let Value::Object(map) = &mut entry {
            for key in ["hosts", "compilers"] {
                if let Some(value) = rows.get(key) {
                    map.insert(key.into(), value.clone());
                }
            }
        }
        ctx.insert(distro.identifier(), entry.clone());
        distros.push(entry);
    }
    ctx.insert("distros", distros);
    Ok(ctx)
}

fn distro_value(distro: &Distro, images: &ImageNames, version: Option<&str>) -> Value {
    let archs = |archs: &[Arch]| archs.iter().map(|a| a.as_str()).collect::<Vec<_>>();
    let mut value = json!({
        "name": distro.name(),
        "slug": distro.slug(),
        "identifier": distro.identifier(),
        "family": distro.family().template_dir(),
        "init_system": distro.family().init_system().as_str(),
        "xtools_release": distro.family().xtools_release(),
        "host_archs": archs(distro.host_archs()),
        "compiler_archs": archs(distro.compiler_archs()),
        "host_manifest_tag": images.simple_manifest_tag(Role::Host, distro),
        "client_manifest_tag": images.simple_manifest_tag(Role::Client, distro),
    });
    if let (Some(version), Value::Object(map)) = (version, &mut value) {
        map.insert(
            "host_versioned_manifest_tag".into(),
            images
                .versioned_manifest_tag(Role::Host, distro, version)
                .into(),
        );
        map.insert(
            "client_versioned_manifest_tag".into(),
            images
                .versioned_manifest_tag(Role::Client, distro, version)
                .into(),
        );
    }
    value
}

fn arch_value(arch: Arch) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("arch".into(), arch.as_str().into());
    map.insert("slug".into(), arch.slug().into());
    map.insert("platform".into(), arch.platform().into());
    map
}

fn compiler_value(
    distro: &Distro,
    images: &ImageNames,
    version: Option<&str>,
    host: Option<Arch>,
    compiler: Arch,
) -> Result<Value, MatrixError> {
    let mut entry = arch_value(compiler);
    entry.insert("port".into(), distro.port(compiler)?.into());
    entry.insert("toolchain".into(), distro.toolchain(compiler)?.into());
    entry.insert("flag".into(), distro.flag(compiler)?.into());
    entry.insert("packages".into(), distro.packages(compiler)?.join(" ").into());
    if let Some(host) = host {
        entry.insert(
            "path_part".into(),
            distro.compiler_path_part(host, compiler)?.into(),
        );
        entry.insert(
            "toolchain_url".into(),
            distro
                .toolchain_url(host, compiler)?
                .map_or(Value::Null, Value::from),
        );
    }
    if let Some(version) = version {
        entry.insert(
            "image".into(),
            images
                .image_tag(Role::Client, distro, compiler, version)
                .into(),
        );
    }
    Ok(Value::Object(entry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_context_is_idempotent() {
        let registry = Registry::builtin().unwrap();
        let distro = registry.get("debian:buster").unwrap();
        let images = ImageNames::default();

        let first =
            cell_context(distro, &images, Some("1.0"), Arch::Amd64, Some(Arch::ArmV7)).unwrap();
        let second =
            cell_context(distro, &images, Some("1.0"), Arch::Amd64, Some(Arch::ArmV7)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_compiler_cell_keys() {
        let registry = Registry::builtin().unwrap();
        let distro = registry.get("debian:buster").unwrap();
        let images = ImageNames::default();

        let ctx =
            cell_context(distro, &images, Some("1.0"), Arch::Amd64, Some(Arch::ArmV7)).unwrap();
        assert_eq!(ctx.get("compiler_port"), Some(&json!(3607)));
        assert_eq!(ctx.get("toolchain"), Some(&json!("arm-linux-gnueabihf")));
        assert_eq!(
            ctx.get("compiler_path_part"),
            Some(&json!("/usr/local/arm-linux-gnueabihf/bin:"))
        );
        assert_eq!(
            ctx.get("flag"),
            Some(&json!("START_DISTCC_ARM_LINUX_GNUEABIHF"))
        );
        assert_eq!(ctx.get("toolchain_url"), Some(&Value::Null));
        assert_eq!(
            ctx.get("client_image"),
            Some(&json!("elijahru/tmp:build-farm-client--debian-buster--arm32v7--1.0"))
        );
    }

    #[test]
    fn test_native_compiler_has_empty_path_part() {
        let registry = Registry::builtin().unwrap();
        let distro = registry.get("alpine:3.12").unwrap();
        let images = ImageNames::default();

        let ctx =
            cell_context(distro, &images, Some("1.0"), Arch::ArmV6, Some(Arch::ArmV6)).unwrap();
        assert_eq!(ctx.get("compiler_path_part"), Some(&json!("")));
    }

    #[test]
    fn test_host_cell_lists_host_compilers_in_order() {
        let registry = Registry::builtin().unwrap();
        let distro = registry.get("debian:buster").unwrap();
        let images = ImageNames::default();

        let ctx = cell_context(distro, &images, Some("1.0"), Arch::Ppc64le, None).unwrap();
        let compilers = ctx.get("host_compilers").unwrap().as_array().unwrap();
        let archs: Vec<&str> = compilers
            .iter()
            .map(|c| c["arch"].as_str().unwrap())
            .collect();
        assert_eq!(archs, vec!["amd64", "386", "arm64/v8", "ppc64le"]);
        assert!(!ctx.contains_key("compiler_arch"));
    }

    #[test]
    fn test_unsupported_pair_is_rejected() {
        let registry = Registry::builtin().unwrap();
        let distro = registry.get("debian:buster").unwrap();
        let images = ImageNames::default();

        let err = cell_context(distro, &images, None, Arch::S390x, Some(Arch::Amd64)).unwrap_err();
        assert!(matches!(err, MatrixError::UnsupportedPair { .. }));
    }

    #[test]
    fn test_versionless_context_has_no_image_tags() {
        let registry = Registry::builtin().unwrap();
        let distro = registry.get("archlinux").unwrap();
        let images = ImageNames::default();

        let ctx = distro_context(distro, &images, None).unwrap();
        assert!(!ctx.contains_key("version"));
        assert!(ctx.get("distro").unwrap().get("host_versioned_manifest_tag").is_none());
        let hosts = ctx.get("hosts").unwrap().as_array().unwrap();
        assert_eq!(hosts.len(), 5);
        assert!(hosts[0].get("image").is_none());
    }

    #[test]
    fn test_readme_context_lists_every_distro() {
        let registry = Registry::builtin().unwrap();
        let images = ImageNames::default();
        let ctx = readme_context(&registry, &images, "build-farm", "elijahr/build-farm").unwrap();

        let names: Vec<_> = ctx
            .get("distros")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec!["debian:buster", "debian:buster-slim", "archlinux", "alpine:3.12"]
        );
        assert_eq!(ctx.get("debian_buster_slim").unwrap()["slug"], "debian-buster-slim");
        assert!(ctx.get("alpine_3_12").unwrap()["hosts"].is_array());
    }
}
