//! Template rendering.
//!
//! - [`context`] - pure context construction from the registry
//! - [`plan`] - which templates render to which outputs for a distribution
//! - [`files`] - output writing and static build-context copies
//! - [`yaml`] - alias expansion for rendered workflow files
//!
//! Templates are Tera templates. Undefined variables are errors, in
//! conditions as well as in `{{ }}` blocks, so any drift between the matrix
//! and the templates stops the render pass.

pub mod context;
pub mod files;
pub mod plan;
mod strict;
pub mod yaml;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tera::{Tera, Value};
use tracing::debug;

use crate::arch::arch_slug;
use crate::error::RenderError;
use crate::registry::slugify;
use context::RenderContext;

/// Suffix of template files; anything else in a template tree is copied verbatim.
pub const TEMPLATE_SUFFIX: &str = ".tera";

/// Renders templates from a templates root directory.
pub struct Renderer {
    root: PathBuf,
    tera: Tera,
}

impl Renderer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.register_filter("arch_slug", arch_slug_filter);
        tera.register_filter("slugify", slugify_filter);
        strict::register(&mut tera);
        Self {
            root: root.into(),
            tera,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Render `template` (relative to the templates root) to a string.
    pub fn render_to_string(
        &mut self,
        template: &Path,
        ctx: &RenderContext,
    ) -> Result<String, RenderError> {
        let path = self.root.join(template);
        if !path.is_file() {
            return Err(RenderError::MissingTemplate { path });
        }
        let source = fs::read_to_string(&path).map_err(|source| RenderError::Read {
            path: path.clone(),
            source,
        })?;

        let name = template.to_string_lossy().into_owned();
        let template_err = |source| RenderError::Template {
            template: name.clone(),
            source,
        };
        self.tera
            .add_raw_template(&name, &source)
            .map_err(template_err)?;
        strict::harden(&mut self.tera, &name);
        let tera_ctx = ctx.to_tera().map_err(template_err)?;
        let rendered = self.tera.render(&name, &tera_ctx).map_err(template_err)?;
        debug!("rendered {} ({} bytes)", name, rendered.len());
        Ok(rendered)
    }

    /// Render `template` and write it to `out`, creating parent directories.
    pub fn render(
        &mut self,
        template: &Path,
        out: &Path,
        ctx: &RenderContext,
    ) -> Result<PathBuf, RenderError> {
        let rendered = self.render_to_string(template, ctx)?;
        files::write_output(out, &with_header(&rendered, template))?;
        Ok(out.to_path_buf())
    }
}

/// Insert `# Rendered from <template>` as the first line, or right after a shebang.
pub fn with_header(rendered: &str, template: &Path) -> String {
    let header = format!("# Rendered from {}\n", template.display());
    let mut lines: Vec<&str> = rendered.split('\n').collect();
    let at = usize::from(lines.first().is_some_and(|l| l.starts_with("#!")));
    lines.insert(at, &header);
    lines.join("\n")
}

fn arch_slug_filter(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let arch = tera::try_get_value!("arch_slug", "value", String, value);
    Ok(Value::String(arch_slug(&arch)))
}

fn slugify_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let text = tera::try_get_value!("slugify", "value", String, value);
    let delim = match args.get("delim") {
        Some(delim) => tera::try_get_value!("slugify", "delim", String, delim),
        None => "-".to_string(),
    };
    let allowed = match args.get("allowed") {
        Some(allowed) => tera::try_get_value!("slugify", "allowed", String, allowed),
        None => String::new(),
    };
    let delim = delim.chars().next().unwrap_or('-');
    Ok(Value::String(slugify(&text, delim, &allowed)))
}
