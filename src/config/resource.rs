//! # Resource declaration.
//!
//! A [`Resource`] pairs template definitions with a backend group and is the
//! unit of concurrent work: one worker per resource.
//!
//! ```toml
//! [[resource]]
//! name = "haproxy"
//!
//! [[resource.template]]
//! src = "/etc/resvisor/templates/haproxy.cfg.tmpl"
//! dst = "/etc/haproxy/haproxy.cfg"
//! reload_cmd = "systemctl reload haproxy"
//!
//! [resource.backend.file]
//! filepath = "/etc/resvisor/values.yml"
//! keys = ["/haproxy"]
//! ```

use serde::Deserialize;

use crate::backends::BackendsConfig;

/// One template process definition, consumed by the template engine.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct TemplateConfig {
    /// Template source path.
    pub src: String,
    /// Rendered output path.
    pub dst: String,
    /// Octal file mode of the output, e.g. `"0644"`.
    #[serde(default)]
    pub mode: Option<String>,
    /// Command validating a staged output before it replaces `dst`.
    #[serde(default)]
    pub check_cmd: Option<String>,
    /// Command run after `dst` changed.
    #[serde(default)]
    pub reload_cmd: Option<String>,
}

/// Templates plus the backends they read from.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Resource {
    /// Name used in logs and events; filled in by the loader when absent.
    #[serde(default)]
    pub name: Option<String>,
    /// Template definitions.
    #[serde(default)]
    pub template: Vec<TemplateConfig>,
    /// Backend group.
    #[serde(default)]
    pub backend: BackendsConfig,
}

impl Resource {
    /// Creates a named resource.
    pub fn new(name: impl Into<String>, template: Vec<TemplateConfig>, backend: BackendsConfig) -> Self {
        Self {
            name: Some(name.into()),
            template,
            backend,
        }
    }

    /// Name of the resource, `"resource"` when unnamed.
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("resource")
    }

    /// True if there is nothing to render.
    pub fn is_empty(&self) -> bool {
        self.template.is_empty()
    }
}
