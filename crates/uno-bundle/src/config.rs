/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Plugin options and the resolved host configuration.
 */

//! Configuration.
//!
//! [`PluginConfig`] holds the user-facing options and deserializes from the
//! same camelCase keys the JavaScript integration accepts:
//!
//! ```json
//! { "postcss": false, "checkImport": true, "legacy": { "renderModernChunks": false } }
//! ```
//!
//! [`HostConfig`] is what the host bundler reports once its own
//! configuration is resolved: the project root, the output directories, and
//! the CSS plugins it registered.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::collaborator::{CssPlugin, CssPostPlugin};

/// Name of the host's CSS preprocessing plugin.
pub const CSS_PLUGIN_NAME: &str = "vite:css";

/// Name of the host's CSS post-processing plugin.
pub const CSS_POST_PLUGIN_NAME: &str = "vite:css-post";

/// User-facing options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginConfig {
    /// Run generated CSS through the host's CSS preprocessing plugin.
    pub postcss: bool,

    /// Warn when no module imports a virtual `uno.css` entry.
    pub check_import: bool,

    /// Legacy (SystemJS) chunk handling. `None` when the build has no
    /// legacy output.
    pub legacy: Option<LegacyConfig>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            postcss: true,
            check_import: false,
            legacy: None,
        }
    }
}

impl PluginConfig {
    /// Whether legacy chunks get their own CSS.
    ///
    /// Only when legacy output is configured and modern CSS is not rendered
    /// into the legacy chunks already.
    pub fn renders_legacy_chunks(&self) -> bool {
        matches!(&self.legacy, Some(legacy) if !legacy.render_modern_chunks)
    }
}

/// Legacy chunk options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyConfig {
    /// Modern CSS is rendered into legacy chunks too.
    pub render_modern_chunks: bool,
}

/// A plugin registered with the host bundler.
#[derive(Clone)]
pub enum HostPlugin {
    Css(Arc<dyn CssPlugin>),
    CssPost(Arc<dyn CssPostPlugin>),
}

impl HostPlugin {
    pub fn name(&self) -> &str {
        match self {
            HostPlugin::Css(plugin) => plugin.name(),
            HostPlugin::CssPost(plugin) => plugin.name(),
        }
    }
}

impl std::fmt::Debug for HostPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostPlugin::Css(_) => f.debug_tuple("Css").field(&self.name()).finish(),
            HostPlugin::CssPost(_) => f.debug_tuple("CssPost").field(&self.name()).finish(),
        }
    }
}

/// Resolved host bundler configuration.
#[derive(Debug, Clone, Default)]
pub struct HostConfig {
    /// Project root
    pub root: String,

    /// Primary output directory, relative to `root` unless absolute
    pub out_dir: String,

    /// Building in library mode
    pub lib: bool,

    /// Extra output directories from the bundler's per-output options
    pub output_dirs: Vec<String>,

    /// Registered plugins
    pub plugins: Vec<HostPlugin>,
}

impl HostConfig {
    pub fn new(root: impl Into<String>, out_dir: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            out_dir: out_dir.into(),
            ..Default::default()
        }
    }

    /// Add an extra output directory.
    pub fn with_output_dir(mut self, dir: impl Into<String>) -> Self {
        self.output_dirs.push(dir.into());
        self
    }

    /// Register a host plugin.
    pub fn with_plugin(mut self, plugin: HostPlugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Mark the build as library mode.
    pub fn library(mut self) -> Self {
        self.lib = true;
        self
    }

    /// Every directory chunks may be written to.
    ///
    /// The primary output directory is resolved against the root. Extra
    /// output directories are listed as given, and also resolved against the
    /// root when relative, since the bundler may report either form.
    pub fn dist_dirs(&self) -> Vec<String> {
        let mut dirs = vec![resolve_path(&self.root, &self.out_dir)];
        for dir in &self.output_dirs {
            dirs.push(dir.clone());
            if !Path::new(dir).is_absolute() {
                dirs.push(resolve_path(&self.root, dir));
            }
        }
        dirs
    }

    /// The registered CSS preprocessing plugin.
    pub fn css_plugin(&self) -> Option<Arc<dyn CssPlugin>> {
        self.plugins.iter().find_map(|plugin| match plugin {
            HostPlugin::Css(css) if css.name() == CSS_PLUGIN_NAME => Some(Arc::clone(css)),
            _ => None,
        })
    }

    /// The registered CSS post-processing plugin.
    pub fn css_post_plugin(&self) -> Option<Arc<dyn CssPostPlugin>> {
        self.plugins.iter().find_map(|plugin| match plugin {
            HostPlugin::CssPost(post) if post.name() == CSS_POST_PLUGIN_NAME => {
                Some(Arc::clone(post))
            }
            _ => None,
        })
    }
}

/// Join `path` onto `base` and normalize `.` and `..` lexically.
fn resolve_path(base: &str, path: &str) -> String {
    let joined = Path::new(base).join(path);
    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized.to_string_lossy().into_owned()
}
