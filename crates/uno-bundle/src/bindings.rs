/*
 * bindings.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Host CSS plugins bound per output directory.
 */

//! Per-output-directory plugin bindings.
//!
//! A single build can write to several output directories (library mode with
//! multiple bundler outputs). Chunk callbacks report the directory they are
//! rendering for, and the CSS delegates are looked up by that directory.

use std::collections::HashMap;
use std::sync::Arc;

use crate::collaborator::{CssPlugin, CssPostPlugin};
use crate::config::HostConfig;

#[derive(Clone, Default)]
pub struct CssPluginBindings {
    css: HashMap<String, Arc<dyn CssPlugin>>,
    css_post: HashMap<String, Arc<dyn CssPostPlugin>>,
}

impl CssPluginBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the host's CSS plugins to every output directory it may write to.
    pub fn bind(&mut self, host: &HostConfig) {
        let dirs = host.dist_dirs();

        if let Some(css_post) = host.css_post_plugin() {
            for dir in &dirs {
                self.css_post.insert(dir.clone(), Arc::clone(&css_post));
            }
        }
        if let Some(css) = host.css_plugin() {
            for dir in &dirs {
                self.css.insert(dir.clone(), Arc::clone(&css));
            }
        }

        tracing::debug!(
            dirs = ?dirs,
            css = !self.css.is_empty(),
            css_post = !self.css_post.is_empty(),
            "Bound host CSS plugins"
        );
    }

    /// CSS preprocessing plugin for `dir`.
    pub fn css(&self, dir: Option<&str>) -> Option<&Arc<dyn CssPlugin>> {
        dir.and_then(|dir| self.css.get(dir))
    }

    /// CSS post-processing plugin for `dir`.
    pub fn css_post(&self, dir: Option<&str>) -> Option<&Arc<dyn CssPostPlugin>> {
        dir.and_then(|dir| self.css_post.get(dir))
    }
}

impl std::fmt::Debug for CssPluginBindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut css: Vec<_> = self.css.keys().collect();
        let mut css_post: Vec<_> = self.css_post.keys().collect();
        css.sort();
        css_post.sort();
        f.debug_struct("CssPluginBindings")
            .field("css", &css)
            .field("css_post", &css_post)
            .finish()
    }
}
