/*
 * collaborator.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Interfaces to the components this crate drives but does not implement.
 */

//! Collaborator interfaces.
//!
//! - [`RuleGenerator`] - turns a token set into per-layer CSS
//! - [`ContentExtractor`] - scans module source for utility tokens
//! - [`CssPlugin`] - the host's CSS preprocessing step (PostCSS etc.)
//! - [`CssPostPlugin`] - the host's CSS post-processing step, which attaches
//!   CSS to chunks and emits the final style sheets
//!
//! All of them are async and `Send + Sync` so a single build can hold them
//! behind `Arc` and call them from interleaved chunk callbacks.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::Result;
use crate::generate::GenerateResult;
use crate::tasks::TokenSet;

/// Options for a generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GenerateOptions {
    /// Produce minified CSS
    pub minify: bool,
}

/// The atomic-CSS rule generator.
#[async_trait]
pub trait RuleGenerator: Send + Sync {
    /// Generate CSS for `tokens`.
    ///
    /// The returned layers must be in the order they should appear in the
    /// final style sheet.
    async fn generate(
        &self,
        tokens: &BTreeSet<String>,
        options: GenerateOptions,
    ) -> Result<GenerateResult>;

    /// Layers the generator's preflights write to, besides `preflights`.
    fn preflight_layers(&self) -> Vec<String> {
        Vec::new()
    }
}

/// The source scanner.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Whether a module should be scanned at all.
    fn filter(&self, code: &str, id: &str) -> bool;

    /// Scan `code` and add every utility token found to `tokens`.
    async fn extract(&self, code: &str, id: &str, tokens: &TokenSet) -> Result<()>;
}

/// Output of a [`CssPlugin`] transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CssTransformOutput {
    /// The transformed CSS
    Code(String),
    /// A result object; `code` is absent when the plugin left the CSS alone
    Object { code: Option<String> },
}

/// The host's CSS preprocessing plugin.
#[async_trait]
pub trait CssPlugin: Send + Sync {
    fn name(&self) -> &str;

    /// Transform `css` as if it were the content of module `id`.
    ///
    /// `None` means the plugin did not handle the module.
    async fn transform(&self, css: &str, id: &str) -> Result<Option<CssTransformOutput>>;
}

/// The host's CSS post-processing plugin.
#[async_trait]
pub trait CssPostPlugin: Send + Sync {
    fn name(&self) -> &str;

    /// Record `css` as the content of module `id`.
    ///
    /// Whatever is recorded for a module that is part of a chunk ends up in
    /// that chunk's style sheet.
    async fn transform(&self, css: &str, id: &str) -> Result<()>;
}
