/*
 * plugin.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * The global build: state and the scan-phase hooks.
 */

//! The global build.
//!
//! [`GlobalBuild`] owns every piece of per-build state and exposes one method
//! per host bundler hook. The hooks fall into four groups, each in its own
//! module:
//!
//! - scan phase (this module): `config_resolved`, `build_start`, `transform`,
//!   `transform_index_html`, `resolve_id`, `load`, `module_parsed`
//! - hash injection ([`crate::inject`]): `render_chunk_hash`
//! - layer emission ([`crate::emit`]): `render_chunk_generate`
//! - rewrite ([`crate::rewrite`]): `generate_bundle`
//!
//! The registry is only mutated by scan-phase hooks, which take `&mut self`.
//! Render-phase hooks take `&self` so the host may render chunks
//! concurrently.

use std::sync::Arc;

use crate::artifact::RenderedChunk;
use crate::bindings::CssPluginBindings;
use crate::collaborator::{ContentExtractor, CssTransformOutput, RuleGenerator};
use crate::config::{HostConfig, PluginConfig};
use crate::diagnostic::Diagnostics;
use crate::generate::ContentAggregator;
use crate::registry::LayerRegistry;
use crate::tasks::TokenSet;
use crate::transform::{ContentTransformer, TransformPipeline};
use crate::{BuildError, Result};

/// Suffix of the synthetic CSS module attached to entry chunks.
const FAKE_CSS_SUFFIX: &str = "-unocss-hash.css";

/// State and hooks of a global-mode build.
pub struct GlobalBuild {
    pub(crate) config: PluginConfig,
    pub(crate) host: Option<HostConfig>,
    pub(crate) registry: LayerRegistry,
    pub(crate) aggregator: ContentAggregator,
    pub(crate) generator: Arc<dyn RuleGenerator>,
    pub(crate) extractor: Arc<dyn ContentExtractor>,
    pub(crate) transformers: TransformPipeline,
    pub(crate) bindings: CssPluginBindings,
    pub(crate) diagnostics: Diagnostics,
    /// Set once any layer marker has been substituted. Survives
    /// `build_start`, so a later build pipeline (SSR) can tell that an
    /// earlier one already emitted the CSS.
    pub(crate) replaced: bool,
}

impl GlobalBuild {
    pub fn new(
        config: PluginConfig,
        generator: Arc<dyn RuleGenerator>,
        extractor: Arc<dyn ContentExtractor>,
    ) -> Self {
        Self {
            config,
            host: None,
            registry: LayerRegistry::new(),
            aggregator: ContentAggregator::new(Arc::clone(&generator)),
            generator,
            extractor,
            transformers: TransformPipeline::new(),
            bindings: CssPluginBindings::new(),
            diagnostics: Diagnostics::new(),
            replaced: false,
        }
    }

    /// Add a transformer applied to preflight layers.
    pub fn with_transformer(mut self, transformer: Box<dyn ContentTransformer>) -> Self {
        self.transformers.push(transformer);
        self
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// The host configuration, once `config_resolved` has run.
    pub fn host(&self) -> Option<&HostConfig> {
        self.host.as_ref()
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    pub fn aggregator(&self) -> &ContentAggregator {
        &self.aggregator
    }

    /// Tokens collected so far.
    pub fn tokens(&self) -> &TokenSet {
        self.aggregator.tokens()
    }

    pub fn transformers(&self) -> &TransformPipeline {
        &self.transformers
    }

    /// Warnings reported during the build.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Whether any layer marker has been substituted yet.
    pub fn replaced(&self) -> bool {
        self.replaced
    }

    /// The host's configuration is final. Binds its CSS plugins to every
    /// output directory.
    pub fn config_resolved(&mut self, host: HostConfig) {
        self.bindings.bind(&host);
        self.host = Some(host);
    }

    /// A new build begins.
    pub fn build_start(&mut self) {
        tracing::debug!("Build started");
        self.registry.clear();
        self.aggregator.reset();
    }

    /// A module is being transformed. Queues a scan if the extractor wants
    /// the module.
    pub fn transform(&self, code: &str, id: &str) {
        if self.extractor.filter(code, id) {
            self.enqueue_extraction(code, id);
        }
    }

    /// The HTML entry is being transformed. Always scanned.
    pub fn transform_index_html(&self, code: &str, filename: &str) {
        self.enqueue_extraction(code, filename);
    }

    /// Resolve an import. Returns the canonical id for virtual CSS entries.
    pub fn resolve_id(&mut self, id: &str, importer: Option<&str>) -> Option<String> {
        self.registry.resolve(id, importer)
    }

    /// Load a module. Returns placeholder content for layer modules.
    pub fn load(&mut self, id: &str) -> Option<String> {
        self.registry.load(id)
    }

    /// A module has been parsed and its imports are known.
    pub fn module_parsed(&mut self, id: &str, imported_ids: &[String]) {
        self.registry.on_graph_parsed(id, imported_ids);
    }

    /// Id of the synthetic CSS module attached to `chunk`.
    pub fn fake_css_id(&self, chunk: &RenderedChunk) -> String {
        let root = self.host.as_ref().map_or("", |host| host.root.as_str());
        format!("{root}/{}{FAKE_CSS_SUFFIX}", chunk.file_name)
    }

    /// Run `css` through the CSS plugin bound to `dir`.
    ///
    /// Returns `css` unchanged when CSS processing is turned off, no plugin
    /// is bound, or the plugin does not handle the module. Otherwise line
    /// breaks are removed from the plugin's output.
    ///
    /// # Errors
    ///
    /// Fails if the plugin fails.
    pub async fn apply_css_transform(
        &self,
        css: &str,
        id: &str,
        dir: Option<&str>,
    ) -> Result<String> {
        if !self.config.postcss {
            return Ok(css.to_string());
        }
        let Some(plugin) = self.bindings.css(dir) else {
            return Ok(css.to_string());
        };

        let output = plugin
            .transform(css, id)
            .await
            .map_err(|err| css_plugin_error(plugin.name(), err))?;
        let transformed = match output {
            None => return Ok(css.to_string()),
            Some(CssTransformOutput::Code(code)) => code,
            Some(CssTransformOutput::Object { code: Some(code) }) if !code.is_empty() => code,
            Some(CssTransformOutput::Object { .. }) => css.to_string(),
        };

        Ok(transformed.replace(['\n', '\r'], ""))
    }

    /// Layers whose CSS goes through the transformer pipeline.
    pub(crate) fn preflight_layers(&self) -> Vec<String> {
        let mut layers: Vec<String> = Vec::new();
        for layer in self
            .generator
            .preflight_layers()
            .into_iter()
            .chain([uno_layers::LAYER_PREFLIGHTS.to_string()])
        {
            if !layers.contains(&layer) {
                layers.push(layer);
            }
        }
        layers
    }

    fn enqueue_extraction(&self, code: &str, id: &str) {
        let extractor = Arc::clone(&self.extractor);
        let tokens = self.aggregator.tokens().clone();
        let code = code.to_string();
        let id = id.to_string();

        tracing::trace!(id = %id, "Queueing extraction");
        self.aggregator.tasks().enqueue(async move {
            extractor.extract(&code, &id, &tokens).await
        });
    }
}

impl std::fmt::Debug for GlobalBuild {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalBuild")
            .field("config", &self.config)
            .field("host", &self.host)
            .field("registry", &self.registry)
            .field("aggregator", &self.aggregator)
            .field("transformers", &self.transformers)
            .field("bindings", &self.bindings)
            .field("replaced", &self.replaced)
            .finish_non_exhaustive()
    }
}

/// Attribute a delegate failure to the host plugin that raised it.
pub(crate) fn css_plugin_error(plugin: &str, err: BuildError) -> BuildError {
    match err {
        err @ BuildError::CssPlugin { .. } => err,
        other => BuildError::CssPlugin {
            plugin: plugin.to_string(),
            message: other.to_string(),
        },
    }
}
