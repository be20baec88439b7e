/*
 * emit.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Layer emission into the host's CSS pipeline.
 */

//! Layer emission.
//!
//! For each entry chunk, the finalized CSS of every referenced layer is
//! handed to the host's CSS post-processing, wrapped in boundary blocks.
//! The host then writes it into the chunk's style sheet (or inlines it into
//! the script), where the rewrite pass finds both the layer markers and the
//! blocks that resolve them.

use uno_layers::{LAYER_IMPORTS, LAYER_MARK_ALL, wrap_layer};

use crate::Result;
use crate::artifact::{OutputOptions, RenderedChunk};
use crate::diagnostic::DiagnosticMessage;
use crate::generate::GenerateResult;
use crate::plugin::{GlobalBuild, css_plugin_error};

impl GlobalBuild {
    /// Render hook, run after hashing. Emits the boundary blocks for `chunk`.
    ///
    /// # Errors
    ///
    /// Fails if extraction, generation, a transformer or a CSS plugin fails.
    pub async fn render_chunk_generate(
        &self,
        chunk: &RenderedChunk,
        options: &OutputOptions,
    ) -> Result<()> {
        if chunk.is_legacy(options) || !chunk.is_entry_bearing() {
            return Ok(());
        }

        let dir = options.dir.as_deref();
        let Some(css_post) = self.bindings.css_post(dir) else {
            self.diagnostics
                .push(DiagnosticMessage::css_post_plugin_missing(dir));
            return Ok(());
        };

        let generated = self.aggregator.generate_all().await?;
        let fake_css_id = self.fake_css_id(chunk);

        // The cached snapshot is shared by every chunk; transform a copy.
        let mut result = GenerateResult::clone(&generated);
        let pipeline = &self.transformers;
        let extractor = self.extractor.as_ref();
        let id = fake_css_id.as_str();
        for layer in self.preflight_layers() {
            result
                .set_layer(&layer, |css| async move {
                    pipeline.run(&css, id, extractor).await
                })
                .await?;
        }

        let css = self.wrap_referenced_layers(&result);
        tracing::debug!(
            chunk = %chunk.file_name,
            layers = self.registry.len(),
            "Emitting layer blocks"
        );

        let css = self.apply_css_transform(&css, &fake_css_id, dir).await?;
        css_post
            .transform(&css, &fake_css_id)
            .await
            .map_err(|err| css_plugin_error(css_post.name(), err))
    }

    /// One boundary block per referenced layer, each preceded by the imports
    /// layer. The mark-all block holds every layer no other block claims.
    fn wrap_referenced_layers(&self, result: &GenerateResult) -> String {
        let imports = result.layer(LAYER_IMPORTS).unwrap_or_default();
        let mut claimed: Vec<&str> = self.registry.layers().collect();
        claimed.push(LAYER_IMPORTS);

        self.registry
            .layers()
            .map(|layer| {
                let content = if layer == LAYER_MARK_ALL {
                    result.layers(&claimed)
                } else {
                    result.layer(layer).unwrap_or_default().to_string()
                };
                format!("{imports}{}", wrap_layer(layer, &content))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::OutputFormat;
    use crate::collaborator::{ContentExtractor, CssPostPlugin, GenerateOptions, RuleGenerator};
    use crate::config::{CSS_POST_PLUGIN_NAME, HostConfig, HostPlugin, PluginConfig};
    use crate::tasks::TokenSet;
    use crate::transform::ContentTransformer;
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::sync::{Arc, Mutex};
    use uno_layers::{extract_layer_block, layer_start_boundary};

    struct LayeredGenerator;

    #[async_trait]
    impl RuleGenerator for LayeredGenerator {
        async fn generate(
            &self,
            _tokens: &BTreeSet<String>,
            _options: GenerateOptions,
        ) -> Result<GenerateResult> {
            Ok(GenerateResult::from_layers([
                ("imports", "@import \"a.css\";"),
                ("preflights", "*{margin:0}"),
                ("default", ".a{color:red}"),
                ("icons", ".i{width:1em}"),
            ]))
        }
    }

    struct AnyExtractor;

    #[async_trait]
    impl ContentExtractor for AnyExtractor {
        fn filter(&self, _code: &str, _id: &str) -> bool {
            true
        }

        async fn extract(&self, _code: &str, _id: &str, _tokens: &TokenSet) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingPost {
        calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl CssPostPlugin for RecordingPost {
        fn name(&self) -> &str {
            CSS_POST_PLUGIN_NAME
        }

        async fn transform(&self, css: &str, id: &str) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((css.to_string(), id.to_string()));
            Ok(())
        }
    }

    struct Comment;

    #[async_trait]
    impl ContentTransformer for Comment {
        fn name(&self) -> &str {
            "comment"
        }

        async fn transform(&self, code: &mut String, _id: &str) -> Result<()> {
            code.insert_str(0, "/*t*/");
            Ok(())
        }
    }

    fn build() -> (GlobalBuild, Arc<RecordingPost>) {
        let post = Arc::new(RecordingPost::default());
        let mut build = GlobalBuild::new(
            PluginConfig::default(),
            Arc::new(LayeredGenerator),
            Arc::new(AnyExtractor),
        )
        .with_transformer(Box::new(Comment));
        build.config_resolved(
            HostConfig::new("/app", "dist").with_plugin(HostPlugin::CssPost(post.clone())),
        );
        (build, post)
    }

    fn entry_chunk() -> RenderedChunk {
        RenderedChunk::new("assets/index.js").with_module("/app/src/__uno.css")
    }

    fn options() -> OutputOptions {
        OutputOptions::new(OutputFormat::Es, "/app/dist")
    }

    #[tokio::test]
    async fn test_named_and_mark_all_blocks() {
        let (mut build, post) = build();
        build.load("/app/src/__uno_icons.css");
        build.load("/app/src/__uno.css");

        build
            .render_chunk_generate(&entry_chunk(), &options())
            .await
            .unwrap();

        let calls = post.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (css, id) = &calls[0];
        assert_eq!(id, "/app/assets/index.js-unocss-hash.css");

        assert_eq!(extract_layer_block("icons", css), Some(".i{width:1em}"));
        // Mark-all holds the unclaimed layers, preflights transformed.
        assert_eq!(
            extract_layer_block(LAYER_MARK_ALL, css),
            Some("/*t*/*{margin:0}.a{color:red}")
        );
        // Imports precede every block.
        assert!(css.starts_with(&format!("@import \"a.css\";{}", layer_start_boundary("icons"))));
        assert_eq!(css.matches("@import").count(), 2);
    }

    #[tokio::test]
    async fn test_cached_result_is_not_transformed_twice() {
        let (mut build, post) = build();
        build.load("/app/src/__uno.css");

        build.render_chunk_generate(&entry_chunk(), &options()).await.unwrap();
        build.render_chunk_generate(&entry_chunk(), &options()).await.unwrap();

        let calls = post.calls.lock().unwrap();
        assert_eq!(calls[0].0, calls[1].0);
        assert_eq!(calls[1].0.matches("/*t*/").count(), 1);
    }

    #[tokio::test]
    async fn test_legacy_and_non_entry_chunks_are_skipped() {
        let (mut build, post) = build();
        build.load("/app/src/__uno.css");

        let legacy = RenderedChunk::new("assets/index-legacy.js").with_module("/app/src/__uno.css");
        build
            .render_chunk_generate(&legacy, &OutputOptions::new(OutputFormat::System, "/app/dist"))
            .await
            .unwrap();
        build
            .render_chunk_generate(&RenderedChunk::new("assets/vendor.js"), &options())
            .await
            .unwrap();

        assert!(post.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_css_post_warns() {
        let (build, post) = build();
        build
            .render_chunk_generate(&entry_chunk(), &OutputOptions::default())
            .await
            .unwrap();

        assert!(post.calls.lock().unwrap().is_empty());
        assert_eq!(build.diagnostics().len(), 1);
    }
}
