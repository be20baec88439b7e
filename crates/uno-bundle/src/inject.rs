/*
 * inject.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Hash injection into entry chunks.
 */

//! Hash injection.
//!
//! Chunk file names are content-addressed, and the host computes the address
//! before the real CSS exists. To make the address change whenever the CSS
//! does, every entry chunk gets a synthetic CSS module whose only content is
//! a hash marker carrying the hash of the current CSS. The marker is erased
//! again by the rewrite pass.

use uno_layers::{content_hash, hash_placeholder};

use crate::Result;
use crate::artifact::{OutputOptions, RenderedChunk, RenderedModule};
use crate::diagnostic::DiagnosticMessage;
use crate::plugin::{GlobalBuild, css_plugin_error};

/// Id legacy chunks record their CSS under.
const LEGACY_CSS_ID: &str = "/__uno.css";

impl GlobalBuild {
    /// Render hook, run before the host hashes the chunk.
    ///
    /// Returns the injected hash, or `None` when the chunk was left alone
    /// (not an entry chunk, a legacy chunk not rendered separately, or a
    /// legacy chunk whose CSS is pushed directly).
    ///
    /// # Errors
    ///
    /// Fails if extraction, generation or a CSS plugin fails.
    pub async fn render_chunk_hash(
        &self,
        chunk: &mut RenderedChunk,
        options: &OutputOptions,
    ) -> Result<Option<String>> {
        let legacy = chunk.is_legacy(options);
        if legacy && !self.config.renders_legacy_chunks() {
            return Ok(None);
        }
        if !chunk.is_entry_bearing() {
            return Ok(None);
        }

        let dir = options.dir.as_deref();
        let Some(css_post) = self.bindings.css_post(dir) else {
            self.diagnostics
                .push(DiagnosticMessage::css_post_plugin_missing(dir));
            return Ok(None);
        };

        let result = self.aggregator.generate_all().await?;
        let fake_css_id = self.fake_css_id(chunk);
        let css = self
            .apply_css_transform(&result.css(), &fake_css_id, dir)
            .await?;

        let hash = if legacy {
            tracing::debug!(chunk = %chunk.file_name, "Recording legacy CSS");
            css_post
                .transform(&css, LEGACY_CSS_ID)
                .await
                .map_err(|err| css_plugin_error(css_post.name(), err))?;
            None
        } else {
            let hash = content_hash(&css);
            tracing::debug!(chunk = %chunk.file_name, hash = %hash, "Injecting CSS hash");
            css_post
                .transform(&hash_placeholder(&hash), &fake_css_id)
                .await
                .map_err(|err| css_plugin_error(css_post.name(), err))?;
            Some(hash)
        };

        // The host attaches CSS to chunks by module membership.
        chunk.modules.insert(fake_css_id, RenderedModule::default());

        Ok(hash)
    }
}
