/*
 * generate.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Generation snapshots and the content aggregator.
 */

//! Content aggregation.
//!
//! [`ContentAggregator::generate_all`] is the only way CSS is produced during
//! a build. It drains pending extraction tasks, then either returns the
//! cached [`GenerateResult`] or asks the [`RuleGenerator`] for a new one.
//!
//! # Freshness
//!
//! The cache is keyed on the number of tokens, not their content. Tokens are
//! only ever added during a build, so a larger set is a new set. Removing a
//! token and adding a different one leaves the count unchanged and returns
//! the stale snapshot.

use std::future::Future;
use std::sync::Arc;

use hashlink::LinkedHashMap;

use crate::Result;
use crate::collaborator::{GenerateOptions, RuleGenerator};
use crate::tasks::{TaskQueue, TokenSet};

/// Finalized CSS per layer, in output order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateResult {
    layers: LinkedHashMap<String, String>,
}

impl GenerateResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a result from `(layer, css)` pairs in output order.
    pub fn from_layers<I, K, V>(layers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            layers: layers
                .into_iter()
                .map(|(layer, css)| (layer.into(), css.into()))
                .collect(),
        }
    }

    /// CSS for one layer.
    pub fn layer(&self, layer: &str) -> Option<&str> {
        self.layers.get(layer).map(|css| css.as_str())
    }

    /// Concatenated CSS of every layer except the `exclude`d ones, in output
    /// order.
    pub fn layers(&self, exclude: &[&str]) -> String {
        self.layers
            .iter()
            .filter(|(layer, _)| !exclude.contains(&layer.as_str()))
            .map(|(_, css)| css.as_str())
            .collect()
    }

    /// CSS of every layer.
    pub fn css(&self) -> String {
        self.layers(&[])
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(|layer| layer.as_str())
    }

    /// Replace a layer's CSS with `update(css)`. Absent layers are left alone.
    pub async fn set_layer<F, Fut>(&mut self, layer: &str, update: F) -> Result<()>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let Some(css) = self.layers.get(layer).cloned() else {
            return Ok(());
        };
        let updated = update(css).await?;
        if let Some(slot) = self.layers.get_mut(layer) {
            *slot = updated;
        }
        Ok(())
    }
}

struct GenerationCache {
    token_count: usize,
    result: Option<Arc<GenerateResult>>,
}

/// Drains extraction tasks and memoizes generation.
pub struct ContentAggregator {
    generator: Arc<dyn RuleGenerator>,
    tokens: TokenSet,
    tasks: TaskQueue,
    // Held across the drain and the generator call, so a caller never
    // generates before tasks another caller is awaiting have finished.
    // Concurrent callers share one run.
    cache: tokio::sync::Mutex<GenerationCache>,
}

impl ContentAggregator {
    pub fn new(generator: Arc<dyn RuleGenerator>) -> Self {
        Self {
            generator,
            tokens: TokenSet::new(),
            tasks: TaskQueue::new(),
            cache: tokio::sync::Mutex::new(GenerationCache {
                token_count: 0,
                result: None,
            }),
        }
    }

    /// The token set extraction tasks write to.
    pub fn tokens(&self) -> &TokenSet {
        &self.tokens
    }

    /// The pending extraction tasks.
    pub fn tasks(&self) -> &TaskQueue {
        &self.tasks
    }

    /// Forget pending tasks and the cached result. Tokens are kept: they
    /// belong to whoever scans sources outside the bundler as well.
    pub fn reset(&mut self) {
        self.tasks.clear();
        let cache = self.cache.get_mut();
        cache.token_count = 0;
        cache.result = None;
    }

    /// Generate CSS for every token seen so far.
    ///
    /// Every task queued before the call is reflected in the result, even
    /// when another call is already draining it.
    ///
    /// # Errors
    ///
    /// Fails if an extraction task or the generator fails.
    pub async fn generate_all(&self) -> Result<Arc<GenerateResult>> {
        let mut cache = self.cache.lock().await;
        self.tasks.drain().await?;

        let token_count = self.tokens.len();
        if let Some(result) = &cache.result
            && cache.token_count == token_count
        {
            tracing::trace!(tokens = token_count, "Reusing cached generation");
            return Ok(Arc::clone(result));
        }

        let tokens = self.tokens.snapshot();
        tracing::debug!(tokens = tokens.len(), "Generating CSS");
        let result = self
            .generator
            .generate(&tokens, GenerateOptions { minify: true })
            .await?;
        let result = Arc::new(result);

        cache.token_count = tokens.len();
        cache.result = Some(Arc::clone(&result));
        Ok(result)
    }
}

impl std::fmt::Debug for ContentAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentAggregator")
            .field("tokens", &self.tokens.len())
            .field("tasks", &self.tasks)
            .finish_non_exhaustive()
    }
}
