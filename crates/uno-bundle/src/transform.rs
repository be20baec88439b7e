/*
 * transform.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Content transformer pipeline.
 */

//! Content transformer pipeline.
//!
//! - [`ContentTransformer`] - the trait implemented by every transformer
//! - [`TransformPipeline`] - transformers grouped into three stages
//!
//! # Stages
//!
//! Transformers run in three stages, `pre`, `default` and `post`, each in
//! insertion order. A stage's output feeds the next stage. A stage that
//! changes nothing produces no output, and the next stage sees whatever the
//! last stage with output produced (or the raw input).
//!
//! # Ignored and skipped content
//!
//! Content containing `@unocss-ignore` is never transformed. Regions between
//! `@unocss-skip-start` and `@unocss-skip-end` comments (`//`, `/* */` or
//! `<!-- -->`) are swapped for opaque keys while transformers run and
//! restored afterwards.
//!
//! # Example
//!
//! ```ignore
//! use uno_bundle::{ContentTransformer, TransformPipeline, TransformerEnforce};
//!
//! struct Prefix;
//!
//! #[async_trait::async_trait]
//! impl ContentTransformer for Prefix {
//!     fn name(&self) -> &str { "prefix" }
//!
//!     async fn transform(&self, code: &mut String, _id: &str) -> uno_bundle::Result<()> {
//!         code.insert_str(0, "/* generated */");
//!         Ok(())
//!     }
//! }
//!
//! let mut pipeline = TransformPipeline::new();
//! pipeline.push(Box::new(Prefix));
//! let css = pipeline.run(".a{}", "/app/index.js-unocss-hash.css", &extractor).await?;
//! ```

use async_trait::async_trait;
use hashlink::LinkedHashMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use uno_layers::content_hash;

use crate::collaborator::ContentExtractor;
use crate::{BuildError, Result};

/// Content containing this comment is left alone by every transformer.
pub const IGNORE_COMMENT: &str = "@unocss-ignore";

const SKIP_PLACEHOLDER_PREFIX: &str = "@unocss-skip-placeholder-";

static SKIP_COMMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?s)(//\s*?@unocss-skip-start\s*?|/\*\s*?@unocss-skip-start\s*?\*/|<!--\s*?@unocss-skip-start\s*?-->)",
        r".*?",
        r"(//\s*?@unocss-skip-end\s*?|/\*\s*?@unocss-skip-end\s*?\*/|<!--\s*?@unocss-skip-end\s*?-->)",
    ))
    .unwrap()
});

/// Stage a transformer runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransformerEnforce {
    Pre,
    #[default]
    Default,
    Post,
}

/// A transformer applied to generated CSS.
///
/// Transformers must be `Send + Sync` because chunk callbacks for different
/// chunks may run the pipeline concurrently.
#[async_trait]
pub trait ContentTransformer: Send + Sync {
    /// Human-readable name, used in logs and errors.
    fn name(&self) -> &str;

    /// Stage to run in.
    fn enforce(&self) -> TransformerEnforce {
        TransformerEnforce::Default
    }

    /// Whether to run on module `id`.
    ///
    /// `None` defers to the content extractor's filter.
    fn id_filter(&self, _id: &str) -> Option<bool> {
        None
    }

    /// Transform `code` in place.
    ///
    /// # Errors
    ///
    /// Any error fails the build.
    async fn transform(&self, code: &mut String, id: &str) -> Result<()>;
}

/// Transformers grouped by stage.
pub struct TransformPipeline {
    transformers: Vec<Box<dyn ContentTransformer>>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self {
            transformers: Vec::new(),
        }
    }

    /// Add a transformer. Within a stage, transformers run in the order they
    /// are added.
    pub fn push(&mut self, transformer: Box<dyn ContentTransformer>) {
        self.transformers.push(transformer);
    }

    pub fn extend(&mut self, transformers: impl IntoIterator<Item = Box<dyn ContentTransformer>>) {
        self.transformers.extend(transformers);
    }

    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    /// Names of all transformers in execution order.
    pub fn transform_names(&self) -> Vec<&str> {
        [
            TransformerEnforce::Pre,
            TransformerEnforce::Default,
            TransformerEnforce::Post,
        ]
        .into_iter()
        .flat_map(|enforce| self.stage(enforce))
        .map(|t| t.name())
        .collect()
    }

    /// Run all three stages over `content`.
    ///
    /// # Errors
    ///
    /// Returns the first transformer error. Later transformers do not run.
    pub async fn run(
        &self,
        content: &str,
        id: &str,
        extractor: &dyn ContentExtractor,
    ) -> Result<String> {
        let pre = self
            .run_stage(TransformerEnforce::Pre, content, id, extractor)
            .await?;
        let default = self
            .run_stage(
                TransformerEnforce::Default,
                pre.as_deref().unwrap_or(content),
                id,
                extractor,
            )
            .await?;
        let post = self
            .run_stage(
                TransformerEnforce::Post,
                default.as_deref().or(pre.as_deref()).unwrap_or(content),
                id,
                extractor,
            )
            .await?;

        Ok(post
            .or(default)
            .or(pre)
            .unwrap_or_else(|| content.to_string()))
    }

    /// Run one stage. Returns `None` when the stage left the content as is.
    pub async fn run_stage(
        &self,
        enforce: TransformerEnforce,
        original: &str,
        id: &str,
        extractor: &dyn ContentExtractor,
    ) -> Result<Option<String>> {
        if original.contains(IGNORE_COMMENT) {
            return Ok(None);
        }

        let mut stage = self.stage(enforce).peekable();
        if stage.peek().is_none() {
            return Ok(None);
        }

        let mut skipped = LinkedHashMap::new();
        let mut code = original.to_string();
        let mut working = protect_skipped(&code, &mut skipped);

        for transformer in stage {
            let accepted = transformer
                .id_filter(id)
                .unwrap_or_else(|| extractor.filter(&code, id));
            if !accepted {
                continue;
            }

            tracing::debug!(transformer = transformer.name(), id, ?enforce, "Running transformer");
            let before = working.clone();
            transformer
                .transform(&mut working, id)
                .await
                .map_err(|err| transform_error(transformer.name(), id, err))?;

            if working != before {
                code = restore_skipped(&working, &skipped);
                working = protect_skipped(&code, &mut skipped);
            }
        }

        Ok((code != original).then_some(code))
    }

    fn stage(
        &self,
        enforce: TransformerEnforce,
    ) -> impl Iterator<Item = &dyn ContentTransformer> {
        self.transformers
            .iter()
            .map(|t| t.as_ref())
            .filter(move |t| t.enforce() == enforce)
    }
}

impl Default for TransformPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TransformPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformPipeline")
            .field("transformers", &self.transform_names())
            .finish()
    }
}

fn transform_error(transformer: &str, id: &str, err: BuildError) -> BuildError {
    match err {
        err @ BuildError::Transform { .. } => err,
        other => BuildError::Transform {
            transformer: transformer.to_string(),
            id: id.to_string(),
            message: other.to_string(),
        },
    }
}

/// Replace every skip region with a key, recording key → region.
fn protect_skipped(code: &str, skipped: &mut LinkedHashMap<String, String>) -> String {
    SKIP_COMMENT_RE
        .replace_all(code, |caps: &Captures| {
            let region = &caps[0];
            let key = format!("{SKIP_PLACEHOLDER_PREFIX}{}", content_hash(region));
            skipped.insert(key.clone(), region.to_string());
            key
        })
        .into_owned()
}

fn restore_skipped(code: &str, skipped: &LinkedHashMap<String, String>) -> String {
    skipped
        .iter()
        .fold(code.to_string(), |code, (key, region)| code.replace(key, region))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TokenSet;
    use std::sync::{Arc, Mutex};

    struct Filter(bool);

    #[async_trait]
    impl ContentExtractor for Filter {
        fn filter(&self, _code: &str, _id: &str) -> bool {
            self.0
        }

        async fn extract(&self, _code: &str, _id: &str, _tokens: &TokenSet) -> Result<()> {
            Ok(())
        }
    }

    /// Appends a fixed suffix and records that it ran.
    struct Append {
        name: &'static str,
        suffix: &'static str,
        enforce: TransformerEnforce,
        id_filter: Option<bool>,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Append {
        fn new(
            name: &'static str,
            suffix: &'static str,
            enforce: TransformerEnforce,
            log: &Arc<Mutex<Vec<&'static str>>>,
        ) -> Box<Self> {
            Box::new(Self {
                name,
                suffix,
                enforce,
                id_filter: None,
                log: Arc::clone(log),
            })
        }
    }

    #[async_trait]
    impl ContentTransformer for Append {
        fn name(&self) -> &str {
            self.name
        }

        fn enforce(&self) -> TransformerEnforce {
            self.enforce
        }

        fn id_filter(&self, _id: &str) -> Option<bool> {
            self.id_filter
        }

        async fn transform(&self, code: &mut String, _id: &str) -> Result<()> {
            self.log.lock().unwrap().push(self.name);
            code.push_str(self.suffix);
            Ok(())
        }
    }

    /// Uppercases everything it sees.
    struct Upper;

    #[async_trait]
    impl ContentTransformer for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        async fn transform(&self, code: &mut String, _id: &str) -> Result<()> {
            *code = code.to_uppercase();
            Ok(())
        }
    }

    /// Fills empty declaration blocks.
    struct FillBlocks;

    #[async_trait]
    impl ContentTransformer for FillBlocks {
        fn name(&self) -> &str {
            "fill-blocks"
        }

        async fn transform(&self, code: &mut String, _id: &str) -> Result<()> {
            *code = code.replace("{}", "{x:y}");
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl ContentTransformer for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn transform(&self, _code: &mut String, _id: &str) -> Result<()> {
            Err(BuildError::other("unbalanced braces"))
        }
    }

    struct Noop;

    #[async_trait]
    impl ContentTransformer for Noop {
        fn name(&self) -> &str {
            "noop"
        }

        async fn transform(&self, _code: &mut String, _id: &str) -> Result<()> {
            Ok(())
        }
    }

    const ID: &str = "/app/assets/index.js-unocss-hash.css";

    fn log() -> Arc<Mutex<Vec<&'static str>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test]
    async fn test_stages_run_in_order_regardless_of_insertion() {
        let log = log();
        let mut pipeline = TransformPipeline::new();
        pipeline.push(Append::new("post", "[post]", TransformerEnforce::Post, &log));
        pipeline.push(Append::new("default", "[default]", TransformerEnforce::Default, &log));
        pipeline.push(Append::new("pre", "[pre]", TransformerEnforce::Pre, &log));

        let out = pipeline.run(".a{}", ID, &Filter(true)).await.unwrap();

        assert_eq!(out, ".a{}[pre][default][post]");
        assert_eq!(*log.lock().unwrap(), vec!["pre", "default", "post"]);
        assert_eq!(pipeline.transform_names(), vec!["pre", "default", "post"]);
    }

    #[tokio::test]
    async fn test_empty_stage_propagates_previous_output() {
        let log = log();
        let mut pipeline = TransformPipeline::new();
        pipeline.push(Append::new("pre", "!", TransformerEnforce::Pre, &log));
        pipeline.push(Box::new(Noop));

        let out = pipeline.run(".a{}", ID, &Filter(true)).await.unwrap();
        assert_eq!(out, ".a{}!");
    }

    #[tokio::test]
    async fn test_empty_pipeline_returns_input() {
        let pipeline = TransformPipeline::new();
        let out = pipeline.run(".a{}", ID, &Filter(true)).await.unwrap();
        assert_eq!(out, ".a{}");
    }

    #[tokio::test]
    async fn test_unchanged_stage_has_no_output() {
        let mut pipeline = TransformPipeline::new();
        pipeline.push(Box::new(Noop));

        let out = pipeline
            .run_stage(TransformerEnforce::Default, ".a{}", ID, &Filter(true))
            .await
            .unwrap();
        assert_eq!(out, None);
    }

    #[tokio::test]
    async fn test_ignore_comment_disables_transformers() {
        let mut pipeline = TransformPipeline::new();
        pipeline.push(Box::new(Upper));

        let input = "/* @unocss-ignore */ .a{}";
        let out = pipeline.run(input, ID, &Filter(true)).await.unwrap();
        assert_eq!(out, input);
    }

    #[tokio::test]
    async fn test_skip_regions_are_restored_untouched() {
        let mut pipeline = TransformPipeline::new();
        pipeline.push(Box::new(FillBlocks));
        pipeline.push(Box::new(FillBlocks));

        let input = ".a{} /* @unocss-skip-start */ .keep{} /* @unocss-skip-end */ .b{}";
        let out = pipeline.run(input, ID, &Filter(true)).await.unwrap();
        assert_eq!(
            out,
            ".a{x:y} /* @unocss-skip-start */ .keep{} /* @unocss-skip-end */ .b{x:y}"
        );
    }

    #[tokio::test]
    async fn test_extractor_filter_gates_transformers_without_id_filter() {
        let mut pipeline = TransformPipeline::new();
        pipeline.push(Box::new(Upper));

        let out = pipeline.run(".a{}", ID, &Filter(false)).await.unwrap();
        assert_eq!(out, ".a{}");
    }

    #[tokio::test]
    async fn test_id_filter_overrides_extractor_filter() {
        let log = log();
        let mut accepted = Append::new("accepted", "+", TransformerEnforce::Default, &log);
        accepted.id_filter = Some(true);
        let mut rejected = Append::new("rejected", "-", TransformerEnforce::Default, &log);
        rejected.id_filter = Some(false);

        let mut pipeline = TransformPipeline::new();
        pipeline.extend([
            accepted as Box<dyn ContentTransformer>,
            rejected as Box<dyn ContentTransformer>,
        ]);

        let out = pipeline.run(".a{}", ID, &Filter(false)).await.unwrap();
        assert_eq!(out, ".a{}+");
        assert_eq!(*log.lock().unwrap(), vec!["accepted"]);
    }

    #[tokio::test]
    async fn test_transformer_failure_is_fatal() {
        let log = log();
        let mut pipeline = TransformPipeline::new();
        pipeline.push(Box::new(Failing));
        pipeline.push(Append::new("after", "!", TransformerEnforce::Post, &log));

        let err = pipeline.run(".a{}", ID, &Filter(true)).await.unwrap_err();
        match err {
            BuildError::Transform {
                transformer, id, ..
            } => {
                assert_eq!(transformer, "failing");
                assert_eq!(id, ID);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(log.lock().unwrap().is_empty());
    }
}
