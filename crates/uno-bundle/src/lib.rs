//! Deferred layer resolution for build-time atomic CSS.
//!
//! Utility classes are collected from every module while the bundler runs,
//! but the CSS can only be generated once the whole module graph has been
//! scanned. This crate carries the build through that gap:
//!
//! 1. Virtual `uno.css` modules resolve to placeholder markers
//!    ([`LayerRegistry`]).
//! 2. Extraction tasks are queued while modules are transformed and drained
//!    before generation ([`ContentAggregator`]).
//! 3. Each entry chunk receives a hash marker so content-addressed file names
//!    follow the CSS (`GlobalBuild::render_chunk_hash`), and its finalized
//!    layers, run through the [`TransformPipeline`], are handed to the host's
//!    CSS post-processing inside boundary blocks
//!    (`GlobalBuild::render_chunk_generate`).
//! 4. Once the bundle is complete, markers are replaced with layer CSS
//!    (`GlobalBuild::generate_bundle`).
//!
//! # Example
//!
//! ```ignore
//! use uno_bundle::{GlobalBuild, PluginConfig};
//!
//! let mut build = GlobalBuild::new(PluginConfig::default(), generator, extractor);
//! build.config_resolved(host_config);
//! build.build_start();
//!
//! // scan phase: resolve_id / load / transform / module_parsed
//! // render phase, per chunk:
//! build.render_chunk_hash(&mut chunk, &options).await?;
//! build.render_chunk_generate(&chunk, &options).await?;
//!
//! // once, after every chunk has been rendered:
//! build.generate_bundle(&options, &mut bundle);
//! for warning in build.diagnostics().snapshot() {
//!     eprintln!("{}", warning.to_text());
//! }
//! ```

pub mod artifact;
pub mod bindings;
pub mod collaborator;
pub mod config;
pub mod diagnostic;
pub mod emit;
pub mod error;
pub mod generate;
pub mod inject;
pub mod plugin;
pub mod registry;
pub mod rewrite;
pub mod tasks;
pub mod transform;

pub use artifact::{
    ArtifactKind, AssetSource, OutputBundle, OutputFile, OutputFormat, OutputOptions,
    RenderedChunk, RenderedModule,
};
pub use bindings::CssPluginBindings;
pub use collaborator::{
    ContentExtractor, CssPlugin, CssPostPlugin, CssTransformOutput, GenerateOptions,
    RuleGenerator,
};
pub use config::{HostConfig, HostPlugin, LegacyConfig, PluginConfig};
pub use diagnostic::{DiagnosticKind, DiagnosticMessage, Diagnostics};
pub use error::{BuildError, Result};
pub use generate::{ContentAggregator, GenerateResult};
pub use plugin::GlobalBuild;
pub use registry::LayerRegistry;
pub use rewrite::{RewriteOutcome, escape_for_string_literal, rewrite_script, rewrite_style_sheet};
pub use tasks::{TaskQueue, TokenSet};
pub use transform::{ContentTransformer, TransformPipeline, TransformerEnforce};
