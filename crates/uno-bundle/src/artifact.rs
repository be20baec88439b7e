/*
 * artifact.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * The host bundler's output model, as far as this crate touches it.
 */

//! Bundle artifacts.
//!
//! - [`RenderedChunk`] - a script chunk while it is being rendered; its
//!   module map decides which CSS the host attaches to it
//! - [`OutputBundle`] - every finished file, keyed by file name, handed to the
//!   rewrite pass once the bundle is complete

use hashlink::LinkedHashMap;
use serde::{Deserialize, Serialize};

/// Module format of a bundler output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Es,
    Cjs,
    System,
    Amd,
    Umd,
    Iife,
}

impl OutputFormat {
    /// Formats that may inline CSS into scripts as string literals.
    pub fn inlines_css_in_scripts(self) -> bool {
        matches!(self, OutputFormat::Umd | OutputFormat::Amd | OutputFormat::Iife)
    }
}

/// Options of the output currently being rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputOptions {
    pub format: OutputFormat,
    /// Output directory, when the bundler reports one
    pub dir: Option<String>,
}

impl OutputOptions {
    pub fn new(format: OutputFormat, dir: impl Into<String>) -> Self {
        Self {
            format,
            dir: Some(dir.into()),
        }
    }
}

/// A module as rendered into a chunk. Only its presence in
/// [`RenderedChunk::modules`] is consulted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderedModule;

/// A chunk being rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedChunk {
    pub file_name: String,
    /// Module id → rendered module, in bundle order
    pub modules: LinkedHashMap<String, RenderedModule>,
}

impl RenderedChunk {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            modules: LinkedHashMap::new(),
        }
    }

    /// Add a module to the chunk.
    pub fn with_module(mut self, id: impl Into<String>) -> Self {
        self.modules.insert(id.into(), RenderedModule::default());
        self
    }

    /// Whether the chunk contains a virtual layer module.
    pub fn is_entry_bearing(&self) -> bool {
        self.modules.keys().any(|id| uno_layers::is_resolved_id(id))
    }

    /// Whether the chunk is a legacy (SystemJS) build of a modern chunk.
    pub fn is_legacy(&self, options: &OutputOptions) -> bool {
        options.format == OutputFormat::System && self.file_name.contains("-legacy")
    }
}

/// How an artifact's text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    StyleSheet,
    Script,
}

impl ArtifactKind {
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        if file_name.ends_with(".css") {
            Some(ArtifactKind::StyleSheet)
        } else if file_name.ends_with(".js") {
            Some(ArtifactKind::Script)
        } else {
            None
        }
    }
}

/// Content of an asset file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    Text(String),
    Binary(Vec<u8>),
}

/// A file in the finished bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFile {
    /// A non-script file (style sheets, images, ...)
    Asset { source: AssetSource },
    /// A script chunk
    Chunk { code: String },
}

impl OutputFile {
    pub fn text_asset(source: impl Into<String>) -> Self {
        OutputFile::Asset {
            source: AssetSource::Text(source.into()),
        }
    }

    pub fn chunk(code: impl Into<String>) -> Self {
        OutputFile::Chunk { code: code.into() }
    }

    /// The file's text, if it has any.
    pub fn text(&self) -> Option<&str> {
        match self {
            OutputFile::Asset {
                source: AssetSource::Text(text),
            } => Some(text),
            OutputFile::Asset {
                source: AssetSource::Binary(_),
            } => None,
            OutputFile::Chunk { code } => Some(code),
        }
    }
}

/// Every file in the finished bundle, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputBundle {
    files: LinkedHashMap<String, OutputFile>,
}

impl OutputBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file_name: impl Into<String>, file: OutputFile) {
        self.files.insert(file_name.into(), file);
    }

    pub fn get(&self, file_name: &str) -> Option<&OutputFile> {
        self.files.get(file_name)
    }

    pub fn get_mut(&mut self, file_name: &str) -> Option<&mut OutputFile> {
        self.files.get_mut(file_name)
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(|name| name.as_str())
    }
}
