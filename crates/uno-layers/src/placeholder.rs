//! Placeholder marker encoding and decoding.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Markers are CSS-shaped so that CSS tooling running between injection and
//! the final rewrite (minifiers, the host's CSS post-processing) keeps them
//! intact. Grammar, version 1:
//!
//! ```text
//! layer marker:   #--unocss--{layer:<name>;escape-view:\"\'\`\\}
//! hash marker:    #--unocss-hash--{content:"<hash>"}
//! layer block:    #--unocss-layer-start--<name>--{start:<name>} <css> #--unocss-layer-end--<name>--{end:<name>}
//! ```
//!
//! The `escape-view` payload shows the rewrite pass how a downstream tool
//! escaped the marker (e.g. when CSS is inlined into a JS string). It carries
//! no information of its own and is ignored when decoding.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::LayerError;

/// Recognizes layer markers. Group 1 is the layer name, group 2 the escape view.
pub static LAYER_PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"#--unocss--\s*\{\s*layer\s*:\s*(.+?)\s*(?:;\s*escape-view\s*:\s*(.+?)\s*)?;?\s*\}")
        .unwrap()
});

/// Recognizes hash markers, including ones whose quotes were backslash-escaped.
/// Group 1 is the hash.
pub static HASH_PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"#--unocss-hash--\s*\{\s*content\s*:\s*\\*"([^\\"]+)\\*";?\s*\}"#).unwrap()
});

const ESCAPE_VIEW: &str = r#"\"\'\`\\"#;

/// Characters the grammar uses as delimiters; never valid inside a layer name.
const RESERVED_CHARS: &[char] = &[';', '{', '}', ':', '\\', '"', '\''];

/// A layer marker found in artifact text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerMarker<'a> {
    /// Layer name carried by the marker
    pub layer: &'a str,
    /// Escape view as it appears in the text, if present
    pub escape_view: Option<&'a str>,
    /// Byte range of the whole marker
    pub range: Range<usize>,
}

/// Check that a layer name can be carried by a marker and recovered intact.
pub fn validate_layer_name(layer: &str) -> Result<(), LayerError> {
    if layer.is_empty() {
        return Err(LayerError::EmptyName);
    }
    if let Some(found) = layer
        .chars()
        .find(|c| c.is_whitespace() || RESERVED_CHARS.contains(c))
    {
        return Err(LayerError::ReservedCharacter {
            name: layer.to_string(),
            found,
        });
    }
    Ok(())
}

/// Encode a layer marker.
///
/// Layer names come from resolved module ids and are trusted. Use
/// [`try_layer_placeholder`] for names from anywhere else.
///
/// ```
/// use uno_layers::{decode_layer_markers, layer_placeholder};
///
/// let marker = layer_placeholder("icons");
/// let decoded = decode_layer_markers(&marker);
/// assert_eq!(decoded.len(), 1);
/// assert_eq!(decoded[0].layer, "icons");
/// ```
pub fn layer_placeholder(layer: &str) -> String {
    format!("#--unocss--{{layer:{};escape-view:{}}}", layer, ESCAPE_VIEW)
}

/// Encode a layer marker after validating the name.
pub fn try_layer_placeholder(layer: &str) -> Result<String, LayerError> {
    validate_layer_name(layer)?;
    Ok(layer_placeholder(layer))
}

/// Encode a hash marker.
pub fn hash_placeholder(hash: &str) -> String {
    format!("#--unocss-hash--{{content:\"{}\"}}", hash)
}

/// Opening boundary of a layer block.
pub fn layer_start_boundary(layer: &str) -> String {
    format!("#--unocss-layer-start--{0}--{{start:{0}}}", layer)
}

/// Closing boundary of a layer block.
pub fn layer_end_boundary(layer: &str) -> String {
    format!("#--unocss-layer-end--{0}--{{end:{0}}}", layer)
}

/// Wrap finalized layer CSS in its boundary block.
pub fn wrap_layer(layer: &str, content: &str) -> String {
    format!(
        "{} {} {}",
        layer_start_boundary(layer),
        content,
        layer_end_boundary(layer)
    )
}

/// Find every layer marker in `text`, in order of appearance.
pub fn decode_layer_markers(text: &str) -> Vec<LayerMarker<'_>> {
    LAYER_PLACEHOLDER_RE
        .captures_iter(text)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            Some(LayerMarker {
                layer: captures.get(1)?.as_str().trim(),
                escape_view: captures.get(2).map(|m| m.as_str()),
                range: whole.range(),
            })
        })
        .collect()
}

/// Find the hash carried by every hash marker in `text`, in order of appearance.
pub fn decode_hash_markers(text: &str) -> Vec<&str> {
    HASH_PLACEHOLDER_RE
        .captures_iter(text)
        .filter_map(|captures| captures.get(1).map(|m| m.as_str()))
        .collect()
}

/// Content of the first block for `layer`, or `None` if the text has no
/// complete block for it.
///
/// The single spaces [`wrap_layer`] puts around the content are not part of
/// it, nor is any whitespace a CSS tool left there.
pub fn extract_layer_block<'a>(layer: &str, text: &'a str) -> Option<&'a str> {
    let start = layer_start_boundary(layer);
    let end = layer_end_boundary(layer);
    let content_start = text.find(&start)? + start.len();
    let content_len = text[content_start..].find(&end)?;
    Some(text[content_start..content_start + content_len].trim())
}

/// Remove every complete block for `layer`. An unterminated block is left as is.
pub fn strip_layer_blocks(layer: &str, text: &str) -> String {
    let start = layer_start_boundary(layer);
    let end = layer_end_boundary(layer);
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(block_start) = rest.find(&start) {
        let after_start = block_start + start.len();
        let Some(block_len) = rest[after_start..].find(&end) else {
            break;
        };
        out.push_str(&rest[..block_start]);
        rest = &rest[after_start + block_len + end.len()..];
    }

    out.push_str(rest);
    out
}
