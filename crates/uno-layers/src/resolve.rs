//! Virtual module id resolution.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Source code pulls generated CSS into the module graph by importing a
//! virtual specifier:
//!
//! ```text
//! import 'uno.css'              // every layer not imported on its own
//! import 'virtual:uno.css'      // same, with the explicit virtual prefix
//! import 'uno:icons.css'        // only the `icons` layer
//! ```
//!
//! Specifiers are canonicalized to a resolved id (`/__uno.css`,
//! `/src/__uno_icons.css`, ...) that the bundler uses as the module identity.
//! The layer name is recovered from the resolved id.

use once_cell::sync::Lazy;
use regex::Regex;

/// Reserved layer meaning "every layer not imported on its own".
pub const LAYER_MARK_ALL: &str = "__ALL__";

/// Layer holding `@import` rules; always emitted ahead of other layers.
pub const LAYER_IMPORTS: &str = "imports";

/// Layer holding preflight (reset) styles.
pub const LAYER_PREFLIGHTS: &str = "preflights";

/// Virtual specifiers accepted from user code.
///
/// Captures the optional layer name in group 1 and an optional query in group 2.
static VIRTUAL_ENTRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:virtual:)?uno(?::(.+))?\.css(\?.*)?$").unwrap());

/// Resolved ids, optionally followed by a query string.
static RESOLVED_ID_WITH_QUERY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[/\\]__uno(_.*?)?\.css(\?.*)?$").unwrap());

/// Resolved virtual layer module ids. Captures the layer name in group 1.
pub static RESOLVED_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[/\\]__uno(?:_(.*?))?\.css$").unwrap());

/// Canonicalize a virtual import specifier.
///
/// Already-resolved ids are returned unchanged. For a virtual specifier, the
/// resolved id lives next to the importer when one is known, and at the root
/// otherwise. Any query string is carried over. Returns `None` for
/// specifiers that are not virtual CSS entries.
///
/// ```
/// use uno_layers::resolve_id;
///
/// assert_eq!(resolve_id("uno.css", None).as_deref(), Some("/__uno.css"));
/// assert_eq!(
///     resolve_id("virtual:uno:icons.css", Some("/src/main.ts")).as_deref(),
///     Some("/src/__uno_icons.css"),
/// );
/// assert_eq!(resolve_id("./style.css", None), None);
/// ```
pub fn resolve_id(id: &str, importer: Option<&str>) -> Option<String> {
    if RESOLVED_ID_WITH_QUERY_RE.is_match(id) {
        return Some(id.to_string());
    }

    let captures = VIRTUAL_ENTRY_RE.captures(id)?;
    let mut virtual_id = match captures.get(1) {
        Some(layer) => format!("__uno_{}.css", layer.as_str()),
        None => "__uno.css".to_string(),
    };
    if let Some(query) = captures.get(2) {
        virtual_id.push_str(query.as_str());
    }

    let resolved = match importer.and_then(parent_dir) {
        Some(dir) => format!("{}/{}", dir, virtual_id),
        None => format!("/{}", virtual_id),
    };
    Some(resolved)
}

/// Recover the layer name from a resolved id.
///
/// `/__uno.css` denotes [`LAYER_MARK_ALL`]. Ids carrying a query string do not
/// match; strip it first with [`strip_query`].
pub fn resolve_layer(id: &str) -> Option<String> {
    let captures = RESOLVED_ID_RE.captures(id)?;
    let layer = captures
        .get(1)
        .map(|m| m.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(LAYER_MARK_ALL);
    Some(layer.to_string())
}

/// Whether a module id denotes a resolved virtual layer module.
pub fn is_resolved_id(id: &str) -> bool {
    RESOLVED_ID_RE.is_match(id)
}

/// Drop a trailing `?query` from a module id.
pub fn strip_query(id: &str) -> &str {
    match id.find('?') {
        Some(idx) => &id[..idx],
        None => id,
    }
}

fn parent_dir(importer: &str) -> Option<&str> {
    importer.rfind(['/', '\\']).map(|idx| &importer[..idx])
}
