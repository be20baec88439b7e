//! Layer and hash placeholder protocol for deferred atomic-CSS generation.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! During a bundler build the generated CSS is not known until every module
//! has been scanned. This crate defines the textual markers that stand in for
//! that CSS while the bundle is being assembled:
//! - Layer markers, emitted by virtual `uno.css` modules
//! - Hash markers, injected so content-addressed file names change with the CSS
//! - Layer boundary blocks, which carry finalized layer text to the rewrite pass
//!
//! It also resolves virtual import specifiers to canonical module ids.

mod error;
mod hash;
mod placeholder;
mod resolve;

pub use error::LayerError;
pub use hash::{HASH_LENGTH, content_hash};
pub use placeholder::{
    HASH_PLACEHOLDER_RE, LAYER_PLACEHOLDER_RE, LayerMarker, decode_hash_markers,
    decode_layer_markers, extract_layer_block, hash_placeholder, layer_end_boundary,
    layer_placeholder, layer_start_boundary, strip_layer_blocks, try_layer_placeholder,
    validate_layer_name, wrap_layer,
};
pub use resolve::{
    LAYER_IMPORTS, LAYER_MARK_ALL, LAYER_PREFLIGHTS, RESOLVED_ID_RE, is_resolved_id, resolve_id,
    resolve_layer, strip_query,
};
