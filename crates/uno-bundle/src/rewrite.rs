/*
 * rewrite.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * The terminal placeholder substitution pass.
 */

//! Bundle rewriting.
//!
//! Runs once the bundle is complete. In every candidate artifact:
//!
//! 1. hash markers are erased,
//! 2. each layer marker is replaced by the content of the matching boundary
//!    block in the same artifact (empty if there is none),
//! 3. the boundary blocks of every referenced layer are removed.
//!
//! Scripts get the substituted CSS escaped for a string literal, since
//! that is where markers end up when the host inlines CSS into JS.

use uno_layers::{HASH_PLACEHOLDER_RE, LAYER_PLACEHOLDER_RE, extract_layer_block, strip_layer_blocks};

use crate::artifact::{ArtifactKind, AssetSource, OutputBundle, OutputFile, OutputOptions};
use crate::diagnostic::DiagnosticMessage;
use crate::plugin::GlobalBuild;

/// Rewritten artifact text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub text: String,
    /// Whether at least one layer marker was substituted
    pub replaced: bool,
}

/// Rewrite a style sheet.
pub fn rewrite_style_sheet(text: &str, layers: &[&str]) -> RewriteOutcome {
    rewrite(text, layers, ArtifactKind::StyleSheet)
}

/// Rewrite a script. Substituted CSS is escaped with
/// [`escape_for_string_literal`].
pub fn rewrite_script(text: &str, layers: &[&str]) -> RewriteOutcome {
    rewrite(text, layers, ArtifactKind::Script)
}

/// Make CSS safe to splice into a JS string literal: line breaks are
/// removed, and quotes not already preceded by a backslash are escaped.
pub fn escape_for_string_literal(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut prev = None;
    for c in css.chars().filter(|c| !matches!(c, '\n' | '\r')) {
        if matches!(c, '\'' | '"') && prev != Some('\\') {
            out.push('\\');
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

fn rewrite(text: &str, layers: &[&str], kind: ArtifactKind) -> RewriteOutcome {
    let text = HASH_PLACEHOLDER_RE.replace_all(text, "");

    let mut replaced = false;
    let mut substituted = LAYER_PLACEHOLDER_RE
        .replace_all(&text, |caps: &regex::Captures| {
            replaced = true;
            let layer = caps[1].trim();
            let css = extract_layer_block(layer, &text).unwrap_or_default();
            match kind {
                ArtifactKind::StyleSheet => css.to_string(),
                ArtifactKind::Script => escape_for_string_literal(css),
            }
        })
        .into_owned();

    for layer in layers {
        substituted = strip_layer_blocks(layer, &substituted);
    }

    RewriteOutcome {
        text: substituted,
        replaced,
    }
}

impl GlobalBuild {
    /// Bundle hook, run once every chunk has been rendered. Substitutes
    /// markers in place.
    ///
    /// Problems are reported as diagnostics; this hook never fails.
    pub fn generate_bundle(&mut self, options: &OutputOptions, bundle: &mut OutputBundle) {
        let check_js = options.format.inlines_css_in_scripts();
        let files: Vec<String> = bundle
            .file_names()
            .filter(|name| match ArtifactKind::from_file_name(name) {
                Some(ArtifactKind::StyleSheet) => true,
                Some(ArtifactKind::Script) => check_js,
                None => false,
            })
            .map(str::to_string)
            .collect();

        if files.is_empty() {
            return;
        }

        if self.registry.is_empty() {
            // An earlier pipeline (SSR) already substituted; nothing is
            // missing from this one.
            if self.replaced {
                return;
            }
            if self.config.check_import {
                self.diagnostics.push(DiagnosticMessage::entry_not_found());
            }
            return;
        }

        let layers: Vec<&str> = self.registry.layers().collect();
        tracing::debug!(files = files.len(), layers = ?layers, "Rewriting bundle");

        for file in &files {
            let outcome = match bundle.get_mut(file) {
                Some(OutputFile::Asset {
                    source: AssetSource::Text(source),
                }) => {
                    let outcome = rewrite_style_sheet(source, &layers);
                    *source = outcome.text;
                    outcome.replaced
                }
                Some(OutputFile::Chunk { code }) => {
                    let outcome = rewrite_script(code, &layers);
                    *code = outcome.text;
                    outcome.replaced
                }
                _ => false,
            };
            if outcome {
                tracing::trace!(file = %file, "Substituted layer markers");
                self.replaced = true;
            }
        }

        if !self.replaced {
            let library_mode = self.host.as_ref().is_some_and(|host| host.lib);
            self.diagnostics
                .push(DiagnosticMessage::placeholder_not_found(library_mode && check_js));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uno_layers::{LAYER_MARK_ALL, hash_placeholder, layer_placeholder, wrap_layer};

    #[test]
    fn test_style_sheet_substitution() {
        let text = format!(
            "{}{}{}",
            layer_placeholder("default"),
            hash_placeholder("deadbeef"),
            wrap_layer("default", ".a{color:red}")
        );

        let outcome = rewrite_style_sheet(&text, &["default"]);
        assert!(outcome.replaced);
        assert_eq!(outcome.text, ".a{color:red}");
    }

    #[test]
    fn test_marker_without_block_becomes_empty() {
        let text = format!(".x{{}}{}.y{{}}", layer_placeholder("icons"));
        let outcome = rewrite_style_sheet(&text, &["icons"]);
        assert!(outcome.replaced);
        assert_eq!(outcome.text, ".x{}.y{}");
    }

    #[test]
    fn test_hash_marker_stripped_without_layer_markers() {
        let text = format!(".a{{}}{}", hash_placeholder("0123abcd"));
        let outcome = rewrite_style_sheet(&text, &["default"]);
        assert!(!outcome.replaced);
        assert_eq!(outcome.text, ".a{}");
    }

    #[test]
    fn test_mark_all_marker_uses_mark_all_block() {
        let text = format!(
            "{}{}",
            layer_placeholder(LAYER_MARK_ALL),
            wrap_layer(LAYER_MARK_ALL, "*{margin:0}.a{}")
        );
        let outcome = rewrite_style_sheet(&text, &[LAYER_MARK_ALL]);
        assert_eq!(outcome.text, "*{margin:0}.a{}");
    }

    #[test]
    fn test_script_escaping() {
        let block = wrap_layer("default", ".a::before{content:\"x\"}\n.b{font-family:'y'}");
        let text = format!(
            "const css = \"{}\";/*{}*/",
            layer_placeholder("default"),
            block
        );

        let outcome = rewrite_script(&text, &["default"]);
        assert_eq!(
            outcome.text,
            r#"const css = ".a::before{content:\"x\"}.b{font-family:\'y\'}";/**/"#
        );
    }

    #[test]
    fn test_escape_for_string_literal() {
        assert_eq!(escape_for_string_literal("a\"b"), r#"a\"b"#);
        assert_eq!(escape_for_string_literal(r#"a\"b"#), r#"a\"b"#);
        assert_eq!(escape_for_string_literal("a\r\nb'"), r"ab\'");
    }

    #[test]
    fn test_rewrite_output_is_stable() {
        let text = format!(
            "{}{}",
            layer_placeholder("default"),
            wrap_layer("default", ".a{}")
        );
        let once = rewrite_style_sheet(&text, &["default"]);
        let twice = rewrite_style_sheet(&once.text, &["default"]);
        assert_eq!(once.text, twice.text);
        assert!(!twice.replaced);
    }

    #[test]
    fn test_unreferenced_blocks_are_kept() {
        let text = format!("{}{}", wrap_layer("default", ".a{}"), wrap_layer("other", ".o{}"));
        let outcome = rewrite_style_sheet(&text, &["default"]);
        assert_eq!(outcome.text, wrap_layer("other", ".o{}"));
    }
}
