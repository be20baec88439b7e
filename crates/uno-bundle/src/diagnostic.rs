/*
 * diagnostic.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Non-fatal diagnostics raised during a build.
 */

//! Diagnostic messages and the shared channel they are reported through.
//!
//! Conditions that do not make the output wrong (a missing host plugin, a
//! build that never imported `uno.css`) are reported here rather than
//! failing the build. The host decides how to surface them.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// Stable codes for the diagnostics this crate emits.
pub mod codes {
    /// No virtual entry was imported anywhere in the build.
    pub const ENTRY_NOT_FOUND: &str = "UNO-1-1";
    /// No CSS post-processing plugin is bound for an output directory.
    pub const CSS_POST_PLUGIN_MISSING: &str = "UNO-1-2";
    /// The rewrite pass found no layer placeholder in any artifact.
    pub const PLACEHOLDER_NOT_FOUND: &str = "UNO-1-3";
}

/// The kind of diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// An error that prevents completion
    Error,
    /// A warning that doesn't prevent completion but indicates a problem
    Warning,
    /// Informational message
    Info,
}

/// A diagnostic message.
///
/// Structure follows the usual code / title / problem / hints layout:
/// the title is a one-line summary, the problem explains what was observed,
/// and hints suggest a fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticMessage {
    /// Optional stable code (see [`codes`])
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Brief summary
    pub title: String,

    /// Message kind
    pub kind: DiagnosticKind,

    /// What went wrong
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,

    /// Suggestions for fixing the problem
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
}

impl DiagnosticMessage {
    /// Create a warning with the given title.
    pub fn warning(title: impl Into<String>) -> Self {
        Self {
            code: None,
            title: title.into(),
            kind: DiagnosticKind::Warning,
            problem: None,
            hints: Vec::new(),
        }
    }

    /// Attach a stable code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Describe what went wrong.
    pub fn with_problem(mut self, problem: impl Into<String>) -> Self {
        self.problem = Some(problem.into());
        self
    }

    /// Add a hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    /// No `uno.css` entry was imported, so there is nothing to rewrite.
    pub fn entry_not_found() -> Self {
        Self::warning("Entry module not found")
            .with_code(codes::ENTRY_NOT_FOUND)
            .with_problem("No module imported a virtual `uno.css` entry, so no CSS was emitted")
            .with_hint("Did you add `import 'uno.css'` in your main entry?")
    }

    /// No CSS post-processing plugin is bound for `dir`.
    pub fn css_post_plugin_missing(dir: Option<&str>) -> Self {
        Self::warning("Failed to find the vite:css-post plugin")
            .with_code(codes::CSS_POST_PLUGIN_MISSING)
            .with_problem(format!(
                "No CSS post-processing plugin is registered for output directory `{}`",
                dir.unwrap_or("<unset>")
            ))
            .with_hint("It might be an internal bug of UnoCSS")
    }

    /// No placeholder was substituted in the whole bundle.
    ///
    /// In library mode with scripts checked, the usual cause is CSS code
    /// splitting being off; anything else points at an internal bug.
    pub fn placeholder_not_found(library_mode: bool) -> Self {
        let message = Self::warning("CSS placeholder not found in the generated chunks")
            .with_code(codes::PLACEHOLDER_NOT_FOUND);
        if library_mode {
            message
                .with_problem("It seems you are building in library mode")
                .with_hint("It's recommended to set `build.cssCodeSplit` to true")
                .with_hint("See https://github.com/vitejs/vite/issues/1579")
        } else {
            message.with_problem("This is likely an internal bug of the unocss bundler integration")
        }
    }

    /// Render as plain text for terminal output.
    pub fn to_text(&self) -> String {
        let mut out = String::from("[unocss] ");
        if let Some(code) = &self.code {
            out.push_str(&format!("[{}] ", code));
        }
        out.push_str(&self.title);
        if let Some(problem) = &self.problem {
            out.push('\n');
            out.push_str(problem);
        }
        for hint in &self.hints {
            out.push_str("\nℹ ");
            out.push_str(hint);
        }
        out
    }

    /// Render as a JSON value for machine-readable output.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Shared diagnostic channel.
///
/// Cloning yields another handle to the same channel. Every message is also
/// logged through `tracing`.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    messages: Arc<Mutex<Vec<DiagnosticMessage>>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a diagnostic.
    pub fn push(&self, message: DiagnosticMessage) {
        match message.kind {
            DiagnosticKind::Error => {
                tracing::error!(code = message.code.as_deref(), "{}", message.title)
            }
            DiagnosticKind::Warning => {
                tracing::warn!(code = message.code.as_deref(), "{}", message.title)
            }
            DiagnosticKind::Info => {
                tracing::info!(code = message.code.as_deref(), "{}", message.title)
            }
        }
        self.lock().push(message);
    }

    /// Copy of every diagnostic reported so far.
    pub fn snapshot(&self) -> Vec<DiagnosticMessage> {
        self.lock().clone()
    }

    /// Remove and return every diagnostic reported so far.
    pub fn take(&self) -> Vec<DiagnosticMessage> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<DiagnosticMessage>> {
        // A panic while holding the lock cannot leave the Vec half-written.
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
