/*
 * tasks.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Extraction task queue and the shared token set.
 */

//! Extraction tasks.
//!
//! Modules are scanned while the bundler transforms them, but nothing waits
//! for a scan at that point. Each scan is queued as a task and the whole
//! queue is drained right before CSS is generated.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, try_join_all};

use crate::Result;

/// Utility tokens collected from every scanned module.
///
/// Cloning yields another handle to the same set.
#[derive(Debug, Clone, Default)]
pub struct TokenSet {
    tokens: Arc<Mutex<BTreeSet<String>>>,
}

impl TokenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a token. Returns whether it was new.
    pub fn insert(&self, token: impl Into<String>) -> bool {
        self.lock().insert(token.into())
    }

    pub fn extend<I, S>(&self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().extend(tokens.into_iter().map(Into::into));
    }

    pub fn remove(&self, token: &str) -> bool {
        self.lock().remove(token)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.lock().contains(token)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the current tokens.
    pub fn snapshot(&self) -> BTreeSet<String> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.tokens
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A pending extraction.
pub type ExtractionTask = BoxFuture<'static, Result<()>>;

/// Queue of pending extraction tasks.
///
/// Only two operations matter to callers: [`enqueue`](Self::enqueue) and
/// [`drain`](Self::drain).
#[derive(Default)]
pub struct TaskQueue {
    pending: Mutex<Vec<ExtractionTask>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a task. It does not run until the queue is drained.
    pub fn enqueue<F>(&self, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.lock().push(Box::pin(task));
    }

    /// Run every task queued so far to completion.
    ///
    /// Tasks queued while the drain is in progress stay queued for the next
    /// drain. The first failing task fails the drain.
    pub async fn drain(&self) -> Result<()> {
        let batch = std::mem::take(&mut *self.lock());
        if batch.is_empty() {
            return Ok(());
        }

        tracing::debug!(tasks = batch.len(), "Draining extraction tasks");
        try_join_all(batch).await?;
        Ok(())
    }

    /// Drop every pending task without running it.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ExtractionTask>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.len())
            .finish()
    }
}
