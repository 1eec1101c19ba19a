//! Machine translation plumbing.
//!
//! Backends implement one uniform operation: translate a slice of texts
//! from a source to a target language, preserving index order. The driver
//! slices requests into character-budgeted batches with a fixed delay
//! between them and falls back across backends per batch. Anything more
//! elaborate than retry-then-fallback is out of scope.

use std::{future::Future, pin::Pin, time::Duration};

use anyhow::Result;
use tokio::time::sleep;

pub const MAX_BATCH_CHARS: usize = 4000;
pub const BATCH_DELAY: Duration = Duration::from_millis(500);

pub type TranslateFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<String>>> + 'a>>;

pub trait Translator {
    fn name(&self) -> &str;

    /// Translate `texts` from `source` to `target`. The returned vector
    /// must be index-aligned with the input.
    fn translate<'a>(
        &'a self,
        source: &'a str,
        target: &'a str,
        texts: &'a [String],
    ) -> TranslateFuture<'a>;
}

/// Returns every text unchanged. Backs the offline default and tests.
pub struct IdentityTranslator;

impl Translator for IdentityTranslator {
    fn name(&self) -> &str {
        "identity"
    }

    fn translate<'a>(
        &'a self,
        _source: &'a str,
        _target: &'a str,
        texts: &'a [String],
    ) -> TranslateFuture<'a> {
        Box::pin(async move { Ok(texts.to_vec()) })
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub max_chars: usize,
    pub delay: Duration,
    /// Extra attempts per backend before falling back to the next one.
    pub retries: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_chars: MAX_BATCH_CHARS,
            delay: BATCH_DELAY,
            retries: 1,
        }
    }
}

/// Index-aligned result of a batched run. `None` marks a text whose batch
/// failed on every backend.
#[derive(Debug)]
pub struct TranslationOutcome {
    pub translated: Vec<Option<String>>,
    pub failed_batches: usize,
    pub total_batches: usize,
}

impl TranslationOutcome {
    pub fn all_failed(&self) -> bool {
        self.total_batches > 0 && self.failed_batches == self.total_batches
    }

    pub fn partially_failed(&self) -> bool {
        self.failed_batches > 0 && self.failed_batches < self.total_batches
    }
}

/// Drive `texts` through the backends in character-budgeted batches.
pub async fn translate_batched(
    backends: &[&dyn Translator],
    source: &str,
    target: &str,
    texts: &[String],
    options: &BatchOptions,
) -> TranslationOutcome {
    let batches = split_batches(texts, options.max_chars);
    let mut translated: Vec<Option<String>> = vec![None; texts.len()];
    let mut failed_batches = 0;
    let total_batches = batches.len();

    for (index, batch) in batches.iter().enumerate() {
        if index > 0 && !options.delay.is_zero() {
            sleep(options.delay).await;
        }
        let slice = &texts[batch.clone()];
        match translate_one_batch(backends, source, target, slice, options.retries).await {
            Some(results) => {
                for (offset, result) in results.into_iter().enumerate() {
                    translated[batch.start + offset] = Some(result);
                }
            }
            None => failed_batches += 1,
        }
    }

    TranslationOutcome {
        translated,
        failed_batches,
        total_batches,
    }
}

async fn translate_one_batch(
    backends: &[&dyn Translator],
    source: &str,
    target: &str,
    texts: &[String],
    retries: usize,
) -> Option<Vec<String>> {
    for backend in backends {
        for _ in 0..=retries {
            match backend.translate(source, target, texts).await {
                Ok(results) if results.len() == texts.len() => return Some(results),
                // Wrong arity counts as a failed attempt too.
                Ok(_) | Err(_) => {}
            }
        }
    }
    None
}

/// Contiguous index ranges whose combined character count stays under the
/// budget. A single oversized text still gets a batch of its own.
fn split_batches(texts: &[String], max_chars: usize) -> Vec<std::ops::Range<usize>> {
    let mut batches = Vec::new();
    let mut start = 0;
    let mut chars = 0;
    for (i, text) in texts.iter().enumerate() {
        let len = text.chars().count();
        if i > start && chars + len > max_chars {
            batches.push(start..i);
            start = i;
            chars = 0;
        }
        chars += len;
    }
    if start < texts.len() {
        batches.push(start..texts.len());
    }
    batches
}
