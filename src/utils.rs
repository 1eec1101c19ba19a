//! Key-segment escaping and key-id derivation helpers.
//!
//! Dictionary key ids are dotted paths whose segments may themselves contain
//! literal dots. Segments are stored escaped (`\` → `\\`, `.` → `\.`) so that
//! joining with `.` is unambiguous and `escape`/`unescape` are exact inverses.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Newly minted ids keep at most this many words from the source text.
const MAX_ID_WORDS: usize = 8;

/// Escape a raw segment so it can be joined into a dotted key id.
pub fn escape_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for c in segment.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '.' => out.push_str("\\."),
            _ => out.push(c),
        }
    }
    out
}

/// Inverse of [`escape_segment`].
pub fn unescape_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut chars = segment.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push('\\'), // trailing backslash, keep as-is
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Join raw segments into a full key id, escaping each segment.
pub fn join_key<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| escape_segment(s.as_ref()))
        .collect::<Vec<_>>()
        .join(".")
}

/// Split a full key id into raw (unescaped) segments.
///
/// Honors `\.` and `\\` escapes, so `a.b\.c` yields `["a", "b.c"]`.
pub fn split_key(key: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = key.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(next) => current.push(next),
                None => current.push('\\'),
            },
            '.' => {
                segments.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
}

/// Naming style for newly minted key ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum KeyStyle {
    #[default]
    Camel,
    Pascal,
    Snake,
    Kebab,
    /// Keep the normalized words joined without casing changes.
    Raw,
}

impl KeyStyle {
    /// Derive a key id from free-form text.
    ///
    /// Splits on non-alphanumeric characters, keeps the first few words and
    /// applies the style. Returns `None` when the text has no usable words.
    pub fn derive(self, text: &str) -> Option<String> {
        let words = split_words(text);
        if words.is_empty() {
            return None;
        }
        let words = &words[..words.len().min(MAX_ID_WORDS)];
        let id = match self {
            KeyStyle::Camel => words
                .iter()
                .enumerate()
                .map(|(i, w)| if i == 0 { w.clone() } else { capitalize(w) })
                .collect::<String>(),
            KeyStyle::Pascal => words.iter().map(|w| capitalize(w)).collect::<String>(),
            KeyStyle::Snake => words.join("_"),
            KeyStyle::Kebab => words.join("-"),
            KeyStyle::Raw => words.concat(),
        };
        Some(id)
    }
}

/// Lowercased alphanumeric words of a text, in order.
fn split_words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Normalize text for duplicate detection: case-folded, whitespace stripped.
pub fn normalize_text(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect()
}
