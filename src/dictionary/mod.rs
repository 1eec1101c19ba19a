//! On-disk dictionary loading.
//!
//! A locales root holds either one file per language (`en.json`, `zh.js`)
//! or one directory per language whose files become file scopes
//! (`en/common.json` → scope `common`). Every file is flattened into the
//! shared [`Dictionary`] and [`EntryTree`]; formatting metadata is captured
//! per physical file so the writer can reproduce the original layout.

pub mod loose;

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};

use crate::dictionary::loose::Quote;
use crate::keytree::EntryTree;

const DICT_EXTENSIONS: &[&str] = &["json", "js", "ts", "mjs", "cjs"];

/// One dictionary key with its per-language texts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictEntry {
    /// Escaped dotted id; equal to the dictionary map key.
    pub full_path: String,
    /// File scope the key is written to (`""` for single-file locales).
    pub file_scope: String,
    /// Language → text. Internally consistent for the language set known
    /// at read time.
    pub values: BTreeMap<String, String>,
}

/// Key-id → entry mapping for all languages. Lookup order is irrelevant;
/// the [`EntryTree`] carries original file order.
#[derive(Debug, Default)]
pub struct Dictionary {
    pub reference_lang: String,
    entries: HashMap<String, DictEntry>,
    languages: BTreeSet<String>,
}

impl Dictionary {
    pub fn new(reference_lang: &str) -> Self {
        Self {
            reference_lang: reference_lang.to_string(),
            entries: HashMap::new(),
            languages: BTreeSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&DictEntry> {
        self.entries.get(id)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &DictEntry)> {
        self.entries.iter()
    }

    pub fn languages(&self) -> &BTreeSet<String> {
        &self.languages
    }

    /// Whether any value exists for the reference language.
    pub fn has_reference_lang(&self) -> bool {
        self.entries
            .values()
            .any(|e| e.values.contains_key(&self.reference_lang))
    }

    pub fn reference_value(&self, id: &str) -> Option<&str> {
        self.entries
            .get(id)?
            .values
            .get(&self.reference_lang)
            .map(String::as_str)
    }

    /// Insert or update one language value for a key.
    pub fn upsert(&mut self, id: &str, scope: &str, lang: &str, text: String) {
        self.languages.insert(lang.to_string());
        let entry = self.entries.entry(id.to_string()).or_insert_with(|| DictEntry {
            full_path: id.to_string(),
            file_scope: scope.to_string(),
            values: BTreeMap::new(),
        });
        entry.values.insert(lang.to_string(), text);
    }

    /// Drop a key entirely. Used to revert staged additions.
    pub fn remove(&mut self, id: &str) -> Option<DictEntry> {
        self.entries.remove(id)
    }

    /// Existing key whose reference-language value normalizes to
    /// `normalized`, if any. Linear scan; dictionaries are small.
    pub fn find_by_normalized_value(&self, normalized: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, e)| {
                e.values
                    .get(&self.reference_lang)
                    .is_some_and(|v| crate::utils::normalize_text(v) == normalized)
            })
            .map(|(id, _)| id.as_str())
    }
}

/// Formatting remembered from a file's original read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileExtraInfo {
    /// Verbatim text before the object literal (module syntax, comments).
    pub prefix: String,
    /// Verbatim text after the object literal.
    pub suffix: String,
    /// One indent unit.
    pub indent: String,
    /// Single-line object literal with no newlines.
    pub compact: bool,
    pub key_quote: Quote,
    pub value_quote: Quote,
    /// The file wrote non-ASCII characters as `\u` escape sequences.
    pub unicode_escapes: bool,
}

impl Default for FileExtraInfo {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            suffix: "\n".to_string(),
            indent: "  ".to_string(),
            compact: false,
            key_quote: Quote::Double,
            value_quote: Quote::Double,
            unicode_escapes: false,
        }
    }
}

#[derive(Debug)]
pub struct FileInfo {
    pub path: PathBuf,
    pub extra: FileExtraInfo,
}

/// Physical file registry keyed by `(language, scope)`.
#[derive(Debug, Default)]
pub struct LocaleFiles {
    files: HashMap<(String, String), FileInfo>,
}

impl LocaleFiles {
    pub fn get(&self, lang: &str, scope: &str) -> Option<&FileInfo> {
        self.files.get(&(lang.to_string(), scope.to_string()))
    }

    pub fn insert(&mut self, lang: &str, scope: &str, info: FileInfo) {
        self.files.insert((lang.to_string(), scope.to_string()), info);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(String, String), &FileInfo)> {
        self.files.iter()
    }

    /// Scopes known for a language, sorted for stable iteration.
    pub fn scopes_for(&self, lang: &str) -> Vec<String> {
        let mut scopes: Vec<String> = self
            .files
            .keys()
            .filter(|(l, _)| l == lang)
            .map(|(_, s)| s.clone())
            .collect();
        scopes.sort();
        scopes
    }

    /// Target path for a `(lang, scope)` pair, creating a default location
    /// for languages that have no file yet.
    pub fn path_or_default(&self, root: &Path, lang: &str, scope: &str) -> PathBuf {
        match self.get(lang, scope) {
            Some(info) => info.path.clone(),
            None if scope.is_empty() => root.join(format!("{}.json", lang)),
            None => root.join(lang).join(format!("{}.json", scope)),
        }
    }
}

#[derive(Debug)]
pub struct LoadResult {
    pub dictionary: Dictionary,
    pub tree: EntryTree,
    pub files: LocaleFiles,
    pub warnings: Vec<String>,
}

/// Load every language file under `root`.
///
/// The reference language is read first so the tree's leaf order mirrors
/// its files; other languages only append keys the reference lacks.
/// A file that fails to parse is reported as a warning and skipped, it
/// never aborts the load.
pub fn load(root: &Path, reference_lang: &str) -> Result<LoadResult> {
    let mut dictionary = Dictionary::new(reference_lang);
    let mut tree = EntryTree::new();
    let mut files = LocaleFiles::default();
    let mut warnings = Vec::new();

    let mut sources = discover(root)
        .with_context(|| format!("Failed to read locales root: {}", root.display()))?;
    // Reference language first, then alphabetical.
    sources.sort_by_key(|s| (s.lang != reference_lang, s.lang.clone(), s.scope.clone()));

    for source in sources {
        match read_file(&source.path) {
            Ok((body, extra)) => {
                flatten(
                    &body,
                    &mut Vec::new(),
                    &source,
                    &mut dictionary,
                    &mut tree,
                    &mut warnings,
                );
                files.insert(
                    &source.lang,
                    &source.scope,
                    FileInfo {
                        path: source.path.clone(),
                        extra,
                    },
                );
            }
            Err(err) => warnings.push(format!("{}: {:#}", source.path.display(), err)),
        }
    }

    Ok(LoadResult {
        dictionary,
        tree,
        files,
        warnings,
    })
}

struct FileSource {
    lang: String,
    scope: String,
    path: PathBuf,
}

fn discover(root: &Path) -> Result<Vec<FileSource>> {
    let mut sources = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if path.is_file() && has_dict_extension(&path) {
            sources.push(FileSource {
                lang: name.to_string(),
                scope: String::new(),
                path,
            });
        } else if path.is_dir() {
            let lang = name.to_string();
            for file in walkdir::WalkDir::new(&path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let fpath = file.path();
                if !fpath.is_file() || !has_dict_extension(fpath) {
                    continue;
                }
                let scope = fpath
                    .strip_prefix(&path)
                    .unwrap_or(fpath)
                    .with_extension("")
                    .to_string_lossy()
                    .replace('\\', "/");
                sources.push(FileSource {
                    lang: lang.clone(),
                    scope,
                    path: fpath.to_path_buf(),
                });
            }
        }
    }
    Ok(sources)
}

fn has_dict_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| DICT_EXTENSIONS.contains(&e))
}

/// Parse one language file into its object body plus formatting metadata.
fn read_file(path: &Path) -> Result<(Map<String, Value>, FileExtraInfo)> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read: {}", path.display()))?;

    let Some(open) = content.find('{') else {
        bail!("no object literal found");
    };
    let close = find_matching_brace(&content, open)
        .with_context(|| "unterminated object literal".to_string())?;

    let body = &content[open..=close];
    let normalized = loose::normalize(body);
    let value: Value = serde_json::from_str(&normalized.json)
        .with_context(|| "failed to parse object literal".to_string())?;
    let Value::Object(map) = value else {
        bail!("root of language file must be an object");
    };

    let extra = FileExtraInfo {
        prefix: content[..open].to_string(),
        suffix: content[close + 1..].to_string(),
        indent: detect_indent(body),
        compact: !body.contains('\n'),
        key_quote: normalized.key_quote,
        value_quote: normalized.value_quote,
        unicode_escapes: has_unicode_escape(body),
    };
    Ok((map, extra))
}

/// Whether the object literal carries any `\uXXXX` escape sequence.
fn has_unicode_escape(body: &str) -> bool {
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.next() == Some('u') {
            return true;
        }
    }
    false
}

/// Index of the `}` matching the `{` at `open`, honoring strings and
/// comments.
fn find_matching_brace(content: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut chars = content[open..].char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            '"' | '\'' | '`' => {
                let quote = c;
                while let Some((_, c2)) = chars.next() {
                    if c2 == '\\' {
                        chars.next();
                    } else if c2 == quote {
                        break;
                    }
                }
            }
            '/' => match chars.peek() {
                Some((_, '/')) => {
                    for (_, c2) in chars.by_ref() {
                        if c2 == '\n' {
                            break;
                        }
                    }
                }
                Some((_, '*')) => {
                    chars.next();
                    while let Some((_, c2)) = chars.next() {
                        if c2 == '*' && matches!(chars.peek(), Some((_, '/'))) {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }
    None
}

/// First indented line's leading whitespace, or two spaces.
fn detect_indent(body: &str) -> String {
    for line in body.lines().skip(1) {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('}') {
            continue;
        }
        let indent: String = line.chars().take_while(|c| c.is_whitespace()).collect();
        if !indent.is_empty() {
            return indent;
        }
    }
    "  ".to_string()
}

fn flatten(
    node: &Map<String, Value>,
    segments: &mut Vec<String>,
    source: &FileSource,
    dictionary: &mut Dictionary,
    tree: &mut EntryTree,
    warnings: &mut Vec<String>,
) {
    for (segment, child) in node {
        segments.push(segment.clone());
        match child {
            Value::String(text) => {
                let id = crate::utils::join_key(segments);
                match dictionary.get(&id) {
                    Some(existing) if existing.file_scope != source.scope => {
                        warnings.push(format!(
                            "{}: key '{}' already defined in scope '{}', skipped",
                            source.path.display(),
                            id,
                            existing.file_scope
                        ));
                    }
                    _ => {
                        tree.insert(segments);
                        dictionary.upsert(&id, &source.scope, &source.lang, text.clone());
                    }
                }
            }
            Value::Object(branch) => {
                flatten(branch, segments, source, dictionary, tree, warnings);
            }
            other => {
                warnings.push(format!(
                    "{}: non-string value at '{}' ignored ({})",
                    source.path.display(),
                    segments.join("."),
                    other
                ));
            }
        }
        segments.pop();
    }
}
