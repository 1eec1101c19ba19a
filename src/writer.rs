//! Format-preserving output: language file rendering and source patching.
//!
//! Each physical language file is re-rendered from the tree slice holding
//! its keys, using the indent, quote styles and surrounding prefix/suffix
//! remembered at read time. Writing an unmodified dictionary reproduces
//! the original file byte-for-byte. Source patches are literal substring
//! replacements of the scanned call expression.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::{
    config::WriteOrder,
    dictionary::{Dictionary, FileExtraInfo, LocaleFiles, loose::Quote},
    keytree::EntryTree,
};

/// One staged source rewrite: replace `raw` with `fixed_raw` verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchedEntry {
    pub key: String,
    pub raw: String,
    pub fixed_raw: String,
}

/// What a write pass actually did. Failures never abort the pass.
#[derive(Debug, Default)]
pub struct WriteReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<String>,
}

/// Rewrite every language file under `root`.
pub fn write_language_files(
    root: &Path,
    dictionary: &Dictionary,
    tree: &EntryTree,
    files: &LocaleFiles,
    order: WriteOrder,
    last_seen: &HashMap<String, usize>,
) -> WriteReport {
    let mut report = WriteReport::default();

    let mut scopes: BTreeSet<String> = dictionary
        .entries()
        .map(|(_, e)| e.file_scope.clone())
        .collect();
    for ((_, scope), _) in files.iter() {
        scopes.insert(scope.clone());
    }

    for lang in dictionary.languages() {
        for scope in &scopes {
            let slice = tree.slice(|id| {
                dictionary
                    .get(id)
                    .is_some_and(|e| e.file_scope == *scope && e.values.contains_key(lang))
            });
            let existing = files.get(lang, scope);
            if slice.is_empty() && existing.is_none() {
                continue;
            }
            let default_extra = FileExtraInfo::default();
            let extra = existing.map(|f| &f.extra).unwrap_or(&default_extra);
            let content = render_file(&slice, dictionary, lang, extra, order, last_seen);
            let path = files.path_or_default(root, lang, scope);
            match write_file(&path, &content) {
                Ok(()) => report.written.push(path),
                Err(e) => report.failures.push(format!("{}: {:#}", path.display(), e)),
            }
        }
    }

    report
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| "write failed".to_string())
}

/// Render one language file: remembered prefix, the object literal, then
/// the remembered suffix.
pub fn render_file(
    slice: &EntryTree,
    dictionary: &Dictionary,
    lang: &str,
    extra: &FileExtraInfo,
    order: WriteOrder,
    last_seen: &HashMap<String, usize>,
) -> String {
    let mut body = String::new();
    render_node(
        slice.as_map(),
        dictionary,
        lang,
        extra,
        order,
        last_seen,
        1,
        &mut body,
    );
    format!("{}{}{}", extra.prefix, body, extra.suffix)
}

#[allow(clippy::too_many_arguments)]
fn render_node(
    node: &Map<String, Value>,
    dictionary: &Dictionary,
    lang: &str,
    extra: &FileExtraInfo,
    order: WriteOrder,
    last_seen: &HashMap<String, usize>,
    depth: usize,
    out: &mut String,
) {
    if node.is_empty() {
        out.push_str("{}");
        return;
    }

    let entries = ordered_entries(node, order, last_seen);

    if extra.compact {
        out.push_str("{ ");
        for (i, (segment, child)) in entries.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&quote_string(segment, extra.key_quote, extra.unicode_escapes));
            out.push_str(": ");
            render_value(child, dictionary, lang, extra, order, last_seen, depth, out);
        }
        out.push_str(" }");
        return;
    }

    out.push_str("{\n");
    for (i, (segment, child)) in entries.iter().enumerate() {
        for _ in 0..depth {
            out.push_str(&extra.indent);
        }
        out.push_str(&quote_string(segment, extra.key_quote, extra.unicode_escapes));
        out.push_str(": ");
        render_value(child, dictionary, lang, extra, order, last_seen, depth, out);
        if i + 1 < entries.len() {
            out.push(',');
        }
        out.push('\n');
    }
    for _ in 0..depth - 1 {
        out.push_str(&extra.indent);
    }
    out.push('}');
}

#[allow(clippy::too_many_arguments)]
fn render_value(
    child: &Value,
    dictionary: &Dictionary,
    lang: &str,
    extra: &FileExtraInfo,
    order: WriteOrder,
    last_seen: &HashMap<String, usize>,
    depth: usize,
    out: &mut String,
) {
    match child {
        Value::String(id) => {
            let text = dictionary
                .get(id)
                .and_then(|e| e.values.get(lang))
                .map(String::as_str)
                .unwrap_or("");
            out.push_str(&quote_string(text, extra.value_quote, extra.unicode_escapes));
        }
        Value::Object(branch) => {
            render_node(
                branch,
                dictionary,
                lang,
                extra,
                order,
                last_seen,
                depth + 1,
                out,
            );
        }
        _ => out.push_str("\"\""),
    }
}

fn ordered_entries<'a>(
    node: &'a Map<String, Value>,
    order: WriteOrder,
    last_seen: &HashMap<String, usize>,
) -> Vec<(&'a String, &'a Value)> {
    let mut entries: Vec<(&String, &Value)> = node.iter().collect();
    match order {
        WriteOrder::Original => {}
        WriteOrder::Alphabetical => entries.sort_by(|a, b| a.0.cmp(b.0)),
        WriteOrder::Usage => {
            // Stable: keys never seen by the census keep their position at
            // the end in original relative order.
            entries.sort_by_key(|(_, child)| subtree_position(child, last_seen));
        }
    }
    entries
}

/// Earliest last-seen census position among a subtree's leaves.
fn subtree_position(child: &Value, last_seen: &HashMap<String, usize>) -> usize {
    match child {
        Value::String(id) => last_seen.get(id).copied().unwrap_or(usize::MAX),
        Value::Object(branch) => branch
            .values()
            .map(|c| subtree_position(c, last_seen))
            .min()
            .unwrap_or(usize::MAX),
        _ => usize::MAX,
    }
}

fn quote_string(text: &str, quote: Quote, unicode_escapes: bool) -> String {
    let q = quote.char();
    let mut out = String::with_capacity(text.len() + 2);
    out.push(q);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if c == q => {
                out.push('\\');
                out.push(c);
            }
            // Remaining control characters are never valid raw in JSON.
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c if unicode_escapes && !c.is_ascii() => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units).iter() {
                    out.push_str(&format!("\\u{:04x}", unit));
                }
            }
            c => out.push(c),
        }
    }
    out.push(q);
    out
}

/// Apply staged patches file by file. Each patch replaces the first
/// remaining occurrence of its `raw` text.
pub fn patch_sources(patches: &BTreeMap<PathBuf, Vec<PatchedEntry>>) -> WriteReport {
    let mut report = WriteReport::default();

    for (path, entries) in patches {
        match patch_one_file(path, entries) {
            Ok(true) => report.written.push(path.clone()),
            Ok(false) => {}
            Err(e) => report.failures.push(format!("{}: {:#}", path.display(), e)),
        }
    }

    report
}

fn patch_one_file(path: &Path, entries: &[PatchedEntry]) -> Result<bool> {
    let original = fs::read_to_string(path)
        .with_context(|| format!("Failed to read: {}", path.display()))?;
    let mut content = original.clone();
    for patch in entries {
        content = content.replacen(&patch.raw, &patch.fixed_raw, 1);
    }
    if content == original {
        return Ok(false);
    }
    fs::write(path, &content).with_context(|| "write failed".to_string())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;
    use crate::dictionary;

    fn reload_and_render(path_root: &Path, order: WriteOrder) -> WriteReport {
        let loaded = dictionary::load(path_root, "en").unwrap();
        write_language_files(
            path_root,
            &loaded.dictionary,
            &loaded.tree,
            &loaded.files,
            order,
            &HashMap::new(),
        )
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let dir = tempdir().unwrap();
        let original = "{\n  \"menu\": {\n    \"save\": \"Save\",\n    \"open\": \"Open\"\n  },\n  \"title\": \"Home\"\n}\n";
        fs::write(dir.path().join("en.json"), original).unwrap();

        let report = reload_and_render(dir.path(), WriteOrder::Original);
        assert!(report.failures.is_empty());
        let rewritten = fs::read_to_string(dir.path().join("en.json")).unwrap();
        assert_eq!(rewritten, original);
    }

    #[test]
    fn test_round_trip_js_module_single_quotes() {
        let dir = tempdir().unwrap();
        let original = "export default {\n  'save': 'It\\'s saved',\n  'menu': {\n    'open': 'Open'\n  }\n};\n";
        fs::write(dir.path().join("en.js"), original).unwrap();

        let report = reload_and_render(dir.path(), WriteOrder::Original);
        assert!(report.failures.is_empty());
        let rewritten = fs::read_to_string(dir.path().join("en.js")).unwrap();
        assert_eq!(rewritten, original);
    }

    #[test]
    fn test_round_trip_compact_file() {
        let dir = tempdir().unwrap();
        let original = "{ \"save\": \"Save\", \"menu\": { \"open\": \"Open\" } }\n";
        fs::write(dir.path().join("en.json"), original).unwrap();

        reload_and_render(dir.path(), WriteOrder::Original);
        let rewritten = fs::read_to_string(dir.path().join("en.json")).unwrap();
        assert_eq!(rewritten, original);
    }

    #[test]
    fn test_round_trip_four_space_indent() {
        let dir = tempdir().unwrap();
        let original = "{\n    \"a\": \"1\",\n    \"b\": {\n        \"c\": \"2\"\n    }\n}\n";
        fs::write(dir.path().join("en.json"), original).unwrap();

        reload_and_render(dir.path(), WriteOrder::Original);
        let rewritten = fs::read_to_string(dir.path().join("en.json")).unwrap();
        assert_eq!(rewritten, original);
    }

    #[test]
    fn test_alphabetical_order() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("en.json"),
            "{\n  \"b\": \"2\",\n  \"a\": \"1\"\n}\n",
        )
        .unwrap();

        reload_and_render(dir.path(), WriteOrder::Alphabetical);
        let rewritten = fs::read_to_string(dir.path().join("en.json")).unwrap();
        assert_eq!(rewritten, "{\n  \"a\": \"1\",\n  \"b\": \"2\"\n}\n");
    }

    #[test]
    fn test_usage_order_puts_unseen_last() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("en.json"),
            "{\n  \"a\": \"1\",\n  \"b\": \"2\",\n  \"c\": \"3\"\n}\n",
        )
        .unwrap();

        let loaded = dictionary::load(dir.path(), "en").unwrap();
        let last_seen = HashMap::from([("c".to_string(), 1), ("a".to_string(), 2)]);
        write_language_files(
            dir.path(),
            &loaded.dictionary,
            &loaded.tree,
            &loaded.files,
            WriteOrder::Usage,
            &last_seen,
        );
        let rewritten = fs::read_to_string(dir.path().join("en.json")).unwrap();
        assert_eq!(rewritten, "{\n  \"c\": \"3\",\n  \"a\": \"1\",\n  \"b\": \"2\"\n}\n");
    }

    #[test]
    fn test_languages_written_separately() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("en.json"),
            "{\n  \"save\": \"Save\",\n  \"open\": \"Open\"\n}\n",
        )
        .unwrap();
        fs::write(dir.path().join("zh.json"), "{\n  \"save\": \"保存\"\n}\n").unwrap();

        let report = reload_and_render(dir.path(), WriteOrder::Original);
        assert_eq!(report.written.len(), 2);
        // zh lacks "open"; its file must not gain an empty entry.
        let zh = fs::read_to_string(dir.path().join("zh.json")).unwrap();
        assert_eq!(zh, "{\n  \"save\": \"保存\"\n}\n");
    }

    #[test]
    fn test_new_language_file_created_with_defaults() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("en.json"), "{\n  \"save\": \"Save\"\n}\n").unwrap();

        let loaded = dictionary::load(dir.path(), "en").unwrap();
        let mut dictionary = loaded.dictionary;
        dictionary.upsert("save", "", "fr", "Enregistrer".to_string());
        write_language_files(
            dir.path(),
            &dictionary,
            &loaded.tree,
            &loaded.files,
            WriteOrder::Original,
            &HashMap::new(),
        );
        let fr = fs::read_to_string(dir.path().join("fr.json")).unwrap();
        assert_eq!(fr, "{\n  \"save\": \"Enregistrer\"\n}\n");
    }

    #[test]
    fn test_scoped_files_get_their_own_keys() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("en")).unwrap();
        fs::write(
            dir.path().join("en/common.json"),
            "{\n  \"save\": \"Save\"\n}\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("en/home.json"),
            "{\n  \"title\": \"Home\"\n}\n",
        )
        .unwrap();

        reload_and_render(dir.path(), WriteOrder::Original);
        let common = fs::read_to_string(dir.path().join("en/common.json")).unwrap();
        assert_eq!(common, "{\n  \"save\": \"Save\"\n}\n");
        let home = fs::read_to_string(dir.path().join("en/home.json")).unwrap();
        assert_eq!(home, "{\n  \"title\": \"Home\"\n}\n");
    }

    #[test]
    fn test_value_escaping() {
        assert_eq!(quote_string("a\"b", Quote::Double, false), "\"a\\\"b\"");
        assert_eq!(quote_string("a\"b", Quote::Single, false), "'a\"b'");
        assert_eq!(quote_string("it's", Quote::Single, false), "'it\\'s'");
        assert_eq!(
            quote_string("line\nbreak", Quote::Double, false),
            "\"line\\nbreak\""
        );
        assert_eq!(
            quote_string("back\\slash", Quote::Double, false),
            "\"back\\\\slash\""
        );
    }

    #[test]
    fn test_control_characters_always_escaped() {
        assert_eq!(quote_string("a\u{8}b", Quote::Double, false), "\"a\\bb\"");
        assert_eq!(quote_string("a\u{c}b", Quote::Double, false), "\"a\\fb\"");
        assert_eq!(
            quote_string("a\u{1}b", Quote::Double, false),
            "\"a\\u0001b\""
        );
    }

    #[test]
    fn test_unicode_escape_mode() {
        assert_eq!(
            quote_string("café", Quote::Double, true),
            "\"caf\\u00e9\""
        );
        // Non-BMP characters become a surrogate pair.
        assert_eq!(
            quote_string("🎉", Quote::Double, true),
            "\"\\ud83c\\udf89\""
        );
        assert_eq!(quote_string("café", Quote::Double, false), "\"café\"");
    }

    #[test]
    fn test_round_trip_unicode_escape_file() {
        let dir = tempdir().unwrap();
        let original = "{\n  \"note\": \"caf\\u00e9\",\n  \"bell\": \"\\b\"\n}\n";
        fs::write(dir.path().join("en.json"), original).unwrap();

        let report = reload_and_render(dir.path(), WriteOrder::Original);
        assert!(report.failures.is_empty());
        let rewritten = fs::read_to_string(dir.path().join("en.json")).unwrap();
        assert_eq!(rewritten, original);
    }

    #[test]
    fn test_round_trip_keeps_raw_unicode() {
        let dir = tempdir().unwrap();
        let original = "{\n  \"name\": \"café 你好\"\n}\n";
        fs::write(dir.path().join("en.json"), original).unwrap();

        reload_and_render(dir.path(), WriteOrder::Original);
        let rewritten = fs::read_to_string(dir.path().join("en.json")).unwrap();
        assert_eq!(rewritten, original);
    }

    #[test]
    fn test_patch_sources_literal_replacement() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("app.ts");
        fs::write(&src, "a(t(\"Save document\"));\nb(t(\"Open\"));\n").unwrap();

        let patches = BTreeMap::from([(
            src.clone(),
            vec![
                PatchedEntry {
                    key: "saveDocument".to_string(),
                    raw: "t(\"Save document\")".to_string(),
                    fixed_raw: "t(\"saveDocument\")".to_string(),
                },
                PatchedEntry {
                    key: "open".to_string(),
                    raw: "t(\"Open\")".to_string(),
                    fixed_raw: "t(\"open\")".to_string(),
                },
            ],
        )]);
        let report = patch_sources(&patches);
        assert_eq!(report.written, vec![src.clone()]);
        let patched = fs::read_to_string(&src).unwrap();
        assert_eq!(patched, "a(t(\"saveDocument\"));\nb(t(\"open\"));\n");
    }

    #[test]
    fn test_patch_missing_file_is_failure_not_panic() {
        let patches = BTreeMap::from([(
            PathBuf::from("/nonexistent/app.ts"),
            vec![PatchedEntry {
                key: "k".to_string(),
                raw: "t(\"x\")".to_string(),
                fixed_raw: "t(\"k\")".to_string(),
            }],
        )]);
        let report = patch_sources(&patches);
        assert_eq!(report.failures.len(), 1);
        assert!(report.written.is_empty());
    }
}
