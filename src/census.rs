//! The census: reconcile every call-site in the source tree with the
//! dictionary and classify keys as used, unused or undefined.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fs,
    ops::Range,
    path::{Path, PathBuf},
};

use anyhow::Result;
use colored::Colorize;
use glob::{Pattern, glob};
use walkdir::WalkDir;

use crate::{
    config::{Config, SOURCE_EXTENSIONS, TEST_FILE_PATTERNS},
    dictionary::Dictionary,
    keytree::{EntryTree, KeyResolver},
    scanner::{self, NameInfo},
};

/// One call-site location for a resolved key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub file: PathBuf,
    pub range: Range<usize>,
}

/// A call-site whose text resolved to no dictionary key.
#[derive(Debug, Clone)]
pub struct UndefinedEntry {
    pub info: NameInfo,
    pub file: PathBuf,
    pub range: Range<usize>,
    /// Verbatim call expression, for literal patching later.
    pub raw: String,
    /// Byte spans of the text arguments within `raw`; only these may be
    /// rewritten when the call-site is patched.
    pub text_spans: Vec<Range<usize>>,
}

#[derive(Debug, Default)]
pub struct CensusReport {
    /// Key id → call-sites, ordered by byte offset within each file.
    pub used: BTreeMap<String, Vec<Occurrence>>,
    /// Dictionary keys with no call-site, in tree order.
    pub unused: Vec<String>,
    /// Call-sites needing a key, in scan order.
    pub undefined: Vec<UndefinedEntry>,
    /// Non-reference language → keys missing a value there.
    pub lack: BTreeMap<String, Vec<String>>,
    /// Language → keys it defines that the reference language lacks.
    pub extra: BTreeMap<String, Vec<String>>,
    /// Key id → position of its last call-site in walk order.
    pub last_seen: HashMap<String, usize>,
    pub scanned_files: usize,
    pub skipped_count: usize,
}

impl CensusReport {
    pub fn has_findings(&self) -> bool {
        !self.unused.is_empty()
            || !self.undefined.is_empty()
            || self.lack.values().any(|v| !v.is_empty())
            || self.extra.values().any(|v| !v.is_empty())
    }
}

/// Check if a pattern contains glob wildcards (* or ?).
/// Patterns without wildcards are treated as literal directory paths.
fn is_glob_pattern(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

pub struct FileScanResult {
    pub files: Vec<PathBuf>,
    pub skipped_count: usize,
}

/// Collect the source files eligible for scanning, sorted for a stable
/// walk order.
pub fn collect_files(
    base_dir: &Path,
    includes: &[String],
    ignore_patterns: &[String],
    ignore_test_files: bool,
    verbose: bool,
) -> FileScanResult {
    let mut files: BTreeSet<PathBuf> = BTreeSet::new();
    let mut skipped_count = 0;

    let mut literal_ignore_paths: Vec<PathBuf> = Vec::new();
    let mut glob_patterns: Vec<Pattern> = Vec::new();

    for p in ignore_patterns {
        if is_glob_pattern(p) {
            match Pattern::new(p) {
                Ok(pattern) => glob_patterns.push(pattern),
                Err(e) => {
                    if verbose {
                        eprintln!(
                            "{} Invalid ignore pattern '{}': {}",
                            "warning:".bold().yellow(),
                            p,
                            e
                        );
                    }
                }
            }
        } else {
            literal_ignore_paths.push(base_dir.join(p));
        }
    }

    if ignore_test_files {
        for p in TEST_FILE_PATTERNS {
            if let Ok(pattern) = Pattern::new(p) {
                glob_patterns.push(pattern);
            }
        }
    }

    let dirs_to_scan: Vec<PathBuf> = if includes.is_empty() {
        vec![base_dir.to_path_buf()]
    } else {
        let mut paths = Vec::new();
        for inc in includes {
            if is_glob_pattern(inc) {
                // Glob mode: expand pattern to matching directories
                let full_pattern = base_dir.join(inc);
                let pattern_str = full_pattern.to_string_lossy();
                match glob(&pattern_str) {
                    Ok(entries) => {
                        for entry in entries.flatten() {
                            if entry.is_dir() {
                                paths.push(entry);
                            }
                        }
                    }
                    Err(e) => {
                        if verbose {
                            eprintln!(
                                "{} Invalid glob pattern '{}': {}",
                                "warning:".bold().yellow(),
                                inc,
                                e
                            );
                        }
                    }
                }
            } else {
                let path = base_dir.join(inc);
                if path.exists() {
                    paths.push(path);
                } else if verbose {
                    eprintln!(
                        "{} Include path does not exist: {}",
                        "warning:".bold().yellow(),
                        path.display()
                    );
                }
            }
        }
        paths
    };

    for dir in dirs_to_scan {
        for entry in WalkDir::new(dir) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    skipped_count += 1;
                    if verbose {
                        eprintln!("{} Cannot access path: {}", "warning:".bold().yellow(), e);
                    }
                    continue;
                }
            };
            let path = entry.path();
            let path_str = path.to_string_lossy();

            if literal_ignore_paths
                .iter()
                .any(|ignore_path| path.starts_with(ignore_path))
            {
                continue;
            }

            if glob_patterns.iter().any(|p| p.matches(&path_str)) {
                continue;
            }

            if path.is_file() && is_scannable_file(path) {
                files.insert(path.to_path_buf());
            }
        }
    }

    FileScanResult {
        files: files.into_iter().collect(),
        skipped_count,
    }
}

fn is_scannable_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e))
}

/// Run a full census over `root`.
pub fn census(
    root: &Path,
    config: &Config,
    dictionary: &Dictionary,
    tree: &EntryTree,
    verbose: bool,
) -> Result<CensusReport> {
    let source_root = root.join(&config.source_root);
    let scan = collect_files(
        &source_root,
        &config.includes,
        &config.ignores,
        config.ignore_test_files,
        verbose,
    );

    let mut report = CensusReport {
        skipped_count: scan.skipped_count,
        ..Default::default()
    };
    let mut resolver = KeyResolver::new();
    let mut position = 0usize;

    for file in &scan.files {
        let text = match fs::read_to_string(file) {
            Ok(text) => text,
            Err(e) => {
                report.skipped_count += 1;
                if verbose {
                    eprintln!(
                        "{} Cannot read {}: {}",
                        "warning:".bold().yellow(),
                        file.display(),
                        e
                    );
                }
                continue;
            }
        };
        report.scanned_files += 1;

        for entry in scanner::scan(&text, &config.function_names) {
            position += 1;
            if entry.info.has_vars() {
                classify_interpolated(&entry, file, position, dictionary, &mut report);
            } else {
                classify_literal(&entry, file, position, tree, &mut resolver, &mut report);
            }
        }
    }

    for key in tree.leaf_ids() {
        if config.is_forced_used(&key) {
            report.used.entry(key).or_default();
        }
    }

    for key in tree.leaf_ids() {
        if !report.used.contains_key(&key) {
            report.unused.push(key);
        }
    }

    reconcile_languages(dictionary, tree, &mut report);

    Ok(report)
}

/// An interpolated call-site is used by every key whose reference value
/// its pattern matches; with no match it is undefined.
fn classify_interpolated(
    entry: &scanner::ScannedEntry,
    file: &Path,
    position: usize,
    dictionary: &Dictionary,
    report: &mut CensusReport,
) {
    let Some(re) = regex::Regex::new(&entry.info.regex).ok() else {
        return; // built from escaped literals, failure means a scanner bug
    };
    let mut matched = false;
    for (id, dict_entry) in dictionary.entries() {
        let Some(value) = dict_entry.values.get(&dictionary.reference_lang) else {
            continue;
        };
        if re.is_match(value) {
            matched = true;
            mark_used(report, id, file, entry.range.clone(), position);
        }
    }
    if !matched {
        report.undefined.push(UndefinedEntry {
            info: entry.info.clone(),
            file: file.to_path_buf(),
            range: entry.range.clone(),
            raw: entry.raw.clone(),
            text_spans: entry.text_spans.clone(),
        });
    }
}

fn classify_literal(
    entry: &scanner::ScannedEntry,
    file: &Path,
    position: usize,
    tree: &EntryTree,
    resolver: &mut KeyResolver,
    report: &mut CensusReport,
) {
    let path = candidate_path(&entry.info);
    match resolver.resolve(tree, &path) {
        Some(id) => mark_used(report, &id, file, entry.range.clone(), position),
        None => report.undefined.push(UndefinedEntry {
            info: entry.info.clone(),
            file: file.to_path_buf(),
            range: entry.range.clone(),
            raw: entry.raw.clone(),
            text_spans: entry.text_spans.clone(),
        }),
    }
}

/// The dotted path a literal call-site looks up: an explicit bound name
/// wins over the text, and a bound class prepends its namespace.
pub fn candidate_path(info: &NameInfo) -> String {
    let base = info.bound_name.as_deref().unwrap_or(&info.text);
    match &info.bound_class {
        Some(class) => format!("{}.{}", class, base),
        None => base.to_string(),
    }
}

fn mark_used(
    report: &mut CensusReport,
    id: &str,
    file: &Path,
    range: Range<usize>,
    position: usize,
) {
    report.used.entry(id.to_string()).or_default().push(Occurrence {
        file: file.to_path_buf(),
        range,
    });
    report.last_seen.insert(id.to_string(), position);
}

/// Per-language reconciliation against the reference language.
fn reconcile_languages(dictionary: &Dictionary, tree: &EntryTree, report: &mut CensusReport) {
    let reference = &dictionary.reference_lang;
    for lang in dictionary.languages() {
        if lang == reference {
            continue;
        }
        let mut lack = Vec::new();
        let mut extra = Vec::new();
        for id in tree.leaf_ids() {
            let Some(entry) = dictionary.get(&id) else {
                continue;
            };
            let has_ref = entry.values.contains_key(reference);
            let has_lang = entry.values.contains_key(lang);
            if has_ref && !has_lang {
                lack.push(id.clone());
            } else if has_lang && !has_ref {
                extra.push(id.clone());
            }
        }
        report.lack.insert(lang.clone(), lack);
        report.extra.insert(lang.clone(), extra);
    }
}

#[cfg(test)]
mod tests {
    use std::fs::{self, File};

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    fn dict_with(entries: &[(&str, &str)]) -> (Dictionary, EntryTree) {
        let mut dictionary = Dictionary::new("en");
        let mut tree = EntryTree::new();
        for (id, value) in entries {
            let segments = crate::utils::split_key(id);
            tree.insert(&segments);
            dictionary.upsert(id, "", "en", value.to_string());
        }
        (dictionary, tree)
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn run(root: &Path, dictionary: &Dictionary, tree: &EntryTree) -> CensusReport {
        let config = Config {
            includes: Vec::new(),
            ..Default::default()
        };
        census(root, &config, dictionary, tree, false).unwrap()
    }

    #[test]
    fn test_used_unused_undefined_split() {
        let dir = tempdir().unwrap();
        write(dir.path(), "app.ts", "t(\"menu.save\")\nt(\"No such key\")\n");
        let (dictionary, tree) = dict_with(&[("menu.save", "Save"), ("menu.open", "Open")]);

        let report = run(dir.path(), &dictionary, &tree);
        assert!(report.used.contains_key("menu.save"));
        assert_eq!(report.unused, vec!["menu.open"]);
        assert_eq!(report.undefined.len(), 1);
        assert_eq!(report.undefined[0].info.text, "No such key");
        assert!(report.has_findings());
    }

    #[test]
    fn test_occurrences_ordered_within_file() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.ts", "t(\"k\")\nx();\nt(\"k\")\n");
        let (dictionary, tree) = dict_with(&[("k", "v")]);

        let report = run(dir.path(), &dictionary, &tree);
        let occurrences = &report.used["k"];
        assert_eq!(occurrences.len(), 2);
        assert!(occurrences[0].range.start < occurrences[1].range.start);
    }

    #[test]
    fn test_bound_name_takes_precedence() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.ts", "t(\"%menu.save%Anything at all\")\n");
        let (dictionary, tree) = dict_with(&[("menu.save", "Save")]);

        let report = run(dir.path(), &dictionary, &tree);
        assert!(report.used.contains_key("menu.save"));
        assert!(report.undefined.is_empty());
    }

    #[test]
    fn test_bound_class_prepends_namespace() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.ts", "t(\"#menu#save\")\n");
        let (dictionary, tree) = dict_with(&[("menu.save", "Save")]);

        let report = run(dir.path(), &dictionary, &tree);
        assert!(report.used.contains_key("menu.save"));
    }

    #[test]
    fn test_interpolated_matches_by_value() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.ts", "t(`Hello ${name}`)\n");
        let (dictionary, tree) = dict_with(&[
            ("greetShort", "Hello Bob"),
            ("greetLong", "Hello dear friend"),
            ("bye", "Goodbye"),
        ]);

        let report = run(dir.path(), &dictionary, &tree);
        assert!(report.used.contains_key("greetShort"));
        assert!(report.used.contains_key("greetLong"));
        assert!(!report.used.contains_key("bye"));
        assert!(report.undefined.is_empty());
    }

    #[test]
    fn test_interpolated_without_match_is_undefined() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.ts", "t(`Total ${n} items`)\n");
        let (dictionary, tree) = dict_with(&[("bye", "Goodbye")]);

        let report = run(dir.path(), &dictionary, &tree);
        assert_eq!(report.undefined.len(), 1);
        assert_eq!(report.undefined[0].info.text, "Total {0} items");
    }

    #[test]
    fn test_forced_used_keys() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.ts", "export {};\n");
        let (dictionary, tree) = dict_with(&[("legal.tos", "Terms"), ("other", "x")]);

        let config = Config {
            includes: Vec::new(),
            used_keys: vec!["legal.*".to_string()],
            ..Default::default()
        };
        let report = census(dir.path(), &config, &dictionary, &tree, false).unwrap();
        assert!(report.used.contains_key("legal.tos"));
        assert_eq!(report.unused, vec!["other"]);
    }

    #[test]
    fn test_lack_and_extra_per_language() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.ts", "export {};\n");

        let mut dictionary = Dictionary::new("en");
        let mut tree = EntryTree::new();
        for (id, lang, value) in [
            ("save", "en", "Save"),
            ("save", "zh", "保存"),
            ("open", "en", "Open"),
            ("legacy", "zh", "遗留"),
        ] {
            tree.insert(&crate::utils::split_key(id));
            dictionary.upsert(id, "", lang, value.to_string());
        }

        let report = run(dir.path(), &dictionary, &tree);
        assert_eq!(report.lack["zh"], vec!["open"]);
        assert_eq!(report.extra["zh"], vec!["legacy"]);
        assert!(report.has_findings());
    }

    #[test]
    fn test_collect_files_extensions_and_ignores() {
        let dir = tempdir().unwrap();
        write(dir.path(), "src/app.tsx", "");
        write(dir.path(), "src/style.css", "");
        write(dir.path(), "src/page.vue", "");
        write(dir.path(), "node_modules/lib.ts", "");

        let result = collect_files(
            dir.path(),
            &[],
            &["**/node_modules/**".to_string()],
            false,
            false,
        );
        let names: Vec<String> = result
            .files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["app.tsx", "page.vue"]);
    }

    #[test]
    fn test_collect_files_literal_include() {
        let dir = tempdir().unwrap();
        write(dir.path(), "src/app.ts", "");
        write(dir.path(), "lib/utils.ts", "");

        let result = collect_files(dir.path(), &["src".to_string()], &[], false, false);
        assert_eq!(result.files.len(), 1);
        assert!(result.files[0].ends_with("src/app.ts"));
    }

    #[test]
    fn test_collect_files_skips_test_files() {
        let dir = tempdir().unwrap();
        write(dir.path(), "app.ts", "");
        write(dir.path(), "app.test.ts", "");
        File::create(dir.path().join("app.spec.tsx")).unwrap();

        let result = collect_files(dir.path(), &[], &[], true, false);
        assert_eq!(result.files.len(), 1);
        assert!(result.files[0].ends_with("app.ts"));
    }

    #[test]
    fn test_last_seen_positions_increase() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.ts", "t(\"first\")\nt(\"second\")\n");
        let (dictionary, tree) = dict_with(&[("first", "One"), ("second", "Two")]);

        let report = run(dir.path(), &dictionary, &tree);
        assert!(report.last_seen["first"] < report.last_seen["second"]);
    }
}
