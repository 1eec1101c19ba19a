//! Key generation and patching for undefined call-sites.
//!
//! Entries are processed in scan order. A call-site whose normalized text
//! already equals an existing reference value reuses that key; duplicates
//! within a run share one minted key; everything else gets a fresh id
//! derived from its text under the configured style and namespace
//! strategy. All dictionary mutations are staged and can be reverted.

use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
};

use crate::{
    census::UndefinedEntry,
    config::{Config, NamespaceStrategy},
    dictionary::Dictionary,
    keytree::EntryTree,
    translator::{BatchOptions, Translator, translate_batched},
    utils::{normalize_text, split_key},
    writer::PatchedEntry,
};

/// Path components that carry no meaning for auto-path namespaces.
const PATH_STOP_WORDS: &[&str] = &["src", "app", "pages", "components", "views", "lib", "index"];

/// Fallback id when a text has no usable words at all.
const FALLBACK_ID: &str = "text";

pub struct FixContext<'a> {
    pub config: &'a Config,
    pub source_root: &'a Path,
    /// Backends for deriving English ids when the reference language is
    /// not English. Empty means derive from the raw text.
    pub backends: &'a [&'a dyn Translator],
    pub batch: BatchOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixStatus {
    Clean,
    /// Every translation batch failed; only non-translated entries were
    /// processed.
    TranslatorFailed,
    /// Some translation batches failed; their entries were skipped, the
    /// rest committed.
    TranslatorPartialFailed,
}

/// A dictionary key added by this run, kept so cancellation can revert it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedAddition {
    pub id: String,
    pub segments: Vec<String>,
    pub scope: String,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct FixOutcome {
    /// Source rewrites grouped by file.
    pub patches: BTreeMap<std::path::PathBuf, Vec<PatchedEntry>>,
    pub additions: Vec<StagedAddition>,
    /// Entries reusing a key that already existed.
    pub reused: usize,
    /// Entries skipped because their translation failed.
    pub skipped: usize,
}

impl FixOutcome {
    pub fn patch_count(&self) -> usize {
        self.patches.values().map(Vec::len).sum()
    }
}

/// Mint keys for `undefined` call-sites and stage dictionary additions
/// plus source patches. Returns the staged outcome and its status.
pub async fn fix(
    undefined: &[UndefinedEntry],
    dictionary: &mut Dictionary,
    tree: &mut EntryTree,
    ctx: &FixContext<'_>,
) -> (FixOutcome, FixStatus) {
    let mut outcome = FixOutcome::default();
    let mut status = FixStatus::Clean;

    // English derivation texts, fetched up front in one batched run.
    let (english, translator_status) = derive_english(undefined, dictionary, ctx).await;
    if let Some(s) = translator_status {
        status = s;
    }

    let scope = default_scope(dictionary);
    // normalized text → key id, for intra-run dedup and the repair pass.
    let mut bound: HashMap<String, String> = HashMap::new();
    // Processed entries with the key they explicitly requested, if any.
    let mut processed: Vec<(&UndefinedEntry, Option<String>)> = Vec::new();

    for entry in undefined {
        let normalized = normalize_text(&entry.info.text);

        if let Some(path) = bound_path(entry) {
            let id = mint_bound(&path, &entry.info.text, &scope, dictionary, tree, &mut outcome);
            bound.entry(normalized).or_insert(id.clone());
            processed.push((entry, Some(id)));
            continue;
        }

        if !bound.contains_key(&normalized) {
            let existing = if ctx.config.match_existing_key {
                dictionary.find_by_normalized_value(&normalized)
            } else {
                None
            };
            let key = if let Some(existing) = existing {
                outcome.reused += 1;
                existing.to_string()
            } else {
                let derivation = match english.get(&normalized) {
                    Some(Some(text)) => text.clone(),
                    Some(None) => {
                        // Translation for this text failed; leave the
                        // call-site alone.
                        outcome.skipped += 1;
                        continue;
                    }
                    None => entry.info.text.clone(),
                };
                mint(entry, &derivation, &scope, dictionary, tree, ctx, &mut outcome)
            };
            bound.insert(normalized.clone(), key);
        }
        processed.push((entry, None));
    }

    // Repair pass: patches are built last, from the final binding map, so
    // every entry sharing a text gets the same key no matter what order
    // the bindings appeared in.
    for (entry, forced) in processed {
        let key = match forced {
            Some(key) => key,
            None => {
                let normalized = normalize_text(&entry.info.text);
                match bound.get(&normalized) {
                    Some(key) => key.clone(),
                    None => continue,
                }
            }
        };
        stage_patch(entry, &key, &mut outcome);
    }

    (outcome, status)
}

/// Revert every staged addition, leaving dictionary and tree as loaded.
pub fn revert(outcome: &FixOutcome, dictionary: &mut Dictionary, tree: &mut EntryTree) {
    for addition in &outcome.additions {
        dictionary.remove(&addition.id);
        tree.remove(&addition.segments);
    }
}

/// An explicit bound name is the requested key path itself.
fn bound_path(entry: &UndefinedEntry) -> Option<String> {
    entry
        .info
        .bound_name
        .as_ref()
        .map(|name| match &entry.info.bound_class {
            Some(class) => format!("{}.{}", class, name),
            None => name.clone(),
        })
}

fn mint_bound(
    path: &str,
    text: &str,
    scope: &str,
    dictionary: &mut Dictionary,
    tree: &mut EntryTree,
    outcome: &mut FixOutcome,
) -> String {
    let segments = split_key(path);
    let id = tree.insert(&segments);
    if !dictionary.contains(&id) {
        let reference = dictionary.reference_lang.clone();
        dictionary.upsert(&id, scope, &reference, text.to_string());
        outcome.additions.push(StagedAddition {
            id: id.clone(),
            segments,
            scope: scope.to_string(),
            text: text.to_string(),
        });
    }
    id
}

fn mint(
    entry: &UndefinedEntry,
    derivation: &str,
    scope: &str,
    dictionary: &mut Dictionary,
    tree: &mut EntryTree,
    ctx: &FixContext<'_>,
    outcome: &mut FixOutcome,
) -> String {
    let style = ctx.config.key_style;
    let base = style
        .derive(derivation)
        .unwrap_or_else(|| FALLBACK_ID.to_string());

    let mut segments = namespace_segments(entry, scope, dictionary, ctx);
    segments.push(base.clone());

    // Zero-padded suffixes until the id binds to nothing.
    let mut candidate = crate::utils::join_key(&segments);
    let mut n = 0;
    while dictionary.contains(&candidate) || tree.resolve(&candidate).is_some() {
        n += 1;
        let last = segments.len() - 1;
        segments[last] = if n < 100 {
            format!("{}{:02}", base, n)
        } else {
            format!("{}{}", base, n)
        };
        candidate = crate::utils::join_key(&segments);
    }

    let id = tree.insert(&segments);
    let reference = dictionary.reference_lang.clone();
    dictionary.upsert(&id, scope, &reference, entry.info.text.clone());
    if reference != "en" && derivation != entry.info.text {
        dictionary.upsert(&id, scope, "en", derivation.to_string());
    }
    outcome.additions.push(StagedAddition {
        id: id.clone(),
        segments,
        scope: scope.to_string(),
        text: entry.info.text.clone(),
    });
    id
}

fn namespace_segments(
    entry: &UndefinedEntry,
    scope: &str,
    dictionary: &Dictionary,
    ctx: &FixContext<'_>,
) -> Vec<String> {
    if let Some(class) = &entry.info.bound_class {
        return split_key(class);
    }
    match ctx.config.namespace_strategy {
        NamespaceStrategy::None => Vec::new(),
        NamespaceStrategy::Fixed => split_key(&ctx.config.namespace),
        NamespaceStrategy::AutoPath => path_namespace(entry, ctx),
        NamespaceStrategy::AutoPopular => popular_namespace(scope, dictionary)
            .map(|ns| vec![ns])
            .unwrap_or_default(),
    }
}

/// Namespace from the source file's relative path with stop words removed.
fn path_namespace(entry: &UndefinedEntry, ctx: &FixContext<'_>) -> Vec<String> {
    let rel = entry
        .file
        .strip_prefix(ctx.source_root)
        .unwrap_or(&entry.file);
    rel.with_extension("")
        .components()
        .filter_map(|c| c.as_os_str().to_str().map(str::to_string))
        .filter(|c| !PATH_STOP_WORDS.contains(&c.to_lowercase().as_str()))
        .filter_map(|c| ctx.config.key_style.derive(&c))
        .collect()
}

/// The most populous leading namespace among keys in the same file scope.
fn popular_namespace(scope: &str, dictionary: &Dictionary) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for (id, entry) in dictionary.entries() {
        if entry.file_scope != scope {
            continue;
        }
        if let Some(dot) = id.find('.') {
            *counts.entry(&id[..dot]).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(ns, _)| ns.to_string())
}

/// New keys go to the scope that already holds the most keys.
fn default_scope(dictionary: &Dictionary) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for (_, entry) in dictionary.entries() {
        *counts.entry(entry.file_scope.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(scope, _)| scope.to_string())
        .unwrap_or_default()
}

/// Rewrite only the text-argument spans of the call; every other argument
/// stays verbatim. Interpolated template expressions move out into plain
/// arguments so the call still supplies its placeholder values. Several
/// text literals collapse into the single key literal.
fn stage_patch(entry: &UndefinedEntry, key: &str, outcome: &mut FixOutcome) {
    let (Some(first), Some(last)) = (entry.text_spans.first(), entry.text_spans.last()) else {
        return;
    };
    let mut replacement = format!("\"{}\"", source_escape(key));
    for var in &entry.info.vars {
        replacement.push_str(", ");
        replacement.push_str(var);
    }
    let fixed_raw = format!(
        "{}{}{}",
        &entry.raw[..first.start],
        replacement,
        &entry.raw[last.end..]
    );
    outcome
        .patches
        .entry(entry.file.clone())
        .or_default()
        .push(PatchedEntry {
            key: key.to_string(),
            raw: entry.raw.clone(),
            fixed_raw,
        });
}

/// Escape a key id for embedding in a double-quoted source literal.
fn source_escape(key: &str) -> String {
    key.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Translate the texts that will need an English derivation, keyed by
/// normalized text. `None` inside the map marks a failed batch entry.
async fn derive_english(
    undefined: &[UndefinedEntry],
    dictionary: &Dictionary,
    ctx: &FixContext<'_>,
) -> (HashMap<String, Option<String>>, Option<FixStatus>) {
    if dictionary.reference_lang == "en" || ctx.backends.is_empty() {
        return (HashMap::new(), None);
    }

    let mut order: Vec<String> = Vec::new();
    let mut texts: Vec<String> = Vec::new();
    for entry in undefined {
        if entry.info.bound_name.is_some() {
            continue;
        }
        let normalized = normalize_text(&entry.info.text);
        if ctx.config.match_existing_key
            && dictionary.find_by_normalized_value(&normalized).is_some()
        {
            continue;
        }
        if !order.contains(&normalized) {
            order.push(normalized);
            texts.push(entry.info.text.clone());
        }
    }
    if texts.is_empty() {
        return (HashMap::new(), None);
    }

    let result = translate_batched(
        ctx.backends,
        &dictionary.reference_lang,
        "en",
        &texts,
        &ctx.batch,
    )
    .await;

    let status = if result.all_failed() {
        Some(FixStatus::TranslatorFailed)
    } else if result.partially_failed() {
        Some(FixStatus::TranslatorPartialFailed)
    } else {
        None
    };

    let map = order.into_iter().zip(result.translated).collect();
    (map, status)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        scanner::NameInfo,
        translator::{IdentityTranslator, TranslateFuture},
    };

    fn entry(text: &str, file: &str, raw: &str) -> UndefinedEntry {
        // Span of the single quoted/template literal inside raw.
        let is_quote = |c: char| matches!(c, '"' | '\'' | '`');
        let first = raw.find(is_quote).unwrap();
        let last = raw.rfind(is_quote).unwrap();
        UndefinedEntry {
            info: NameInfo {
                text: text.to_string(),
                vars: Vec::new(),
                regex: String::new(),
                bound_name: None,
                bound_class: None,
            },
            file: PathBuf::from(file),
            range: 0..raw.len(),
            raw: raw.to_string(),
            text_spans: vec![first..last + 1],
        }
    }

    fn context(config: &Config) -> FixContext<'_> {
        FixContext {
            config,
            source_root: Path::new("/project"),
            backends: &[],
            batch: BatchOptions::default(),
        }
    }

    async fn run_fix(
        undefined: &[UndefinedEntry],
        dictionary: &mut Dictionary,
        tree: &mut EntryTree,
        config: &Config,
    ) -> (FixOutcome, FixStatus) {
        fix(undefined, dictionary, tree, &context(config)).await
    }

    fn seeded(entries: &[(&str, &str)]) -> (Dictionary, EntryTree) {
        let mut dictionary = Dictionary::new("en");
        let mut tree = EntryTree::new();
        for (id, value) in entries {
            tree.insert(&split_key(id));
            dictionary.upsert(id, "", "en", value.to_string());
        }
        (dictionary, tree)
    }

    #[tokio::test]
    async fn test_mint_camel_key_from_text() {
        let (mut dictionary, mut tree) = seeded(&[]);
        let config = Config::default();
        let undefined = [entry("Hello world", "/project/src/a.ts", "t(\"Hello world\")")];

        let (outcome, status) = run_fix(&undefined, &mut dictionary, &mut tree, &config).await;
        assert_eq!(status, FixStatus::Clean);
        assert_eq!(outcome.additions.len(), 1);
        assert_eq!(outcome.additions[0].id, "helloWorld");
        assert_eq!(dictionary.reference_value("helloWorld"), Some("Hello world"));
        assert_eq!(tree.resolve("helloWorld").as_deref(), Some("helloWorld"));

        let patches = &outcome.patches[&PathBuf::from("/project/src/a.ts")];
        assert_eq!(patches[0].fixed_raw, "t(\"helloWorld\")");
    }

    #[tokio::test]
    async fn test_same_text_in_two_files_shares_one_key() {
        let (mut dictionary, mut tree) = seeded(&[]);
        let config = Config::default();
        let undefined = [
            entry("Save", "/project/src/a.ts", "t(\"Save\")"),
            entry("Save", "/project/src/b.ts", "t('Save')"),
        ];

        let (outcome, _) = run_fix(&undefined, &mut dictionary, &mut tree, &config).await;
        assert_eq!(outcome.additions.len(), 1);
        assert_eq!(outcome.additions[0].id, "save");
        assert_eq!(outcome.patch_count(), 2);
        for patches in outcome.patches.values() {
            assert_eq!(patches[0].key, "save");
        }
    }

    #[tokio::test]
    async fn test_match_existing_key_reuses_it() {
        let (mut dictionary, mut tree) = seeded(&[("actions.save", "Save")]);
        let config = Config::default();
        let undefined = [entry("  save ", "/project/a.ts", "t(\"  save \")")];

        let (outcome, _) = run_fix(&undefined, &mut dictionary, &mut tree, &config).await;
        assert!(outcome.additions.is_empty());
        assert_eq!(outcome.reused, 1);
        let patches = &outcome.patches[&PathBuf::from("/project/a.ts")];
        assert_eq!(patches[0].fixed_raw, "t(\"actions.save\")");
    }

    #[tokio::test]
    async fn test_patch_keeps_following_arguments() {
        let (mut dictionary, mut tree) = seeded(&[]);
        let config = Config::default();
        let undefined = [entry("Total sum", "/p/a.ts", "t(\"Total sum\", qty)")];

        let (outcome, _) = run_fix(&undefined, &mut dictionary, &mut tree, &config).await;
        let patches = &outcome.patches[&PathBuf::from("/p/a.ts")];
        assert_eq!(patches[0].fixed_raw, "t(\"totalSum\", qty)");
    }

    #[tokio::test]
    async fn test_template_patch_hoists_interpolations() {
        let (mut dictionary, mut tree) = seeded(&[]);
        let config = Config::default();
        let mut e = entry("Hi {0}", "/p/a.ts", "t(`Hi ${name}`)");
        e.info.vars = vec!["name".to_string()];

        let (outcome, _) = run_fix(&[e], &mut dictionary, &mut tree, &config).await;
        assert_eq!(outcome.additions[0].id, "hi0");
        assert_eq!(dictionary.reference_value("hi0"), Some("Hi {0}"));
        let patches = &outcome.patches[&PathBuf::from("/p/a.ts")];
        assert_eq!(patches[0].fixed_raw, "t(\"hi0\", name)");
    }

    #[tokio::test]
    async fn test_match_existing_disabled_mints_new_key() {
        let (mut dictionary, mut tree) = seeded(&[("actions.save", "Save")]);
        let config = Config {
            match_existing_key: false,
            ..Default::default()
        };
        let undefined = [entry("Save", "/p/a.ts", "t(\"Save\")")];

        let (outcome, _) = run_fix(&undefined, &mut dictionary, &mut tree, &config).await;
        assert_eq!(outcome.reused, 0);
        assert_eq!(outcome.additions.len(), 1);
        assert_eq!(outcome.additions[0].id, "save");
        let patches = &outcome.patches[&PathBuf::from("/p/a.ts")];
        assert_eq!(patches[0].fixed_raw, "t(\"save\")");
    }

    #[tokio::test]
    async fn test_fix_is_idempotent() {
        let (mut dictionary, mut tree) = seeded(&[]);
        let config = Config::default();
        let undefined = [entry("Hello world", "/p/a.ts", "t(\"Hello world\")")];

        run_fix(&undefined, &mut dictionary, &mut tree, &config).await;
        let before = dictionary.len();
        let (outcome, _) = run_fix(&undefined, &mut dictionary, &mut tree, &config).await;
        assert_eq!(dictionary.len(), before);
        assert!(outcome.additions.is_empty());
        assert_eq!(outcome.patch_count(), 1);
    }

    #[tokio::test]
    async fn test_collision_gets_padded_suffix() {
        let (mut dictionary, mut tree) = seeded(&[("save", "Persist")]);
        let config = Config::default();
        let undefined = [entry("Save!", "/p/a.ts", "t(\"Save!\")")];

        let (outcome, _) = run_fix(&undefined, &mut dictionary, &mut tree, &config).await;
        assert_eq!(outcome.additions[0].id, "save01");
    }

    #[tokio::test]
    async fn test_bound_name_mints_exact_path() {
        let (mut dictionary, mut tree) = seeded(&[]);
        let config = Config::default();
        let mut e = entry("Save document", "/p/a.ts", "t(\"%menu.save%Save document\")");
        e.info.bound_name = Some("menu.save".to_string());

        let (outcome, _) = run_fix(&[e], &mut dictionary, &mut tree, &config).await;
        assert_eq!(outcome.additions[0].id, "menu.save");
        assert_eq!(dictionary.reference_value("menu.save"), Some("Save document"));
        let patches = &outcome.patches[&PathBuf::from("/p/a.ts")];
        assert_eq!(patches[0].fixed_raw, "t(\"menu.save\")");
    }

    #[tokio::test]
    async fn test_fixed_namespace_strategy() {
        let (mut dictionary, mut tree) = seeded(&[]);
        let config = Config {
            namespace_strategy: NamespaceStrategy::Fixed,
            namespace: "common".to_string(),
            ..Default::default()
        };
        let undefined = [entry("Hello world", "/p/a.ts", "t(\"Hello world\")")];

        let (outcome, _) = run_fix(&undefined, &mut dictionary, &mut tree, &config).await;
        assert_eq!(outcome.additions[0].id, "common.helloWorld");
    }

    #[tokio::test]
    async fn test_auto_path_namespace() {
        let (mut dictionary, mut tree) = seeded(&[]);
        let config = Config {
            namespace_strategy: NamespaceStrategy::AutoPath,
            ..Default::default()
        };
        let undefined = [entry(
            "Add to cart",
            "/project/src/features/cart/List.tsx",
            "t(\"Add to cart\")",
        )];

        let (outcome, _) = run_fix(&undefined, &mut dictionary, &mut tree, &config).await;
        assert_eq!(outcome.additions[0].id, "features.cart.list.addToCart");
    }

    #[tokio::test]
    async fn test_auto_popular_namespace() {
        let (mut dictionary, mut tree) = seeded(&[
            ("menu.save", "Save"),
            ("menu.open", "Open"),
            ("dialog.close", "Close"),
        ]);
        let config = Config {
            namespace_strategy: NamespaceStrategy::AutoPopular,
            ..Default::default()
        };
        let undefined = [entry("Hello world", "/p/a.ts", "t(\"Hello world\")")];

        let (outcome, _) = run_fix(&undefined, &mut dictionary, &mut tree, &config).await;
        assert_eq!(outcome.additions[0].id, "menu.helloWorld");
    }

    #[tokio::test]
    async fn test_revert_restores_dictionary_and_tree() {
        let (mut dictionary, mut tree) = seeded(&[("keep", "Keep")]);
        let config = Config::default();
        let undefined = [entry("Hello world", "/p/a.ts", "t(\"Hello world\")")];

        let (outcome, _) = run_fix(&undefined, &mut dictionary, &mut tree, &config).await;
        assert!(dictionary.contains("helloWorld"));
        revert(&outcome, &mut dictionary, &mut tree);
        assert!(!dictionary.contains("helloWorld"));
        assert_eq!(tree.resolve("helloWorld"), None);
        assert!(dictionary.contains("keep"));
    }

    struct BrokenTranslator;

    impl Translator for BrokenTranslator {
        fn name(&self) -> &str {
            "broken"
        }

        fn translate<'a>(
            &'a self,
            _source: &'a str,
            _target: &'a str,
            _texts: &'a [String],
        ) -> TranslateFuture<'a> {
            Box::pin(async { anyhow::bail!("down") })
        }
    }

    #[tokio::test]
    async fn test_translator_failure_skips_minting() {
        let mut dictionary = Dictionary::new("zh");
        let mut tree = EntryTree::new();
        dictionary.upsert("existing", "", "zh", "已有".to_string());
        tree.insert(&["existing"]);

        let config = Config {
            reference_lang: "zh".to_string(),
            ..Default::default()
        };
        let broken = BrokenTranslator;
        let backends: [&dyn Translator; 1] = [&broken];
        let ctx = FixContext {
            config: &config,
            source_root: Path::new("/p"),
            backends: &backends,
            batch: BatchOptions {
                delay: std::time::Duration::ZERO,
                ..Default::default()
            },
        };
        let undefined = [entry("新建文件", "/p/a.ts", "t(\"新建文件\")")];

        let (outcome, status) = fix(&undefined, &mut dictionary, &mut tree, &ctx).await;
        assert_eq!(status, FixStatus::TranslatorFailed);
        assert!(outcome.additions.is_empty());
        assert_eq!(outcome.skipped, 1);
        assert!(outcome.patches.is_empty());
    }

    #[tokio::test]
    async fn test_non_english_reference_records_english_value() {
        let mut dictionary = Dictionary::new("zh");
        let mut tree = EntryTree::new();

        struct Phrasebook;
        impl Translator for Phrasebook {
            fn name(&self) -> &str {
                "phrasebook"
            }
            fn translate<'a>(
                &'a self,
                _source: &'a str,
                _target: &'a str,
                texts: &'a [String],
            ) -> TranslateFuture<'a> {
                Box::pin(async move {
                    Ok(texts
                        .iter()
                        .map(|t| {
                            if t == "保存" { "Save".to_string() } else { t.clone() }
                        })
                        .collect())
                })
            }
        }

        let config = Config {
            reference_lang: "zh".to_string(),
            ..Default::default()
        };
        let phrasebook = Phrasebook;
        let backends: [&dyn Translator; 1] = [&phrasebook];
        let ctx = FixContext {
            config: &config,
            source_root: Path::new("/p"),
            backends: &backends,
            batch: BatchOptions {
                delay: std::time::Duration::ZERO,
                ..Default::default()
            },
        };
        let undefined = [entry("保存", "/p/a.ts", "t(\"保存\")")];

        let (outcome, status) = fix(&undefined, &mut dictionary, &mut tree, &ctx).await;
        assert_eq!(status, FixStatus::Clean);
        assert_eq!(outcome.additions[0].id, "save");
        let dict_entry = dictionary.get("save").unwrap();
        assert_eq!(dict_entry.values["zh"], "保存");
        assert_eq!(dict_entry.values["en"], "Save");
    }

    #[tokio::test]
    async fn test_identity_backend_keeps_text() {
        let mut dictionary = Dictionary::new("zh");
        let mut tree = EntryTree::new();
        let config = Config {
            reference_lang: "zh".to_string(),
            ..Default::default()
        };
        let identity = IdentityTranslator;
        let backends: [&dyn Translator; 1] = [&identity];
        let ctx = FixContext {
            config: &config,
            source_root: Path::new("/p"),
            backends: &backends,
            batch: BatchOptions {
                delay: std::time::Duration::ZERO,
                ..Default::default()
            },
        };
        let undefined = [entry("Page Title", "/p/a.ts", "t(\"Page Title\")")];

        let (outcome, status) = fix(&undefined, &mut dictionary, &mut tree, &ctx).await;
        assert_eq!(status, FixStatus::Clean);
        assert_eq!(outcome.additions[0].id, "pageTitle");
        // Identity output equals the source text, so no separate English
        // value is stored.
        assert!(!dictionary.get("pageTitle").unwrap().values.contains_key("en"));
    }
}
