use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Ok, Result};
use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::utils::KeyStyle;

pub const CONFIG_FILE_NAME: &str = ".lexsyncrc.json";

pub const SOURCE_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "vue", "mjs", "cjs"];

pub const TEST_FILE_PATTERNS: &[&str] = &[
    "**/*.test.tsx",
    "**/*.test.ts",
    "**/*.test.jsx",
    "**/*.test.js",
    "**/*.spec.tsx",
    "**/*.spec.ts",
    "**/*.spec.jsx",
    "**/*.spec.js",
    "**/__tests__/**",
];

/// How minted key ids get a namespace prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum NamespaceStrategy {
    /// No prefix; the derived id is the whole key.
    #[default]
    None,
    /// Always prefix with `namespace` from the config.
    Fixed,
    /// Prefix from the source file's relative path, stop words removed.
    AutoPath,
    /// Prefix with the most populous namespace among keys in the same
    /// file scope.
    AutoPopular,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub ignores: Vec<String>,
    #[serde(default = "default_includes")]
    pub includes: Vec<String>,
    #[serde(default = "default_function_names")]
    pub function_names: Vec<String>,
    #[serde(default = "default_locales_root", alias = "localesDir")]
    pub locales_root: String,
    #[serde(default = "default_reference_lang")]
    pub reference_lang: String,
    #[serde(default = "default_source_root")]
    pub source_root: String,
    #[serde(default = "default_ignore_test_files")]
    pub ignore_test_files: bool,
    /// Keys treated as used even when no call-site refers to them.
    #[serde(default)]
    pub used_keys: Vec<String>,
    /// Reuse an existing key when a call-site's text equals its
    /// reference-language value.
    #[serde(default = "default_match_existing_key")]
    pub match_existing_key: bool,
    #[serde(default)]
    pub key_style: KeyStyle,
    #[serde(default)]
    pub namespace_strategy: NamespaceStrategy,
    /// Fixed namespace prefix, used when `namespaceStrategy` is `fixed`.
    #[serde(default)]
    pub namespace: String,
    #[serde(default = "default_write_order")]
    pub write_order: WriteOrder,
}

/// Key order when a language file is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum WriteOrder {
    /// Keep the order the file already had; new keys append.
    #[default]
    Original,
    Alphabetical,
    /// Order by each key's last seen census position.
    Usage,
}

fn default_includes() -> Vec<String> {
    vec!["src".to_string()]
}

fn default_function_names() -> Vec<String> {
    vec!["t".to_string(), "$t".to_string(), "i18n.t".to_string()]
}

fn default_locales_root() -> String {
    "./locales".to_string()
}

fn default_source_root() -> String {
    "./".to_string()
}

fn default_reference_lang() -> String {
    "en".to_string()
}

fn default_ignore_test_files() -> bool {
    true
}

fn default_match_existing_key() -> bool {
    true
}

fn default_write_order() -> WriteOrder {
    WriteOrder::Original
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ignores: Vec::new(),
            includes: default_includes(),
            function_names: default_function_names(),
            locales_root: default_locales_root(),
            reference_lang: default_reference_lang(),
            source_root: default_source_root(),
            ignore_test_files: default_ignore_test_files(),
            used_keys: Vec::new(),
            match_existing_key: default_match_existing_key(),
            key_style: KeyStyle::default(),
            namespace_strategy: NamespaceStrategy::default(),
            namespace: String::new(),
            write_order: default_write_order(),
        }
    }
}

impl Config {
    /// Validate configuration values.
    ///
    /// Returns an error if any glob patterns in `ignores`, `includes` or
    /// `usedKeys` are invalid, or if the fixed strategy lacks a namespace.
    pub fn validate(&self) -> Result<()> {
        for pattern in &self.ignores {
            Pattern::new(pattern)
                .with_context(|| format!("Invalid glob pattern in 'ignores': \"{}\"", pattern))?;
        }

        // Include patterns without wildcards are literal directory paths,
        // so bracketed route segments like [locale] stay valid unescaped.
        for pattern in &self.includes {
            if pattern.contains('*') || pattern.contains('?') {
                Pattern::new(pattern).with_context(|| {
                    format!("Invalid glob pattern in 'includes': \"{}\"", pattern)
                })?;
            }
        }

        for pattern in &self.used_keys {
            if pattern.contains('*') || pattern.contains('?') {
                Pattern::new(pattern).with_context(|| {
                    format!("Invalid glob pattern in 'usedKeys': \"{}\"", pattern)
                })?;
            }
        }

        if self.namespace_strategy == NamespaceStrategy::Fixed && self.namespace.is_empty() {
            anyhow::bail!("'namespace' must be set when 'namespaceStrategy' is \"fixed\"");
        }

        if self.function_names.is_empty() {
            anyhow::bail!("'functionNames' must not be empty");
        }

        Ok(())
    }

    /// Whether a dictionary key is force-included by the `usedKeys` list.
    pub fn is_forced_used(&self, key: &str) -> bool {
        self.used_keys.iter().any(|p| {
            if p.contains('*') || p.contains('?') {
                Pattern::new(p).is_ok_and(|pat| pat.matches(key))
            } else {
                p == key
            }
        })
    }
}

pub fn default_config_json() -> Result<String> {
    let config = Config::default();
    serde_json::to_string_pretty(&config).context("Failed to generate default config.")
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }
        if current.join(".git").exists() {
            return None;
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Result of loading configuration.
pub struct ConfigLoadResult {
    pub config: Config,
    /// True if config was loaded from a file, false if using defaults.
    pub from_file: bool,
}

pub fn load_config(start_dir: &Path) -> Result<ConfigLoadResult> {
    match find_config_file(start_dir) {
        Some(path) => {
            let content = fs::read_to_string(&path)?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            config.validate()?;
            Ok(ConfigLoadResult {
                config,
                from_file: true,
            })
        }
        None => Ok(ConfigLoadResult {
            config: Config::default(),
            from_file: false,
        }),
    }
}
