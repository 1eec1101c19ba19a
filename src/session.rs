//! Session handle: owns the loaded state for one project and guards the
//! pipeline phases.
//!
//! Calls are not queued. A second invocation while one is in flight gets
//! a `StillProcessing` result immediately. Cancellation is polled between
//! coarse phases only; staged dictionary mutations are reverted when it
//! fires.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use anyhow::{Context, Result};

use crate::{
    census::{self, CensusReport, Occurrence, UndefinedEntry},
    config::Config,
    dictionary::{self, Dictionary, LocaleFiles},
    fix::{self, FixContext, FixStatus},
    keytree::EntryTree,
    translator::{BatchOptions, Translator},
    writer,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Ok,
    /// Another invocation is already running on this session.
    StillProcessing,
    /// The reference language has no values; fixing cannot proceed.
    NoReferredLang,
    TranslatorFailed,
    TranslatorPartialFailed,
    Cancelled,
    UnknownError,
}

#[derive(Debug)]
pub struct RunResult {
    pub success: bool,
    pub message: String,
    pub code: ResultCode,
}

impl RunResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            code: ResultCode::Ok,
        }
    }

    fn fail(code: ResultCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            code,
        }
    }
}

/// Cooperative cancellation flag, cloneable across threads.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Read-only view handed to reporting after a phase completes.
pub struct Snapshot<'a> {
    pub dictionary: &'a Dictionary,
    pub tree: &'a EntryTree,
    pub used: &'a BTreeMap<String, Vec<Occurrence>>,
    pub unused: &'a [String],
    pub undefined: &'a [UndefinedEntry],
    pub lack: &'a BTreeMap<String, Vec<String>>,
    pub extra: &'a BTreeMap<String, Vec<String>>,
}

pub struct Session {
    pub root: PathBuf,
    pub config: Config,
    pub dictionary: Dictionary,
    pub tree: EntryTree,
    pub files: LocaleFiles,
    pub report: Option<CensusReport>,
    pub load_warnings: Vec<String>,
    busy: AtomicBool,
    cancel: CancelToken,
}

impl Session {
    /// Load the dictionaries for a project rooted at `root`.
    pub fn open(root: &Path, config: Config) -> Result<Session> {
        let locales_root = root.join(&config.locales_root);
        let loaded = dictionary::load(&locales_root, &config.reference_lang)
            .with_context(|| format!("Failed to load locales: {}", locales_root.display()))?;
        Ok(Session {
            root: root.to_path_buf(),
            config,
            dictionary: loaded.dictionary,
            tree: loaded.tree,
            files: loaded.files,
            report: None,
            load_warnings: loaded.warnings,
            busy: AtomicBool::new(false),
            cancel: CancelToken::default(),
        })
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn snapshot(&self) -> Option<Snapshot<'_>> {
        let report = self.report.as_ref()?;
        Some(Snapshot {
            dictionary: &self.dictionary,
            tree: &self.tree,
            used: &report.used,
            unused: &report.unused,
            undefined: &report.undefined,
            lack: &report.lack,
            extra: &report.extra,
        })
    }

    fn try_begin(&self) -> bool {
        !self.busy.swap(true, Ordering::SeqCst)
    }

    fn end(&self) {
        self.busy.store(false, Ordering::SeqCst);
    }

    /// Run the census phase and keep its report on the session.
    pub fn run_census(&mut self, verbose: bool) -> RunResult {
        if !self.try_begin() {
            return RunResult::fail(ResultCode::StillProcessing, "A run is already in progress.");
        }
        let result = self.census_inner(verbose);
        self.end();
        match result {
            Ok(result) => result,
            Err(e) => RunResult::fail(ResultCode::UnknownError, format!("{:#}", e)),
        }
    }

    fn census_inner(&mut self, verbose: bool) -> Result<RunResult> {
        let report = census::census(
            &self.root,
            &self.config,
            &self.dictionary,
            &self.tree,
            verbose,
        )?;
        let message = format!(
            "{} used, {} unused, {} undefined across {} files",
            report.used.len(),
            report.unused.len(),
            report.undefined.len(),
            report.scanned_files
        );
        self.report = Some(report);
        Ok(RunResult::ok(message))
    }

    /// Census, mint keys for undefined call-sites, then write dictionary
    /// and source changes when `apply` is set.
    pub fn run_fix(
        &mut self,
        backends: &[&dyn Translator],
        apply: bool,
        verbose: bool,
    ) -> RunResult {
        if !self.try_begin() {
            return RunResult::fail(ResultCode::StillProcessing, "A run is already in progress.");
        }
        let result = self.fix_inner(backends, apply, verbose);
        self.end();
        match result {
            Ok(result) => result,
            Err(e) => RunResult::fail(ResultCode::UnknownError, format!("{:#}", e)),
        }
    }

    fn fix_inner(
        &mut self,
        backends: &[&dyn Translator],
        apply: bool,
        verbose: bool,
    ) -> Result<RunResult> {
        if !self.dictionary.is_empty() && !self.dictionary.has_reference_lang() {
            return Ok(RunResult::fail(
                ResultCode::NoReferredLang,
                format!(
                    "No values found for reference language '{}'.",
                    self.config.reference_lang
                ),
            ));
        }

        let report = census::census(
            &self.root,
            &self.config,
            &self.dictionary,
            &self.tree,
            verbose,
        )?;
        if self.cancel.is_cancelled() {
            self.report = Some(report);
            return Ok(RunResult::fail(ResultCode::Cancelled, "Cancelled."));
        }

        let source_root = self.root.join(&self.config.source_root);
        let ctx = FixContext {
            config: &self.config,
            source_root: &source_root,
            batch: BatchOptions::default(),
            backends,
        };
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .context("Failed to start async runtime")?;
        let (outcome, status) = runtime.block_on(fix::fix(
            &report.undefined,
            &mut self.dictionary,
            &mut self.tree,
            &ctx,
        ));

        if self.cancel.is_cancelled() {
            fix::revert(&outcome, &mut self.dictionary, &mut self.tree);
            self.report = Some(report);
            return Ok(RunResult::fail(ResultCode::Cancelled, "Cancelled."));
        }

        let mut message = format!(
            "{} keys minted, {} reused, {} call-sites patched",
            outcome.additions.len(),
            outcome.reused,
            outcome.patch_count()
        );
        if outcome.skipped > 0 {
            message.push_str(&format!(", {} skipped", outcome.skipped));
        }

        if apply {
            let locales_root = self.root.join(&self.config.locales_root);
            let patch_report = writer::patch_sources(&outcome.patches);
            let write_report = writer::write_language_files(
                &locales_root,
                &self.dictionary,
                &self.tree,
                &self.files,
                self.config.write_order,
                &report.last_seen,
            );
            for failure in patch_report.failures.iter().chain(&write_report.failures) {
                eprintln!("warning: {}", failure);
            }
            message.push_str(&format!(
                "; wrote {} files",
                patch_report.written.len() + write_report.written.len()
            ));
        } else {
            message.push_str(" (dry run, use --apply to write)");
        }

        self.report = Some(report);

        Ok(match status {
            FixStatus::Clean => RunResult::ok(message),
            FixStatus::TranslatorFailed => RunResult::fail(
                ResultCode::TranslatorFailed,
                format!("{}; translation failed for all batches", message),
            ),
            FixStatus::TranslatorPartialFailed => RunResult::fail(
                ResultCode::TranslatorPartialFailed,
                format!("{}; translation failed for some batches", message),
            ),
        })
    }
}
