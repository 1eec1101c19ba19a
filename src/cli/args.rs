//! CLI argument definitions using clap.
//!
//! ## Commands
//!
//! - `census`: classify dictionary keys as used/unused/undefined
//! - `fix`: mint keys for undefined call-sites and patch source files
//! - `init`: write a default `.lexsyncrc.json`

use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};

use crate::config::{NamespaceStrategy, WriteOrder};
use crate::utils::KeyStyle;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Arguments {
    /// Check if a command was provided, otherwise print help and return None.
    pub fn with_command_or_help(self) -> Option<Self> {
        if self.command.is_none() {
            Self::command().print_help().ok();
            None
        } else {
            Some(self)
        }
    }

    /// Get the verbose flag from the command's common args.
    pub fn verbose(&self) -> bool {
        match &self.command {
            Some(Command::Census(cmd)) => cmd.common.verbose,
            Some(Command::Fix(cmd)) => cmd.common.verbose,
            Some(Command::Init) | None => false,
        }
    }
}

/// Common arguments shared by all commands.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Project root directory
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Reference language (overrides config file)
    #[arg(long)]
    pub reference_lang: Option<String>,

    /// Locales directory path (overrides config file)
    #[arg(long)]
    pub locales_root: Option<PathBuf>,

    /// Source code root directory (overrides config file)
    #[arg(long)]
    pub source_root: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Args)]
pub struct CensusCommand {
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Debug, Args)]
pub struct FixCommand {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Actually write dictionary and source changes (default is dry-run)
    #[arg(long)]
    pub apply: bool,

    /// Naming style for minted keys (overrides config file)
    #[arg(long, value_enum)]
    pub key_style: Option<KeyStyle>,

    /// Namespace strategy for minted keys (overrides config file)
    #[arg(long, value_enum)]
    pub namespace_strategy: Option<NamespaceStrategy>,

    /// Key order when language files are rewritten (overrides config file)
    #[arg(long, value_enum)]
    pub write_order: Option<WriteOrder>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Reconcile call-sites with the dictionaries and report findings
    Census(CensusCommand),
    /// Mint keys for undefined call-sites and patch dictionaries and sources
    Fix(FixCommand),
    /// Initialize a new .lexsyncrc.json configuration file
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_census_with_overrides() {
        let args = Arguments::parse_from([
            "lexsync",
            "census",
            "--reference-lang",
            "zh",
            "--locales-root",
            "./i18n",
            "-v",
        ]);
        let Some(Command::Census(cmd)) = args.command else {
            panic!("expected census command");
        };
        assert_eq!(cmd.common.reference_lang.as_deref(), Some("zh"));
        assert_eq!(cmd.common.locales_root, Some(PathBuf::from("./i18n")));
        assert!(cmd.common.verbose);
    }

    #[test]
    fn test_parse_fix_flags() {
        let args = Arguments::parse_from([
            "lexsync",
            "fix",
            "--apply",
            "--key-style",
            "snake",
            "--namespace-strategy",
            "auto-path",
        ]);
        let Some(Command::Fix(cmd)) = args.command else {
            panic!("expected fix command");
        };
        assert!(cmd.apply);
        assert_eq!(cmd.key_style, Some(KeyStyle::Snake));
        assert_eq!(cmd.namespace_strategy, Some(NamespaceStrategy::AutoPath));
    }

    #[test]
    fn test_no_command_reports_not_verbose() {
        let args = Arguments::parse_from(["lexsync"]);
        assert!(!args.verbose());
        assert!(args.command.is_none());
    }
}
