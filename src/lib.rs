//! Lexsync keeps multi-language translation dictionaries synchronized
//! with the call-sites that use them.
//!
//! It scans a source tree for translation calls, reconciles them against
//! on-disk language files, classifies keys as used, unused or undefined,
//! and can mint keys for undefined texts while rewriting both sources and
//! dictionaries in place with their original formatting preserved.
//!
//! ## Module Structure
//!
//! - `cli`: command-line interface layer
//! - `config`: `.lexsyncrc.json` loading and validation
//! - `scanner`: call-site extraction from source text
//! - `keytree`: the dotted-key tree and its resolver
//! - `dictionary`: language file loading and the in-memory dictionary
//! - `census`: usage reconciliation
//! - `fix`: key minting and source patching
//! - `writer`: format-preserving file output
//! - `translator`: batched machine translation plumbing
//! - `session`: run state, busy guard and cancellation
//! - `report`: human-readable output

pub mod census;
pub mod cli;
pub mod config;
pub mod dictionary;
pub mod fix;
pub mod keytree;
pub mod report;
pub mod scanner;
pub mod session;
pub mod translator;
pub mod utils;
pub mod writer;
