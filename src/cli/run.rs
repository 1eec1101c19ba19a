//! Command dispatch: load configuration, open a session and run the
//! requested phase.

use std::fs;

use anyhow::{Context, Result, bail};
use colored::Colorize;

use super::{
    args::{Arguments, CensusCommand, Command, CommonArgs, FixCommand},
    exit_status::ExitStatus,
};
use crate::{
    config::{CONFIG_FILE_NAME, Config, default_config_json, load_config},
    report,
    session::{ResultCode, Session},
    translator::{IdentityTranslator, Translator},
};

pub fn run(Arguments { command }: Arguments) -> Result<ExitStatus> {
    match command {
        Some(Command::Census(cmd)) => census(cmd),
        Some(Command::Fix(cmd)) => fix(cmd),
        Some(Command::Init) => init(),
        None => bail!("No command provided. Use --help to see available commands."),
    }
}

fn init() -> Result<ExitStatus> {
    let config_path = std::path::Path::new(CONFIG_FILE_NAME);
    if config_path.exists() {
        bail!("{} already exists", CONFIG_FILE_NAME);
    }
    fs::write(config_path, default_config_json()?)?;
    println!("{} Wrote {}", report::SUCCESS_MARK.green(), CONFIG_FILE_NAME);
    Ok(ExitStatus::Success)
}

/// Config from disk with command-line overrides applied.
fn resolve_config(common: &CommonArgs) -> Result<Config> {
    let mut config = load_config(&common.root)?.config;
    if let Some(lang) = &common.reference_lang {
        config.reference_lang = lang.clone();
    }
    if let Some(root) = &common.locales_root {
        config.locales_root = root.to_string_lossy().into_owned();
    }
    if let Some(root) = &common.source_root {
        config.source_root = root.to_string_lossy().into_owned();
    }
    config.validate()?;
    Ok(config)
}

fn census(cmd: CensusCommand) -> Result<ExitStatus> {
    let verbose = cmd.common.verbose;
    let config = resolve_config(&cmd.common)?;
    let mut session = Session::open(&cmd.common.root, config)?;
    report::print_load_warnings(&session.load_warnings, verbose);

    let result = session.run_census(verbose);
    if !result.success {
        bail!("{}", result.message);
    }
    let census_report = session
        .report
        .as_ref()
        .context("Census finished without a report")?;
    report::print_census(census_report);
    Ok(if census_report.has_findings() {
        ExitStatus::Failure
    } else {
        ExitStatus::Success
    })
}

fn fix(cmd: FixCommand) -> Result<ExitStatus> {
    let verbose = cmd.common.verbose;
    let mut config = resolve_config(&cmd.common)?;
    if let Some(style) = cmd.key_style {
        config.key_style = style;
    }
    if let Some(strategy) = cmd.namespace_strategy {
        config.namespace_strategy = strategy;
    }
    if let Some(order) = cmd.write_order {
        config.write_order = order;
    }
    config.validate()?;

    let mut session = Session::open(&cmd.common.root, config)?;
    report::print_load_warnings(&session.load_warnings, verbose);

    let identity = IdentityTranslator;
    let backends: [&dyn Translator; 1] = [&identity];
    let result = session.run_fix(&backends, cmd.apply, verbose);

    if result.success {
        println!("{} {}", report::SUCCESS_MARK.green(), result.message);
        Ok(ExitStatus::Success)
    } else {
        println!("{} {}", report::FAILURE_MARK.red(), result.message);
        Ok(match result.code {
            ResultCode::UnknownError => ExitStatus::Error,
            _ => ExitStatus::Failure,
        })
    }
}
