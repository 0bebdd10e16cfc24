//! CLI for the workforce turnover metrics library.
//!
//! Reads a roster file, runs the metrics pipeline for a reference date and
//! prints tables or JSON.

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use clap::Parser;

mod cli;
mod commands;
mod input;
mod logging;

use crate::cli::{Cli, LogFormatArg};
use crate::logging::{LogConfig, LogFormat, init_logging};

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(error) = init_logging(&log_config_from_cli(&cli)) {
        eprintln!("error: failed to initialize logging: {error}");
        return ExitCode::FAILURE;
    }

    match commands::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    LogConfig::from_verbosity(cli.verbose)
        .with_format(format)
        .with_ansi(io::stderr().is_terminal())
}
