#![deny(clippy::all, clippy::pedantic)]

use crate::{
    cli::Cli,
    launcher::{Invocation, LaunchRequest, ProcessElevator, Verb},
    resolver::FsPathResolver,
};
use clap::Parser;
use std::process::ExitCode;

mod cli;
mod error;
mod launcher;
mod logging;
mod resolver;

#[cfg(not(windows))]
mod unsupported;
#[cfg(windows)]
mod windows;

#[cfg(not(windows))]
use crate::unsupported as platform;
#[cfg(windows)]
use crate::windows as platform;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let normalization = cli.normalization();
    let invocation = Invocation::from_tokens(cli.command)?;
    tracing::debug!(?invocation, ?normalization, "parsed invocation");

    let verb = Verb::select(cli.if_needed, platform::is_elevated);
    tracing::debug!(verb = verb.as_str(), "selected shell verb");

    let request = LaunchRequest::build(&invocation, normalization, verb, &FsPathResolver)?;

    if cli.dry_run {
        println!("{request}");
        return Ok(());
    }

    tracing::info!(%request, verb = verb.as_str(), "requesting launch");
    platform::ShellElevator.launch(&request)
}
