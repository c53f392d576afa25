//! CLI entry point for tele-dl.

use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error};

mod app;
mod cli;
#[cfg(test)]
mod test_support;

use cli::Args;

/// How the process ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Nothing failed.
    Success,
    /// Some downloads failed, some did not.
    Partial,
    /// Every download failed, a fatal error occurred, or the run was interrupted.
    Failure,
}

impl ProcessExit {
    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Partial => 2,
        }
    }
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        ExitCode::from(exit.code())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    app::terminal::init_tracing(args.default_log_level());
    debug!(?args, "CLI arguments parsed");

    match app::runtime::run_downloader(args).await {
        Ok(exit) => exit.into(),
        Err(e) => {
            error!(error = %format!("{e:#}"), "run failed");
            eprintln!("Error: {e:#}");
            ProcessExit::Failure.into()
        }
    }
}
