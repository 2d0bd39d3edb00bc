use crate::launcher::Normalization;
use clap::{ArgAction, Parser};

#[derive(Debug, Parser)]
#[command(name = "elevate", version, about, long_about = None)]
pub struct Cli {
    /// Forward every argument verbatim, even the path after `-jar`.
    #[arg(long)]
    pub no_normalize: bool,

    /// Print the command line instead of launching it.
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the consent prompt when already running elevated.
    #[arg(long)]
    pub if_needed: bool,

    /// More log output (-v, -vv, -vvv). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Executable to launch, followed by its arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

impl Cli {
    #[must_use]
    pub fn normalization(&self) -> Normalization {
        if self.no_normalize {
            Normalization::Verbatim
        } else {
            Normalization::NetworkPaths
        }
    }
}
