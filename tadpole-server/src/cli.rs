//! Command-line entry point. `clap`'s built-in `-h`/`-V` handling prints
//! and exits before we can choose an exit code, so both flags are turned
//! off here and handled by hand to match the original binary's exit
//! codes exactly: 0 for `--version`, 1 for `--help` or any parse error.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

const VERSION: &str = "1.0.0";

const USAGE: &str = "Usage: ./tadpole [-c /path/to/server.conf]\n       ./tadpole -v or --version\n       ./tadpole -h or --help\n";

#[derive(Parser, Debug)]
#[command(disable_help_flag = true, disable_version_flag = true)]
struct RawArgs {
    #[arg(short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(short = 'v', long = "version")]
    version: bool,

    #[arg(short = 'h', long = "help")]
    help: bool,
}

/// The outcome of parsing argv: either a config file to run with, or a
/// request to print something and stop.
pub enum Invocation {
    Run { config: PathBuf },
    ExitWith(ExitCode),
}

/// Parses `args` (normally `std::env::args()`). Prints usage/version text
/// itself since clap's defaults would exit with the wrong code.
pub fn parse<I, T>(args: I) -> Invocation
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let parsed = match RawArgs::try_parse_from(args) {
        Ok(p) => p,
        Err(_) => {
            eprint!("{USAGE}");
            return Invocation::ExitWith(ExitCode::FAILURE);
        }
    };

    if parsed.version {
        println!("tadpole version={VERSION}");
        return Invocation::ExitWith(ExitCode::SUCCESS);
    }
    if parsed.help {
        eprint!("{USAGE}");
        return Invocation::ExitWith(ExitCode::FAILURE);
    }

    match parsed.config {
        Some(config) => Invocation::Run { config },
        None => {
            eprint!("{USAGE}");
            Invocation::ExitWith(ExitCode::FAILURE)
        }
    }
}
