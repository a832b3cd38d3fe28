use std::env;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::AtomicBool;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod command_flows;
mod completion;
mod core_flows;
mod dispatch;
mod render;

use completion::CliCompletionShell;
use dispatch::run_cli;
use render::{current_output_style, render_error_line};

const LOG_ENV: &str = "IMPOSTORCMD_LOG";

#[derive(Parser, Debug)]
#[command(name = "impostorcmd", version)]
#[command(
    about = "Impostor any command",
    long_about = "Impostorcmd allows impostoring any command."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// JSON setup description for a single target
    #[arg(long)]
    json: Option<String>,
    /// JSON configuration file containing setup description
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Set up impostoring scheme
    #[command(
        override_usage = "impostorcmd install [OPTIONS] <TARGET_COMMAND> <IMPOSTOR_COMMAND> [ARGUMENT]..."
    )]
    Install {
        #[command(flatten)]
        source: SourceArgs,
        /// Include argument #0 from original command when invoking impostor command
        #[arg(long = "include-arg-0")]
        include_arg0: bool,
        #[arg(
            value_name = "ARGS",
            trailing_var_arg = true,
            allow_hyphen_values = true
        )]
        args: Vec<String>,
    },
    /// Undo impostoring scheme
    Uninstall {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(value_name = "TARGET_COMMAND")]
        target: Option<String>,
    },
    /// Show the impostor descriptor embedded in a command, if any
    Inspect {
        #[arg(value_name = "TARGET_COMMAND")]
        target: String,
    },
    /// Show version information
    Version,
    /// Print a shell completion script
    Completions { shell: CliCompletionShell },
}

fn main() {
    init_logging();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}", render_error_line(current_output_style(), &err));
            1
        }
    };
    process::exit(code);
}

fn run() -> Result<i32> {
    if let Some(descriptor) = impostor_runtime::is_self_impostor()? {
        tracing::debug!(
            original = %descriptor.original_command.display(),
            impostor = %descriptor.impostor_command,
            "running as impostor"
        );
        let args = env::args_os().collect::<Vec<OsString>>();
        return impostor_runtime::dispatch(&descriptor, &args, &AtomicBool::new(false));
    }

    run_cli(Cli::parse())?;
    Ok(0)
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    // A subscriber may already be set when embedded in tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}
