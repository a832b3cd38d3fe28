use std::io;

use anyhow::Result;

use crate::command_flows::{
    format_version_line, inspect_target, install_targets, uninstall_targets, VersionInfo,
};
use crate::completion::write_completions_script;
use crate::core_flows::{load_targets, resolve_descriptors, select_target_source, Operation};
use crate::render::Console;
use crate::{Cli, Commands};

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Install {
            source,
            include_arg0,
            args,
        } => {
            let operation = Operation::Install { include_arg0 };
            let target_source = select_target_source(
                !args.is_empty(),
                source.json.as_deref(),
                source.config.as_deref(),
            )?;
            let targets = load_targets(target_source, &args, operation)?;
            let descriptors = resolve_descriptors(&targets, operation)?;
            install_targets(
                &descriptors,
                impostor_installer::install,
                &mut Console::terminal(),
            )?;
        }
        Commands::Uninstall { source, target } => {
            let args = target.into_iter().collect::<Vec<_>>();
            let target_source = select_target_source(
                !args.is_empty(),
                source.json.as_deref(),
                source.config.as_deref(),
            )?;
            let targets = load_targets(target_source, &args, Operation::Uninstall)?;
            let descriptors = resolve_descriptors(&targets, Operation::Uninstall)?;
            uninstall_targets(
                &descriptors,
                |command| impostor_installer::uninstall(command),
                &mut Console::terminal(),
            )?;
        }
        Commands::Inspect { target } => {
            inspect_target(&target, &mut Console::terminal())?;
        }
        Commands::Version => {
            println!("{}", format_version_line(VersionInfo::current()));
        }
        Commands::Completions { shell } => {
            write_completions_script(shell, &mut io::stdout())?;
        }
    }

    Ok(())
}
