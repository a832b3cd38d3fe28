use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use impostor_core::{lookup, TargetDescriptor, CONFIGURATION_VERSION};
use impostor_installer::{ActionError, Compensation, InstallStatus, UninstallStatus};
use impostor_runtime::descriptor_of;

use crate::render::{Console, Status};

pub(crate) fn install_targets<O, E, F>(
    descriptors: &[TargetDescriptor],
    mut install: F,
    console: &mut Console<O, E>,
) -> Result<()>
where
    O: Write,
    E: Write,
    F: FnMut(&TargetDescriptor) -> Result<InstallStatus, ActionError>,
{
    let mut installed: Vec<(PathBuf, Compensation)> = Vec::new();

    for descriptor in descriptors {
        let command = &descriptor.original_command;
        match install(descriptor) {
            Ok(InstallStatus::Installed { undo, .. }) => {
                console.status(
                    Status::Ok,
                    &format!("Installed impostor for target {}", command.display()),
                )?;
                installed.push((command.clone(), undo));
            }
            Ok(InstallStatus::AlreadyImpostor { .. }) => {
                console.status(
                    Status::Skipped,
                    &format!("Skipping already impostored target {}", command.display()),
                )?;
            }
            Err(err) => {
                console.error(
                    &anyhow::Error::new(err)
                        .context(format!("installing target {} failed", command.display())),
                )?;
                for (done, undo) in installed.into_iter().rev() {
                    report_undo(&done, undo, console)?;
                }
                bail!(
                    "failure occurred while attempting to impostor target {}",
                    command.display()
                );
            }
        }
    }
    Ok(())
}

pub(crate) fn uninstall_targets<O, E, F>(
    descriptors: &[TargetDescriptor],
    mut uninstall: F,
    console: &mut Console<O, E>,
) -> Result<()>
where
    O: Write,
    E: Write,
    F: FnMut(&Path) -> Result<UninstallStatus, ActionError>,
{
    for descriptor in descriptors {
        let command = &descriptor.original_command;
        match uninstall(command) {
            Ok(UninstallStatus::Uninstalled { .. }) => {
                console.status(
                    Status::Ok,
                    &format!("Uninstalled impostor for target {}", command.display()),
                )?;
            }
            Ok(UninstallStatus::NotImpostor { .. }) => {
                console.status(
                    Status::Skipped,
                    &format!("Skipping non impostor target {}", command.display()),
                )?;
            }
            Err(mut err) => {
                let pending = err.take_pending();
                console.error(
                    &anyhow::Error::new(err)
                        .context(format!("uninstalling target {} failed", command.display())),
                )?;
                if !pending.is_empty() {
                    report_undo(command, pending, console)?;
                }
                bail!(
                    "failure occurred while attempting to uninstall impostor in target {}",
                    command.display()
                );
            }
        }
    }
    Ok(())
}

fn report_undo<O: Write, E: Write>(
    command: &Path,
    undo: Compensation,
    console: &mut Console<O, E>,
) -> Result<()> {
    match undo.run() {
        Ok(()) => console.status(
            Status::Warn,
            &format!("Undone actions taken for target {}", command.display()),
        )?,
        Err(err) => console.error(&anyhow::Error::new(err).context(format!(
            "undoing actions taken for target {} failed",
            command.display()
        )))?,
    }
    Ok(())
}

pub(crate) fn inspect_target<O: Write, E: Write>(
    target: &str,
    console: &mut Console<O, E>,
) -> Result<()> {
    let command = lookup(target).with_context(|| format!("failed to find command {target}"))?;
    match descriptor_of(&command)? {
        Some(descriptor) => {
            console.status(
                Status::Ok,
                &format!("{} is an impostor", command.display()),
            )?;
            for line in format_descriptor_lines(&descriptor) {
                console.line(&line)?;
            }
        }
        None => {
            console.status(
                Status::Skipped,
                &format!("{} is not an impostor", command.display()),
            )?;
        }
    }
    Ok(())
}

fn format_descriptor_lines(descriptor: &TargetDescriptor) -> Vec<String> {
    vec![
        format!("version: {}", descriptor.version),
        format!("original command: {}", descriptor.original_command.display()),
        format!("impostor command: {}", descriptor.impostor_command),
        format!("impostor args: {:?}", descriptor.impostor_args),
        format!("include arg 0: {}", descriptor.include_arg_zero),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct VersionInfo {
    pub(crate) application: &'static str,
    pub(crate) commit: &'static str,
    pub(crate) configuration: &'static str,
}

impl VersionInfo {
    pub(crate) fn current() -> Self {
        Self {
            application: env!("CARGO_PKG_VERSION"),
            commit: option_env!("IMPOSTORCMD_COMMIT").unwrap_or("?"),
            configuration: CONFIGURATION_VERSION,
        }
    }
}

pub(crate) fn format_version_line(info: VersionInfo) -> String {
    format!(
        "application: {}, commit: {}, configuration: {}",
        info.application, info.commit, info.configuration
    )
}
