use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use impostor_core::{lookup, read_descriptor_file, TargetDescriptor};

use crate::fs_utils::{random_sibling_path, rename_with_undo};
use crate::{ActionError, Compensation, UninstallStatus};

pub fn uninstall(command: impl AsRef<Path>) -> Result<UninstallStatus, ActionError> {
    uninstall_with(command, |path: &Path| fs::remove_file(path))
}

/// Like [`uninstall`], deleting the displaced impostor copy with
/// `remove_spare`. If that fails the original is already back in place and
/// the error carries the pending chain that would reinstate the impostor.
pub fn uninstall_with(
    command: impl AsRef<Path>,
    remove_spare: impl FnOnce(&Path) -> io::Result<()>,
) -> Result<UninstallStatus, ActionError> {
    let command_arg = command.as_ref();
    let command = lookup(command_arg)
        .with_context(|| format!("failed to find command {}", command_arg.display()))?;

    let descriptor = match read_descriptor_file(&command) {
        Ok(descriptor) => descriptor,
        Err(err) if err.is_no_descriptor() => {
            tracing::debug!(command = %command.display(), "not an impostor, nothing to do");
            return Ok(UninstallStatus::NotImpostor { command });
        }
        Err(err) => {
            return Err(anyhow::Error::new(err)
                .context(format!("failed while reading {}", command.display()))
                .into());
        }
    };

    let mut undo = Compensation::none();
    let spare = match restore_original(&command, &descriptor, &mut undo) {
        Ok(spare) => spare,
        Err(error) => return Err(ActionError::rolled_back(error, undo)),
    };

    if let Err(err) = remove_spare(&spare) {
        let error = anyhow::Error::new(err)
            .context(format!("failed removing impostor command {}", spare.display()));
        return Err(ActionError::with_pending(error, undo));
    }

    tracing::debug!(
        command = %command.display(),
        restored_from = %descriptor.original_command.display(),
        "uninstalled impostor"
    );
    Ok(UninstallStatus::Uninstalled {
        command,
        restored_from: descriptor.original_command,
    })
}

fn restore_original(
    command: &Path,
    descriptor: &TargetDescriptor,
    undo: &mut Compensation,
) -> Result<PathBuf> {
    let spare = random_sibling_path(command).with_context(|| {
        format!(
            "failed to choose a temporary location for impostor command {}",
            command.display()
        )
    })?;

    let step = rename_with_undo(command, &spare).context("failed moving impostor command")?;
    *undo = std::mem::take(undo).with(step);

    let step = rename_with_undo(&descriptor.original_command, command)
        .context("failed moving original command")?;
    *undo = std::mem::take(undo).with(step);

    Ok(spare)
}
