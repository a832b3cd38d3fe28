use std::env;
use std::fs::{self, File};
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use impostor_core::{append_descriptor, read_descriptor_file, DescriptorError, TargetDescriptor};

use crate::fs_utils::{create_new_with_undo, random_sibling_path, rename_with_undo, replicate_owner};
use crate::{ActionError, Compensation, InstallStatus};

pub fn install(target: &TargetDescriptor) -> Result<InstallStatus, ActionError> {
    let image = env::current_exe().context("failed to locate the impostorcmd executable")?;
    install_from_image(target, &image)
}

/// Installs `image` over `target.original_command`.
///
/// The target must be readable by the caller. The impostor inherits the
/// target's permissions and has to read its own trailer when it runs, so an
/// execute-only target is refused before anything is moved.
pub fn install_from_image(
    target: &TargetDescriptor,
    image: &Path,
) -> Result<InstallStatus, ActionError> {
    let mut descriptor = target.clone();
    descriptor
        .validate()
        .context("refusing to install an invalid target descriptor")?;
    let command = descriptor.original_command.clone();

    match read_descriptor_file(&command) {
        Ok(existing) => {
            tracing::debug!(command = %command.display(), "target is already an impostor");
            return Ok(InstallStatus::AlreadyImpostor {
                descriptor: existing,
            });
        }
        Err(err) if err.is_no_descriptor() => {}
        Err(DescriptorError::Io(err)) if err.kind() == io::ErrorKind::PermissionDenied => {
            return Err(anyhow::Error::new(err)
                .context(format!(
                    "target command {} must be readable to be impostored",
                    command.display()
                ))
                .into());
        }
        Err(err) => {
            return Err(anyhow::Error::new(err)
                .context(format!("failed to inspect target command {}", command.display()))
                .into());
        }
    }

    let mut undo = Compensation::none();
    match apply_install(&mut descriptor, &command, image, &mut undo) {
        Ok(()) => Ok(InstallStatus::Installed { descriptor, undo }),
        Err(error) => Err(ActionError::rolled_back(error, undo)),
    }
}

fn apply_install(
    descriptor: &mut TargetDescriptor,
    command: &Path,
    image: &Path,
    undo: &mut Compensation,
) -> Result<()> {
    let moved = random_sibling_path(command).with_context(|| {
        format!(
            "failed to choose a new location for original command {}",
            command.display()
        )
    })?;
    descriptor.original_command = moved.clone();

    let step = rename_with_undo(command, &moved).context("failed moving original command")?;
    register(undo, step);

    let reference = fs::metadata(&moved)
        .with_context(|| format!("failed to inspect original command {}", moved.display()))?;
    let mut source = File::open(image)
        .with_context(|| format!("failed to open impostor image {}", image.display()))?;

    let (mut file, step) = create_new_with_undo(command, &reference.permissions())
        .context("failed creating impostor command")?;
    register(undo, step);

    write_impostor(&mut source, &mut file, descriptor)
        .with_context(|| format!("failed writing impostor command {}", command.display()))?;

    let owner_copied = replicate_owner(&file, &reference).with_context(|| {
        format!(
            "failed to copy owner of {} to {}",
            moved.display(),
            command.display()
        )
    })?;
    file.set_permissions(reference.permissions())
        .with_context(|| format!("failed to set permissions of {}", command.display()))?;

    tracing::debug!(
        command = %command.display(),
        original = %moved.display(),
        owner_copied,
        "installed impostor"
    );
    Ok(())
}

fn write_impostor(source: &mut File, file: &mut File, descriptor: &TargetDescriptor) -> Result<()> {
    io::copy(source, file).context("failed to copy impostor image")?;
    append_descriptor(file, descriptor).context("failed to append impostor descriptor")?;
    file.sync_all().context("failed to flush impostor command")?;
    Ok(())
}

fn register(undo: &mut Compensation, step: Compensation) {
    *undo = std::mem::take(undo).with(step);
}
