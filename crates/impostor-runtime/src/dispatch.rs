use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{bail, Context, Result};
use impostor_core::{lookup, read_descriptor_file, TargetDescriptor};
use tokio::process::Command;

use crate::signals::SignalRelay;

pub const ORIGINAL_COMMAND_ENV: &str = "IMPOSTORCMD_ORIGINAL_COMMAND";

pub fn is_self_impostor() -> Result<Option<TargetDescriptor>> {
    let exe = env::current_exe().context("failed to locate the running executable")?;
    descriptor_of(&exe)
}

pub fn descriptor_of(path: &Path) -> Result<Option<TargetDescriptor>> {
    match read_descriptor_file(path) {
        Ok(descriptor) => Ok(Some(descriptor)),
        Err(err) if err.is_no_descriptor() => Ok(None),
        Err(err) => Err(anyhow::Error::new(err)
            .context(format!("failed to read impostor descriptor of {}", path.display()))),
    }
}

pub fn impostor_args(descriptor: &TargetDescriptor, args: &[OsString]) -> Vec<OsString> {
    let forwarded = if descriptor.include_arg_zero {
        args
    } else {
        args.get(1..).unwrap_or_default()
    };

    descriptor
        .impostor_args
        .iter()
        .map(OsString::from)
        .chain(forwarded.iter().cloned())
        .collect()
}

/// Runs the impostor command in place of the original and returns the exit
/// code this process should end with.
///
/// `cancel` is only consulted before launching; once the child runs it is
/// awaited to completion.
pub fn dispatch(descriptor: &TargetDescriptor, args: &[OsString], cancel: &AtomicBool) -> Result<i32> {
    let program = lookup(&descriptor.impostor_command).with_context(|| {
        format!(
            "failed to find impostor command {}",
            descriptor.impostor_command
        )
    })?;
    let outgoing = impostor_args(descriptor, args);

    if cancel.load(Ordering::SeqCst) {
        bail!(
            "dispatch cancelled before launching impostor command {}",
            program.display()
        );
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start dispatcher runtime")?;
    runtime.block_on(run_impostor(
        program,
        outgoing,
        descriptor.original_command.clone(),
    ))
}

async fn run_impostor(program: PathBuf, args: Vec<OsString>, original: PathBuf) -> Result<i32> {
    tracing::debug!(
        program = %program.display(),
        original = %original.display(),
        args = args.len(),
        "launching impostor command"
    );
    let mut child = Command::new(&program)
        .args(&args)
        .env(ORIGINAL_COMMAND_ENV, &original)
        .spawn()
        .with_context(|| format!("failed to start impostor command {}", program.display()))?;

    let relay = match SignalRelay::start(child.id()) {
        Ok(relay) => relay,
        Err(err) => {
            if let Err(kill_err) = child.kill().await {
                tracing::warn!(error = %kill_err, "failed to stop impostor command");
            }
            return Err(err.context("failed to relay signals to impostor command"));
        }
    };

    let status = child.wait().await;
    relay.stop().await;
    let status = status
        .with_context(|| format!("failed waiting for impostor command {}", program.display()))?;

    let code = exit_code(status);
    tracing::debug!(program = %program.display(), code, "impostor command finished");
    Ok(code)
}

pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
