use std::ffi::OsString;
use std::fs::{self, File, OpenOptions, Permissions};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::Compensation;

const RANDOM_SUFFIX_BYTES: usize = 16;
const KEPT_EXTENSIONS: [&str; 2] = [".exe", ".bat"];

pub(crate) fn random_sibling_path(path: &Path) -> io::Result<PathBuf> {
    loop {
        let candidate = suffixed_path(path, &random_suffix(), cfg!(windows));
        match fs::symlink_metadata(&candidate) {
            Ok(_) => continue,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(candidate),
            Err(err) => return Err(err),
        }
    }
}

fn random_suffix() -> String {
    let bytes: [u8; RANDOM_SUFFIX_BYTES] = rand::random();
    format!("-{}", hex::encode(bytes))
}

pub(crate) fn suffixed_path(path: &Path, suffix: &str, keep_extension: bool) -> PathBuf {
    if keep_extension {
        if let Some(raw) = path.to_str() {
            for extension in KEPT_EXTENSIONS {
                if let Some(stem) = raw.strip_suffix(extension) {
                    return PathBuf::from(format!("{stem}{suffix}{extension}"));
                }
            }
        }
    }

    let mut raw = OsString::from(path.as_os_str());
    raw.push(suffix);
    PathBuf::from(raw)
}

pub(crate) fn rename_with_undo(from: &Path, to: &Path) -> anyhow::Result<Compensation> {
    fs::rename(from, to)
        .with_context(|| format!("failed to rename {} to {}", from.display(), to.display()))?;
    tracing::debug!(from = %from.display(), to = %to.display(), "renamed");

    let (from, to) = (from.to_path_buf(), to.to_path_buf());
    Ok(Compensation::new(
        format!("rename {} back to {}", to.display(), from.display()),
        move || {
            fs::rename(&to, &from).with_context(|| {
                format!("failed to rename {} to {}", to.display(), from.display())
            })
        },
    ))
}

pub(crate) fn create_new_with_undo(
    path: &Path,
    permissions: &Permissions,
) -> anyhow::Result<(File, Compensation)> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(permissions.mode() & 0o7777);
    }
    #[cfg(not(unix))]
    let _ = permissions;

    let file = options
        .open(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    tracing::debug!(path = %path.display(), "created file");

    let created = path.to_path_buf();
    let undo = Compensation::new(format!("remove {}", created.display()), move || {
        fs::remove_file(&created)
            .with_context(|| format!("failed to remove {}", created.display()))
    });
    Ok((file, undo))
}

#[cfg(unix)]
pub(crate) fn replicate_owner(file: &File, reference: &fs::Metadata) -> io::Result<bool> {
    use std::os::unix::fs::{fchown, MetadataExt};

    fchown(file, Some(reference.uid()), Some(reference.gid()))?;
    Ok(true)
}

#[cfg(not(unix))]
pub(crate) fn replicate_owner(_file: &File, _reference: &fs::Metadata) -> io::Result<bool> {
    Ok(false)
}
