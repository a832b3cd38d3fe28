use std::env;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{self, Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("cannot find command {name} in PATH")]
    NotInPath { name: String },
    #[error("cannot find file under path {}", .path.display())]
    NotFound { path: PathBuf },
    #[error("failed to resolve path {}", .path.display())]
    Resolve {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub fn lookup(command: impl AsRef<Path>) -> Result<PathBuf, LookupError> {
    let command = command.as_ref();
    let candidate = if contains_separator(command) {
        command.to_path_buf()
    } else {
        search_path(command)?
    };

    let absolute = path::absolute(&candidate).map_err(|source| LookupError::Resolve {
        path: candidate.clone(),
        source,
    })?;

    for probe in probe_candidates(&absolute) {
        if probe.exists() {
            let resolved = canonicalize(&probe)?;
            tracing::debug!(
                command = %command.display(),
                resolved = %resolved.display(),
                "resolved command path"
            );
            return Ok(resolved);
        }
    }

    Err(LookupError::NotFound { path: absolute })
}

fn contains_separator(command: &Path) -> bool {
    command
        .as_os_str()
        .to_string_lossy()
        .chars()
        .any(path::is_separator)
}

fn search_path(name: &Path) -> Result<PathBuf, LookupError> {
    let not_found = || LookupError::NotInPath {
        name: name.display().to_string(),
    };
    if name.as_os_str().is_empty() {
        return Err(not_found());
    }

    let path_var = env::var_os("PATH").unwrap_or_default();
    for dir in env::split_paths(&path_var) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        for candidate in probe_candidates(&dir.join(name)) {
            if is_executable_file(&candidate) {
                return Ok(candidate);
            }
        }
    }

    Err(not_found())
}

fn probe_candidates(path: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![path.to_path_buf()];
    if cfg!(windows) {
        for suffix in [".exe", ".bat"] {
            let mut with_suffix = OsString::from(path.as_os_str());
            with_suffix.push(suffix);
            candidates.push(PathBuf::from(with_suffix));
        }
    }
    candidates
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path)
        .map(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}

fn canonicalize(path: &Path) -> Result<PathBuf, LookupError> {
    let resolve_error = |source| LookupError::Resolve {
        path: path.to_path_buf(),
        source,
    };
    let resolved = fs::canonicalize(path).map_err(resolve_error)?;
    path::absolute(&resolved).map_err(resolve_error)
}
