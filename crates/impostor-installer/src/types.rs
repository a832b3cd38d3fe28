use std::fmt;
use std::path::PathBuf;

use impostor_core::TargetDescriptor;

use crate::{Compensation, CompensationError};

#[derive(Debug)]
pub enum InstallStatus {
    Installed {
        descriptor: TargetDescriptor,
        undo: Compensation,
    },
    AlreadyImpostor { descriptor: TargetDescriptor },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UninstallStatus {
    Uninstalled {
        command: PathBuf,
        restored_from: PathBuf,
    },
    NotImpostor {
        command: PathBuf,
    },
}

/// Failure of an install or uninstall.
///
/// By the time this is returned the operation has either rolled back (any
/// rollback failure is kept in `rollback`) or left its reversal in `pending`
/// for the caller to decide on.
#[derive(Debug)]
pub struct ActionError {
    error: anyhow::Error,
    rollback: Option<CompensationError>,
    pending: Compensation,
}

impl ActionError {
    pub(crate) fn new(error: anyhow::Error) -> Self {
        Self {
            error,
            rollback: None,
            pending: Compensation::none(),
        }
    }

    pub(crate) fn rolled_back(error: anyhow::Error, undo: Compensation) -> Self {
        let rollback = match undo.run() {
            Ok(()) => None,
            Err(rollback) => {
                tracing::warn!(
                    error = %format!("{rollback:#}"),
                    "rollback after failed action did not complete"
                );
                Some(rollback)
            }
        };
        Self {
            error,
            rollback,
            pending: Compensation::none(),
        }
    }

    pub(crate) fn with_pending(error: anyhow::Error, pending: Compensation) -> Self {
        Self {
            error,
            rollback: None,
            pending,
        }
    }

    pub fn error(&self) -> &anyhow::Error {
        &self.error
    }

    pub fn rollback_error(&self) -> Option<&CompensationError> {
        self.rollback.as_ref()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn take_pending(&mut self) -> Compensation {
        std::mem::take(&mut self.pending)
    }
}

impl From<anyhow::Error> for ActionError {
    fn from(error: anyhow::Error) -> Self {
        Self::new(error)
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.error)?;
        if let Some(rollback) = &self.rollback {
            write!(f, "; additionally {rollback}: {:#}", rollback.source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ActionError {}
