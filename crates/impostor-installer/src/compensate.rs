use std::fmt;

use anyhow::Result;
use thiserror::Error;

type ReversalFn = Box<dyn FnOnce() -> Result<()> + Send + Sync>;

struct Reversal {
    label: String,
    action: ReversalFn,
}

#[derive(Default)]
#[must_use]
pub struct Compensation {
    reversals: Vec<Reversal>,
}

/// The reversal that failed and the ones behind it. A chain stops at its
/// first failure, so the reversals named in `skipped` were never run and are
/// left for the caller to repair.
#[derive(Debug, Error)]
#[error("undoing '{failed}' failed{}", skipped_note(.skipped))]
pub struct CompensationError {
    pub failed: String,
    pub skipped: Vec<String>,
    #[source]
    pub source: anyhow::Error,
}

fn skipped_note(skipped: &[String]) -> String {
    if skipped.is_empty() {
        String::new()
    } else {
        format!(" (not attempted: {})", skipped.join(", "))
    }
}

impl Compensation {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(
        label: impl Into<String>,
        action: impl FnOnce() -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            reversals: vec![Reversal {
                label: label.into(),
                action: Box::new(action),
            }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.reversals.is_empty()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.reversals
            .iter()
            .rev()
            .map(|reversal| reversal.label.as_str())
            .collect()
    }

    /// Returns a chain that runs `other` first and then `self`.
    pub fn with(mut self, mut other: Compensation) -> Self {
        self.reversals.append(&mut other.reversals);
        self
    }

    /// Runs every reversal, most recent first, stopping at the first failure.
    pub fn run(self) -> Result<(), CompensationError> {
        let mut pending = self.reversals;
        while let Some(reversal) = pending.pop() {
            tracing::debug!(step = %reversal.label, "running compensation");
            if let Err(source) = (reversal.action)() {
                let skipped = pending
                    .iter()
                    .rev()
                    .map(|reversal| reversal.label.clone())
                    .collect();
                return Err(CompensationError {
                    failed: reversal.label,
                    skipped,
                    source,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Compensation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.labels()).finish()
    }
}
