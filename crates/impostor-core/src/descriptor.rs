use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Target;
use crate::lookup::{lookup, LookupError};
use crate::trailer::DESCRIPTOR_MAX_SIZE;

pub const DESCRIPTOR_VERSION: &str = "v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDescriptor {
    pub version: String,
    pub original_command: PathBuf,
    pub impostor_command: String,
    #[serde(default)]
    pub impostor_args: Vec<String>,
    #[serde(default)]
    pub include_arg_zero: bool,
}

#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("not an impostor (data do not contain an impostor descriptor)")]
    NoDescriptor,
    #[error("{}", unsupported_version_message(.version))]
    UnsupportedVersion { version: String },
    #[error(
        "impostor descriptor is too large ({size} bytes, limit is {limit} bytes)",
        limit = DESCRIPTOR_MAX_SIZE
    )]
    TooLarge { size: u64 },
    #[error("impostor descriptor is corrupt: {reason}")]
    Corrupt { reason: String },
    #[error("malformed impostor descriptor")]
    Malformed(#[source] serde_json::Error),
    #[error("failed to serialize impostor descriptor")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to access impostor descriptor data")]
    Io(#[from] io::Error),
}

impl DescriptorError {
    pub fn is_no_descriptor(&self) -> bool {
        matches!(self, Self::NoDescriptor)
    }

    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        Self::Corrupt {
            reason: reason.into(),
        }
    }
}

fn unsupported_version_message(version: &str) -> String {
    if version.is_empty() {
        "empty impostor descriptor version is unsupported".to_string()
    } else {
        format!("impostor descriptor version {version} is unsupported")
    }
}

pub(crate) fn check_version(version: &str) -> Result<(), DescriptorError> {
    if version != DESCRIPTOR_VERSION {
        return Err(DescriptorError::UnsupportedVersion {
            version: version.to_string(),
        });
    }
    Ok(())
}

impl TargetDescriptor {
    pub fn from_target(target: &Target) -> Result<Self, LookupError> {
        let original_command = lookup(&target.cmd)?;
        Ok(Self {
            version: DESCRIPTOR_VERSION.to_string(),
            original_command,
            impostor_command: target.impostor.clone(),
            impostor_args: target.impostor_args.clone(),
            include_arg_zero: target.include_arg0,
        })
    }

    pub fn validate(&self) -> Result<(), DescriptorError> {
        check_version(&self.version)
    }
}
