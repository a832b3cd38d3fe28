use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIGURATION_VERSION: &str = "v1";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Target {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub cmd: String,
    #[serde(default)]
    pub impostor: String,
    #[serde(default)]
    pub impostor_args: Vec<String>,
    #[serde(default, rename = "includeArg0")]
    pub include_arg0: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub targets: Vec<Target>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("parsing version")]
    VersionSyntax(#[source] serde_json::Error),
    #[error("version cannot contain whitespace characters")]
    WhitespaceVersion,
    #[error("unset version is unsupported")]
    UnsetVersion,
    #[error("version {0} is unsupported")]
    UnsupportedVersion(String),
    #[error("unmarshalling target information")]
    TargetSyntax(#[source] serde_json::Error),
    #[error("unmarshalling configuration")]
    ConfigurationSyntax(#[source] serde_json::Error),
    #[error("target command must not be empty")]
    EmptyCommand,
    #[error("impostor command must not be empty")]
    EmptyImpostor,
    #[error("target #{index} ({cmd})")]
    Target {
        index: usize,
        cmd: String,
        #[source]
        source: Box<ConfigError>,
    },
}

impl Target {
    pub fn require_impostor(&self) -> Result<(), ConfigError> {
        if self.impostor.trim().is_empty() {
            return Err(ConfigError::EmptyImpostor);
        }
        Ok(())
    }

    fn require_command(&self) -> Result<(), ConfigError> {
        if self.cmd.trim().is_empty() {
            return Err(ConfigError::EmptyCommand);
        }
        Ok(())
    }
}

#[derive(Deserialize)]
struct VersionProbe {
    #[serde(default)]
    version: String,
}

pub fn parse_target(input: &str) -> Result<Target, ConfigError> {
    probe_strict_version(input)?;
    let target: Target = serde_json::from_str(input).map_err(ConfigError::TargetSyntax)?;
    target.require_command()?;
    Ok(target)
}

pub fn parse_configuration(input: &str) -> Result<Configuration, ConfigError> {
    probe_strict_version(input)?;
    let configuration: Configuration =
        serde_json::from_str(input).map_err(ConfigError::ConfigurationSyntax)?;

    for (position, target) in configuration.targets.iter().enumerate() {
        check_relaxed_version(&target.version)
            .and_then(|()| target.require_command())
            .map_err(|source| ConfigError::Target {
                index: position + 1,
                cmd: target.cmd.clone(),
                source: Box::new(source),
            })?;
    }
    Ok(configuration)
}

fn probe_strict_version(input: &str) -> Result<(), ConfigError> {
    let probe: VersionProbe = serde_json::from_str(input).map_err(ConfigError::VersionSyntax)?;
    check_strict_version(&probe.version)
}

fn check_strict_version(version: &str) -> Result<(), ConfigError> {
    if version.chars().any(char::is_whitespace) {
        return Err(ConfigError::WhitespaceVersion);
    }
    if version.is_empty() {
        return Err(ConfigError::UnsetVersion);
    }
    if version != CONFIGURATION_VERSION {
        return Err(ConfigError::UnsupportedVersion(version.to_string()));
    }
    Ok(())
}

fn check_relaxed_version(version: &str) -> Result<(), ConfigError> {
    if version.is_empty() {
        return Ok(());
    }
    check_strict_version(version)
}
