use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use impostor_core::{parse_configuration, parse_target, Target, TargetDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TargetSource<'a> {
    Args,
    Json(&'a str),
    Config(&'a Path),
}

pub(crate) fn select_target_source<'a>(
    args_given: bool,
    json: Option<&'a str>,
    config: Option<&'a Path>,
) -> Result<TargetSource<'a>> {
    let json = json.filter(|value| !value.is_empty());
    let config = config.filter(|value| !value.as_os_str().is_empty());

    let mut given = Vec::with_capacity(3);
    if args_given {
        given.push("arguments");
    }
    if json.is_some() {
        given.push("'json' flag");
    }
    if config.is_some() {
        given.push("'config' flag");
    }

    match (given.len(), json, config) {
        (0, _, _) => bail!("no arguments, 'json' flag nor 'config' flag specified"),
        (1, Some(json), _) => Ok(TargetSource::Json(json)),
        (1, _, Some(config)) => Ok(TargetSource::Config(config)),
        (1, _, _) => Ok(TargetSource::Args),
        (2, _, _) => Err(anyhow!("{} specified together", given.join(" and "))),
        _ => bail!("arguments, 'json' flag and 'config' flag specified together"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SourcedTarget {
    pub(crate) position: Option<usize>,
    pub(crate) target: Target,
}

impl SourcedTarget {
    fn standalone(target: Target) -> Self {
        Self {
            position: None,
            target,
        }
    }

    fn label_error(&self, err: anyhow::Error) -> anyhow::Error {
        match self.position {
            Some(position) => err.context(format!("target #{position} ({})", self.target.cmd)),
            None => err,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operation {
    Install { include_arg0: bool },
    Uninstall,
}

pub(crate) fn load_targets(
    source: TargetSource<'_>,
    args: &[String],
    operation: Operation,
) -> Result<Vec<SourcedTarget>> {
    let target = match (source, operation) {
        (TargetSource::Json(json), _) => parse_target(json).context("parsing 'json' flag value")?,
        (TargetSource::Config(path), _) => return targets_from_config_file(path),
        (TargetSource::Args, Operation::Install { include_arg0 }) => {
            install_target_from_args(args, include_arg0)?
        }
        (TargetSource::Args, Operation::Uninstall) => uninstall_target_from_args(args)?,
    };
    Ok(vec![SourcedTarget::standalone(target)])
}

fn targets_from_config_file(path: &Path) -> Result<Vec<SourcedTarget>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading configuration file {}", path.display()))?;
    let configuration = parse_configuration(&raw)?;
    Ok(configuration
        .targets
        .into_iter()
        .enumerate()
        .map(|(index, target)| SourcedTarget {
            position: Some(index + 1),
            target,
        })
        .collect())
}

pub(crate) fn install_target_from_args(args: &[String], include_arg0: bool) -> Result<Target> {
    match args {
        [] => bail!("too few arguments provided: missing target-command and impostor-command"),
        [_] => bail!("too few arguments provided: missing impostor-command"),
        [cmd, impostor, impostor_args @ ..] => Ok(Target {
            version: String::new(),
            cmd: cmd.clone(),
            impostor: impostor.clone(),
            impostor_args: impostor_args.to_vec(),
            include_arg0,
        }),
    }
}

pub(crate) fn uninstall_target_from_args(args: &[String]) -> Result<Target> {
    let Some(cmd) = args.first() else {
        bail!("too few arguments provided: missing target-command");
    };
    Ok(Target {
        cmd: cmd.clone(),
        ..Target::default()
    })
}

pub(crate) fn resolve_descriptors(
    targets: &[SourcedTarget],
    operation: Operation,
) -> Result<Vec<TargetDescriptor>> {
    targets
        .iter()
        .map(|sourced| {
            resolve_descriptor(&sourced.target, operation).map_err(|err| sourced.label_error(err))
        })
        .collect()
}

fn resolve_descriptor(target: &Target, operation: Operation) -> Result<TargetDescriptor> {
    if let Operation::Install { .. } = operation {
        target.require_impostor()?;
    }
    Ok(TargetDescriptor::from_target(target)?)
}
