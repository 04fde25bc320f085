use std::path::Path;

use anyhow::Result;
use tracing::debug;

use lspace_domain::SpaceError;

use crate::core::runtime::effects::Effects;
use crate::core::runtime::process::split_command;
use crate::core::space::settings::ProjectSettings;

/// Runs one configured command in `cwd`, appending `extra` when given.
/// A nonzero exit becomes a `CommandFailure` carrying command and place.
pub(crate) fn run_settings_command(
    effects: &dyn Effects,
    command: &str,
    extra: Option<&str>,
    cwd: &Path,
) -> Result<()> {
    let (program, mut args) = split_command(command)?;
    let rendered = match extra {
        Some(extra) => {
            args.push(extra.to_string());
            format!("{command} {extra}")
        }
        None => command.to_string(),
    };
    debug!("running `{rendered}` in {}", cwd.display());
    let output = effects.runner().run(&program, &args, cwd)?;
    if output.code != 0 {
        debug!("stdout: {}", output.stdout);
        debug!("stderr: {}", output.stderr);
        return Err(SpaceError::CommandFailure {
            command: rendered,
            dir: cwd.to_path_buf(),
            status: output.code,
        }
        .into());
    }
    Ok(())
}

/// Installs `dependency` into the project at `consumer_dir` as a local link.
pub(crate) fn link_dependency(
    effects: &dyn Effects,
    settings: &ProjectSettings,
    consumer_dir: &Path,
    dependency: &str,
) -> Result<()> {
    run_settings_command(effects, &settings.link, Some(dependency), consumer_dir)
}

/// Removes the local link to `dependency` from the project at `consumer_dir`.
pub(crate) fn unlink_dependency(
    effects: &dyn Effects,
    settings: &ProjectSettings,
    consumer_dir: &Path,
    dependency: &str,
) -> Result<()> {
    run_settings_command(effects, &settings.unlink, Some(dependency), consumer_dir)
}
