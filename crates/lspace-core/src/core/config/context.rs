use std::{
    env,
    path::PathBuf,
    sync::{Arc, OnceLock},
};

use anyhow::Result;

use lspace_domain::discover_project_dir;

use crate::core::config::settings::{Config, GlobalOptions};
use crate::core::runtime::effects::{
    CommandRunner, Effects, ProjectLocator, SharedEffects, SystemEffects,
};

/// Everything a command handler needs: global flags, derived configuration,
/// the side-effect surface, and lazy discovery of the current project.
pub struct CommandContext<'a> {
    pub global: &'a GlobalOptions,
    config: Config,
    project_dir: OnceLock<PathBuf>,
    effects: SharedEffects,
}

impl<'a> CommandContext<'a> {
    pub fn new(global: &'a GlobalOptions) -> Result<Self> {
        let config = Config::from_env()?;
        let effects: SharedEffects = Arc::new(SystemEffects::new(&config));
        Ok(Self::with_parts(global, config, effects))
    }

    pub fn with_parts(global: &'a GlobalOptions, config: Config, effects: SharedEffects) -> Self {
        Self {
            global,
            config,
            project_dir: OnceLock::new(),
            effects,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn effects(&self) -> &dyn Effects {
        self.effects.as_ref()
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.effects.runner()
    }

    pub fn locator(&self) -> &dyn ProjectLocator {
        self.effects.locator()
    }

    #[cfg(test)]
    pub(crate) fn preset_project_dir(&self, dir: PathBuf) {
        let _ = self.project_dir.set(dir);
    }

    /// Nearest directory at or above the working directory with a package
    /// manifest. Discovered once and reused for the rest of the command.
    pub fn project_dir(&self) -> Result<PathBuf> {
        if let Some(found) = self.project_dir.get() {
            return Ok(found.clone());
        }
        let cwd = env::current_dir()?;
        let found = discover_project_dir(&cwd)?;
        let _ = self.project_dir.set(found.clone());
        Ok(found)
    }
}
