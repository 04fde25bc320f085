use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Result;

use crate::core::config::settings::Config;
use crate::core::runtime::locate::{FsLocator, JsonLocationStore};
use crate::core::runtime::process::{run_command, run_command_passthrough, RunOutput};

/// Runs external programs; the engines only observe exit status and output.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<RunOutput>;

    /// Same as `run` but with inherited stdio, for interactive tools.
    fn run_passthrough(&self, program: &str, args: &[String], cwd: &Path) -> Result<RunOutput>;
}

/// Resolves a package name to the directory holding its source checkout.
pub trait ProjectLocator: Send + Sync {
    fn locate(&self, full_name: &str) -> Result<Option<PathBuf>>;
}

/// Persistent name-to-directory cache consulted before searching disk.
pub trait LocationStore: Send + Sync {
    fn get(&self, name: &str) -> Option<PathBuf>;
    fn put(&self, name: &str, directory: &Path) -> Result<()>;
    fn invalidate(&self, name: &str) -> Result<()>;
}

/// The side-effect surface the engines run against. Production code wires
/// in [`SystemEffects`]; tests substitute fakes.
pub trait Effects: Send + Sync {
    fn runner(&self) -> &dyn CommandRunner;
    fn locator(&self) -> &dyn ProjectLocator;
}

pub type SharedEffects = Arc<dyn Effects>;

struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<RunOutput> {
        run_command(program, args, cwd)
    }

    fn run_passthrough(&self, program: &str, args: &[String], cwd: &Path) -> Result<RunOutput> {
        run_command_passthrough(program, args, cwd)
    }
}

/// Real process execution plus the disk-backed locator.
pub struct SystemEffects {
    runner: Arc<SystemCommandRunner>,
    locator: Arc<FsLocator>,
}

impl SystemEffects {
    pub fn new(config: &Config) -> Self {
        let store: Arc<dyn LocationStore> = Arc::new(JsonLocationStore::open(config.lookup_path()));
        Self {
            runner: Arc::new(SystemCommandRunner),
            locator: Arc::new(FsLocator::new(config.search_roots().to_vec(), store)),
        }
    }
}

impl Effects for SystemEffects {
    fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    fn locator(&self) -> &dyn ProjectLocator {
        self.locator.as_ref()
    }
}
