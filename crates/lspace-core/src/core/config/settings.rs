use std::{
    collections::HashMap,
    env,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

pub const ENV_HOME: &str = "LSPACE_HOME";
pub const ENV_SEARCH_ROOT: &str = "LSPACE_SEARCH_ROOT";
pub const ENV_EDITOR: &str = "LSPACE_EDITOR";

const DATA_DIR_NAME: &str = ".lspace";
const DEFAULT_EDITOR: &str = "code";

/// Flags shared by every command, captured once at startup.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GlobalOptions {
    pub quiet: bool,
    pub verbose: u8,
    pub trace: bool,
    pub json: bool,
}

/// Immutable view of the process environment taken at startup.
#[derive(Clone, Debug)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
    home: Option<PathBuf>,
}

impl EnvSnapshot {
    pub fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
            home: dirs_next::home_dir(),
        }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        Self {
            vars: pairs
                .iter()
                .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
                .collect(),
            home: None,
        }
    }
}

/// Where the space keeps its data and how it finds and opens projects.
#[derive(Clone, Debug)]
pub struct Config {
    data_dir: PathBuf,
    search_roots: Vec<PathBuf>,
    editor: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> Result<Self> {
        let data_dir = match snapshot.var(ENV_HOME).filter(|dir| !dir.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => home_dir(snapshot)?.join(DATA_DIR_NAME),
        };
        let search_roots = match snapshot.var(ENV_SEARCH_ROOT).filter(|raw| !raw.is_empty()) {
            Some(raw) => env::split_paths(raw).collect(),
            None => vec![home_dir(snapshot)?],
        };
        let editor = snapshot
            .var(ENV_EDITOR)
            .filter(|editor| !editor.is_empty())
            .unwrap_or(DEFAULT_EDITOR)
            .to_string();
        Ok(Self {
            data_dir,
            search_roots,
            editor,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn search_roots(&self) -> &[PathBuf] {
        &self.search_roots
    }

    pub fn editor(&self) -> &str {
        &self.editor
    }

    /// Cache of package name to checkout directory.
    pub fn lookup_path(&self) -> PathBuf {
        self.data_dir.join("lookup.json")
    }

    /// Per-space data directory, keyed by the root's non-scoped name.
    pub fn space_dir(&self, root_non_scoped: &str) -> PathBuf {
        self.data_dir.join(root_non_scoped)
    }

    pub fn settings_path(&self, root_non_scoped: &str) -> PathBuf {
        self.space_dir(root_non_scoped).join("settings.json")
    }

    pub fn workspace_path(&self, root_non_scoped: &str) -> PathBuf {
        self.space_dir(root_non_scoped)
            .join(format!("{root_non_scoped}.code-workspace"))
    }
}

fn home_dir(snapshot: &EnvSnapshot) -> Result<PathBuf> {
    snapshot.home.clone().ok_or_else(|| {
        anyhow!("could not determine the home directory; set {ENV_HOME} and {ENV_SEARCH_ROOT}")
    })
}
