use std::{collections::HashMap, fs, path::Path};

use serde::Deserialize;
use tracing::{debug, warn};

use lspace_domain::Project;

use crate::core::config::settings::Config;

pub const DEFAULT_INSTALL: &str = "yarn --force";
pub const DEFAULT_BUILD: &str = "yarn build";
pub const DEFAULT_PUBLISH: &str = "yalc publish --sig";
pub const DEFAULT_PUSH: &str = "yalc push --sig";
pub const DEFAULT_LINK: &str = "yalc add";
pub const DEFAULT_UNLINK: &str = "yalc remove";

/// The commands the engines run for one project. Link and unlink receive
/// the package name as their final argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectSettings {
    pub install: String,
    pub build: String,
    pub publish: String,
    pub push: String,
    pub link: String,
    pub unlink: String,
    /// Subdirectory to publish and push from, relative to the project.
    pub publish_directory: Option<String>,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            install: DEFAULT_INSTALL.to_string(),
            build: DEFAULT_BUILD.to_string(),
            publish: DEFAULT_PUBLISH.to_string(),
            push: DEFAULT_PUSH.to_string(),
            link: DEFAULT_LINK.to_string(),
            unlink: DEFAULT_UNLINK.to_string(),
            publish_directory: None,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SettingsOverride {
    install: Option<String>,
    build: Option<String>,
    publish: Option<String>,
    push: Option<String>,
    link: Option<String>,
    unlink: Option<String>,
    publish_directory: Option<String>,
}

/// Resolves the command set for the project named `full_name` at
/// `directory`, within the space rooted at `root`: defaults, then project
/// detection, then per-package overrides from the space settings file.
pub fn project_settings(
    config: &Config,
    root: &Project,
    full_name: &str,
    directory: &Path,
) -> ProjectSettings {
    let mut settings = ProjectSettings {
        publish_directory: detect_publish_directory(directory),
        ..ProjectSettings::default()
    };

    let path = config.settings_path(&root.non_scoped_name);
    if let Some(overrides) = read_override(&path, full_name) {
        debug!("applying settings overrides for {full_name}");
        apply(&mut settings, overrides);
    }
    settings
}

fn read_override(path: &Path, full_name: &str) -> Option<SettingsOverride> {
    let contents = fs::read_to_string(path).ok()?;
    let mut map: HashMap<String, SettingsOverride> = match serde_json::from_str(&contents) {
        Ok(map) => map,
        Err(err) => {
            warn!("ignoring malformed {}: {err}", path.display());
            return None;
        }
    };
    map.remove(full_name)
}

fn apply(settings: &mut ProjectSettings, overrides: SettingsOverride) {
    if let Some(install) = overrides.install {
        settings.install = install;
    }
    if let Some(build) = overrides.build {
        settings.build = build;
    }
    if let Some(publish) = overrides.publish {
        settings.publish = publish;
    }
    if let Some(push) = overrides.push {
        settings.push = push;
    }
    if let Some(link) = overrides.link {
        settings.link = link;
    }
    if let Some(unlink) = overrides.unlink {
        settings.unlink = unlink;
    }
    if let Some(publish_directory) = overrides.publish_directory {
        settings.publish_directory = Some(publish_directory);
    }
}

/// Projects releasing through semantic-release often publish a staging
/// subdirectory; `release.config.js` names it as `pkgRoot`. The config is
/// scanned textually, so only literal values are picked up.
fn detect_publish_directory(directory: &Path) -> Option<String> {
    let contents = fs::read_to_string(directory.join("release.config.js")).ok()?;
    scan_pkg_root(&contents)
}

fn scan_pkg_root(contents: &str) -> Option<String> {
    let start = contents.find("pkgRoot")? + "pkgRoot".len();
    let rest = contents[start..].trim_start_matches(['"', '\'']).trim_start();
    let rest = rest
        .strip_prefix(':')
        .or_else(|| rest.strip_prefix('='))?
        .trim_start();
    let mut chars = rest.chars();
    let quote = chars.next().filter(|ch| matches!(ch, '\'' | '"' | '`'))?;
    let value: String = chars.take_while(|ch| *ch != quote).collect();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
