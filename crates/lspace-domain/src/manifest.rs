use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;

/// Version prefix a link tool writes for locally linked dependencies.
pub const LINK_PREFIX: &str = "file:.yalc";

/// Directory a link tool stages local installations under.
pub const STAGING_DIR: &str = ".yalc";

pub const MANIFEST_FILE: &str = "package.json";

/// The subset of a package manifest the space cares about.
///
/// Dependency tables keep declaration order so traversal and build
/// planning stay stable across runs.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageManifest {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: IndexMap<String, String>,
}

impl PackageManifest {
    /// Reads and parses the manifest inside `directory`.
    pub fn read_from(directory: &Path) -> Result<Self> {
        let path = directory.join(MANIFEST_FILE);
        let contents =
            fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
        let manifest: Self = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        if manifest.name.trim().is_empty() {
            return Err(anyhow!("{} declares no package name", path.display()));
        }
        Ok(manifest)
    }

    /// Regular and dev dependencies merged, dev entries winning on conflict.
    pub fn merged_dependencies(&self) -> IndexMap<String, String> {
        let mut merged = self.dependencies.clone();
        for (name, version) in &self.dev_dependencies {
            merged.insert(name.clone(), version.clone());
        }
        merged
    }

    /// Names of every direct dependency, linked or not.
    pub fn all_dependency_names(&self) -> Vec<String> {
        self.merged_dependencies().keys().cloned().collect()
    }

    /// Names of dependencies currently installed as local links.
    pub fn linked_dependency_names(&self) -> Vec<String> {
        self.linked_dependencies()
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    }

    /// Locally linked entries as `(name, version string)` pairs.
    pub fn linked_dependencies(&self) -> Vec<(String, String)> {
        self.merged_dependencies()
            .into_iter()
            .filter(|(_, version)| version.starts_with(LINK_PREFIX))
            .collect()
    }
}

/// Nearest directory at or above `start` holding a package manifest.
pub fn discover_project_dir(start: &Path) -> Result<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        if dir.join(MANIFEST_FILE).is_file() {
            return Ok(dir);
        }
        if !dir.pop() {
            return Err(anyhow!("no {MANIFEST_FILE} found above {}", start.display()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_manifest(dir: &Path, contents: &str) {
        fs::write(dir.join(MANIFEST_FILE), contents).unwrap();
    }

    #[test]
    fn read_from_extracts_links_and_dependency_names() {
        let temp = tempdir().unwrap();
        write_manifest(
            temp.path(),
            r#"{
                "name": "@scope/app",
                "version": "1.2.3",
                "dependencies": {
                    "left-pad": "^1.3.0",
                    "@scope/http": "file:.yalc/@scope/http"
                },
                "devDependencies": {
                    "jest": "^29.0.0",
                    "@scope/testkit": "file:.yalc/@scope/testkit"
                }
            }"#,
        );

        let manifest = PackageManifest::read_from(temp.path()).unwrap();
        assert_eq!(manifest.name, "@scope/app");
        assert_eq!(
            manifest.linked_dependency_names(),
            vec!["@scope/http".to_string(), "@scope/testkit".to_string()]
        );
        assert_eq!(
            manifest.all_dependency_names(),
            vec![
                "left-pad".to_string(),
                "@scope/http".to_string(),
                "jest".to_string(),
                "@scope/testkit".to_string()
            ]
        );
    }

    #[test]
    fn read_from_fails_without_a_name() {
        let temp = tempdir().unwrap();
        write_manifest(temp.path(), r#"{ "name": "", "dependencies": {} }"#);

        let err = PackageManifest::read_from(temp.path()).unwrap_err();
        assert!(
            err.to_string().contains("declares no package name"),
            "got {err}"
        );
    }

    #[test]
    fn missing_dependency_tables_default_to_empty() {
        let temp = tempdir().unwrap();
        write_manifest(temp.path(), r#"{ "name": "bare" }"#);

        let manifest = PackageManifest::read_from(temp.path()).unwrap();
        assert!(manifest.all_dependency_names().is_empty());
        assert!(manifest.linked_dependencies().is_empty());
    }

    #[test]
    fn dev_entries_win_without_reordering() {
        let temp = tempdir().unwrap();
        write_manifest(
            temp.path(),
            r#"{
                "name": "dup",
                "dependencies": { "shared": "^1.0.0", "only-prod": "^2.0.0" },
                "devDependencies": { "shared": "file:.yalc/shared" }
            }"#,
        );

        let manifest = PackageManifest::read_from(temp.path()).unwrap();
        assert_eq!(
            manifest.all_dependency_names(),
            vec!["shared".to_string(), "only-prod".to_string()]
        );
        assert_eq!(
            manifest.linked_dependency_names(),
            vec!["shared".to_string()]
        );
    }

    #[test]
    fn discover_walks_up_to_the_manifest() {
        let temp = tempdir().unwrap();
        write_manifest(temp.path(), r#"{ "name": "top" }"#);
        let nested = temp.path().join("src").join("deep");
        fs::create_dir_all(&nested).unwrap();

        let found = discover_project_dir(&nested).unwrap();
        assert_eq!(found, temp.path());
    }

    #[test]
    fn discover_fails_when_no_manifest_exists() {
        let temp = tempdir().unwrap();
        let err = discover_project_dir(temp.path()).unwrap_err();
        assert!(err.to_string().contains(MANIFEST_FILE), "got {err}");
    }
}
