use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::Path,
};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::error::SpaceError;
use crate::graph::Project;

pub const YARN_LOCKFILE: &str = "yarn.lock";
pub const NPM_LOCKFILE: &str = "package-lock.json";

/// Package name to the names of its direct dependencies, unioned across
/// every version the lockfile records.
#[derive(Clone, Debug, Default)]
pub struct DependencyInfo {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyInfo {
    pub fn dependencies_of(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.entries.get(name)
    }

    /// Packages that list `name` as a direct dependency, sorted by name.
    pub fn reverse_dependents_of(&self, name: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, deps)| deps.contains(name))
            .map(|(package, _)| package.clone())
            .collect()
    }

    pub fn insert_dependency(&mut self, package: &str, dependency: &str) {
        self.entries
            .entry(package.to_string())
            .or_default()
            .insert(dependency.to_string());
    }

    pub fn ensure_entry(&mut self, package: &str) {
        self.entries.entry(package.to_string()).or_default();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Derives the dependency map for the space rooted at `root` from the
/// lockfile next to its manifest, seeded with the root's own direct
/// dependencies so paths can terminate at the root even when the lockfile
/// does not record it.
pub fn parse_dependency_info(root: &Project) -> Result<DependencyInfo> {
    let mut info = read_lockfile(&root.path)?;
    info.ensure_entry(&root.full_name);
    for dep in &root.all_dependencies {
        info.insert_dependency(&root.full_name, dep);
    }
    debug!("dependency info covers {} package(s)", info.len());
    Ok(info)
}

fn read_lockfile(dir: &Path) -> Result<DependencyInfo> {
    let yarn = dir.join(YARN_LOCKFILE);
    if yarn.is_file() {
        let contents =
            fs::read_to_string(&yarn).with_context(|| format!("reading {}", yarn.display()))?;
        return Ok(parse_yarn_lock(&contents));
    }
    let npm = dir.join(NPM_LOCKFILE);
    if npm.is_file() {
        let contents =
            fs::read_to_string(&npm).with_context(|| format!("reading {}", npm.display()))?;
        return parse_npm_lock(&contents);
    }
    Err(SpaceError::UnsupportedLockfile {
        root: dir.to_path_buf(),
    }
    .into())
}

/// Hand parser for the v1 yarn lockfile. Entry headers sit at indent zero,
/// `dependencies:` blocks at indent two, and their entries deeper. Lines
/// that fit no rule are skipped.
pub fn parse_yarn_lock(contents: &str) -> DependencyInfo {
    let mut info = DependencyInfo::default();
    let mut current: Vec<String> = Vec::new();
    let mut in_dependencies = false;

    for raw in contents.lines() {
        let line = raw.trim_end();
        if line.is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        let indent = line.len() - line.trim_start().len();
        if indent == 0 {
            in_dependencies = false;
            current.clear();
            let Some(header) = line.strip_suffix(':') else {
                continue;
            };
            for key in split_entry_keys(header) {
                let Some(name) = package_name_of_key(&key) else {
                    continue;
                };
                info.ensure_entry(&name);
                if !current.contains(&name) {
                    current.push(name);
                }
            }
        } else if indent == 2 {
            let body = line.trim_start();
            in_dependencies = body == "dependencies:" || body == "optionalDependencies:";
        } else if in_dependencies {
            let Some(dep) = dependency_line_name(line.trim_start()) else {
                continue;
            };
            for name in &current {
                info.insert_dependency(name, &dep);
            }
        }
    }
    info
}

/// Splits a header like `"@s/a@^1.0.0", "@s/a@^1.2.0"` into its keys,
/// dropping the quoting.
fn split_entry_keys(header: &str) -> Vec<String> {
    let mut keys = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    for ch in header.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                let key = buf.trim();
                if !key.is_empty() {
                    keys.push(key.to_string());
                }
                buf.clear();
            }
            _ => buf.push(ch),
        }
    }
    let key = buf.trim();
    if !key.is_empty() {
        keys.push(key.to_string());
    }
    keys
}

/// `@scope/name@range` and `name@range` both reduce to the package name.
fn package_name_of_key(key: &str) -> Option<String> {
    let key = key.trim();
    if let Some(rest) = key.strip_prefix('@') {
        let (scope, tail) = rest.split_once('/')?;
        let name = tail.split('@').next().unwrap_or(tail);
        if scope.is_empty() || name.is_empty() {
            return None;
        }
        Some(format!("@{scope}/{name}"))
    } else {
        let name = key.split('@').next().unwrap_or(key);
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }
}

/// A dependency line is `name "range"`, with the name itself quoted when
/// scoped.
fn dependency_line_name(line: &str) -> Option<String> {
    if let Some(rest) = line.strip_prefix('"') {
        let (name, _) = rest.split_once('"')?;
        if name.is_empty() {
            return None;
        }
        return Some(name.to_string());
    }
    line.split_whitespace().next().map(ToString::to_string)
}

#[derive(Deserialize)]
struct NpmLock {
    #[serde(default)]
    packages: BTreeMap<String, NpmLockPackage>,
    #[serde(default)]
    dependencies: BTreeMap<String, NpmLegacyDependency>,
}

#[derive(Deserialize)]
struct NpmLockPackage {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct NpmLegacyDependency {
    #[serde(default)]
    requires: BTreeMap<String, String>,
    #[serde(default)]
    dependencies: BTreeMap<String, NpmLegacyDependency>,
}

/// npm lockfiles v2/v3 key packages by install path; the name is the part
/// after the last `node_modules/`. The v1 `dependencies` tree is folded in
/// as well so older lockfiles keep working.
pub fn parse_npm_lock(contents: &str) -> Result<DependencyInfo> {
    let lock: NpmLock =
        serde_json::from_str(contents).context("failed to parse package-lock.json")?;
    let mut info = DependencyInfo::default();
    for (key, package) in &lock.packages {
        let name = match key.rsplit_once("node_modules/") {
            Some((_, name)) => name.to_string(),
            None if key.is_empty() => match &package.name {
                Some(name) => name.clone(),
                None => continue,
            },
            None => continue,
        };
        if name.is_empty() {
            continue;
        }
        info.ensure_entry(&name);
        for dep in package.dependencies.keys() {
            info.insert_dependency(&name, dep);
        }
    }
    collect_legacy(&lock.dependencies, &mut info);
    Ok(info)
}

fn collect_legacy(tree: &BTreeMap<String, NpmLegacyDependency>, info: &mut DependencyInfo) {
    for (name, entry) in tree {
        info.ensure_entry(name);
        for dep in entry.requires.keys() {
            info.insert_dependency(name, dep);
        }
        collect_legacy(&entry.dependencies, info);
    }
}
