use std::{
    collections::{HashMap, VecDeque},
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Context, Result};
use tracing::debug;

use lspace_domain::manifest::{PackageManifest, MANIFEST_FILE};

use crate::core::runtime::effects::{LocationStore, ProjectLocator};

/// Directory names never descended into during a search.
const IGNORED_DIRS: [&str; 8] = [
    ".git",
    ".yalc",
    ".lspace",
    ".Trash",
    "node_modules",
    "bin",
    "obj",
    "target",
];

/// Name-to-directory cache persisted as one pretty-printed JSON object.
/// A missing or unreadable file starts the cache empty.
pub struct JsonLocationStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, PathBuf>>,
}

impl JsonLocationStore {
    pub fn open(path: PathBuf) -> Self {
        let entries = fs::read_to_string(&path)
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok())
            .unwrap_or_default();
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn persist(&self, entries: &HashMap<String, PathBuf>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, contents)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

impl LocationStore for JsonLocationStore {
    fn get(&self, name: &str) -> Option<PathBuf> {
        self.entries.lock().ok()?.get(name).cloned()
    }

    fn put(&self, name: &str, directory: &Path) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("location store lock poisoned"))?;
        entries.insert(name.to_string(), directory.to_path_buf());
        self.persist(&entries)
    }

    fn invalidate(&self, name: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("location store lock poisoned"))?;
        entries.remove(name);
        self.persist(&entries)
    }
}

/// Finds package checkouts on disk: cached locations are validated against
/// the manifest still naming the package, stale entries are dropped, and
/// misses fall back to a breadth-first scan of the search roots.
pub struct FsLocator {
    search_roots: Vec<PathBuf>,
    store: Arc<dyn LocationStore>,
}

impl FsLocator {
    pub fn new(search_roots: Vec<PathBuf>, store: Arc<dyn LocationStore>) -> Self {
        Self {
            search_roots,
            store,
        }
    }
}

impl ProjectLocator for FsLocator {
    fn locate(&self, full_name: &str) -> Result<Option<PathBuf>> {
        if let Some(cached) = self.store.get(full_name) {
            if manifest_names(&cached, full_name) {
                debug!("cache hit for {full_name}: {}", cached.display());
                return Ok(Some(cached));
            }
            debug!("cache entry for {full_name} is stale, dropping it");
            self.store.invalidate(full_name)?;
        }
        for root in &self.search_roots {
            if let Some(found) = search_tree(root, full_name) {
                self.store.put(full_name, &found)?;
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

fn manifest_names(directory: &Path, full_name: &str) -> bool {
    PackageManifest::read_from(directory).is_ok_and(|manifest| manifest.name == full_name)
}

/// Breadth-first scan under `root` for a directory whose manifest declares
/// `full_name`. Unreadable directories and unparsable manifests are skipped.
fn search_tree(root: &Path, full_name: &str) -> Option<PathBuf> {
    let mut queue: VecDeque<PathBuf> = VecDeque::new();
    queue.push_back(root.to_path_buf());
    while let Some(dir) = queue.pop_front() {
        debug!("checking {}", dir.display());
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!("skipping {}: {err}", dir.display());
                continue;
            }
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                if IGNORED_DIRS.contains(&name.as_ref()) || name.ends_with(".app") {
                    continue;
                }
                queue.push_back(entry.path());
            } else if name == MANIFEST_FILE {
                if let Ok(manifest) = PackageManifest::read_from(&dir) {
                    if manifest.name == full_name {
                        return Some(dir);
                    }
                }
            }
        }
    }
    None
}
