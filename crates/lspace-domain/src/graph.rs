use std::{
    collections::{HashSet, VecDeque},
    path::{Path, PathBuf},
};

use indexmap::{map::Entry, IndexMap};

use crate::manifest::PackageManifest;

/// One locally checked-out package inside the space.
///
/// Links are held as names rather than nested structures so a table lookup
/// always yields the single canonical record for a package, cycles included.
#[derive(Clone, Debug)]
pub struct Project {
    pub full_name: String,
    pub non_scoped_name: String,
    pub path: PathBuf,
    /// Names of locally linked in-space dependencies, in manifest order.
    pub links: Vec<String>,
    /// Names of every direct dependency, linked or not.
    pub all_dependencies: Vec<String>,
}

impl Project {
    pub fn from_manifest(directory: &Path, manifest: &PackageManifest) -> Self {
        Self {
            full_name: manifest.name.clone(),
            non_scoped_name: non_scoped(&manifest.name),
            path: directory.to_path_buf(),
            links: manifest.linked_dependency_names(),
            all_dependencies: manifest.all_dependency_names(),
        }
    }
}

/// `@scope/name` reduces to `name`; unscoped names pass through.
pub fn non_scoped(full_name: &str) -> String {
    full_name
        .rsplit('/')
        .next()
        .unwrap_or(full_name)
        .to_string()
}

/// Indexed table of every project reachable from the root over links.
#[derive(Clone, Debug)]
pub struct ProjectGraph {
    root: String,
    projects: IndexMap<String, Project>,
}

impl ProjectGraph {
    pub fn new(root: Project) -> Self {
        let name = root.full_name.clone();
        let mut projects = IndexMap::new();
        projects.insert(name.clone(), root);
        Self {
            root: name,
            projects,
        }
    }

    /// Adds `project` unless a record with the same name already exists.
    /// The first manifest resolved for a name wins.
    pub fn insert(&mut self, project: Project) -> bool {
        match self.projects.entry(project.full_name.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(project);
                true
            }
        }
    }

    pub fn root(&self) -> &Project {
        &self.projects[&self.root]
    }

    pub fn root_name(&self) -> &str {
        &self.root
    }

    pub fn get(&self, name: &str) -> Option<&Project> {
        self.projects.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.projects.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Breadth-first walk over links from the root; every member exactly once.
    pub fn traverse(&self) -> Vec<&Project> {
        self.traverse_from(&self.root)
    }

    /// Breadth-first walk from `start`. Links without a table entry are
    /// treated as outside the space and skipped.
    pub fn traverse_from(&self, start: &str) -> Vec<&Project> {
        let mut members = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        queue.push_back(start);
        while let Some(name) = queue.pop_front() {
            if !visited.insert(name) {
                continue;
            }
            let Some(project) = self.projects.get(name) else {
                continue;
            };
            members.push(project);
            queue.extend(project.links.iter().map(String::as_str));
        }
        members
    }

    /// Names of every member, in traversal order.
    pub fn member_names(&self) -> Vec<String> {
        self.traverse()
            .into_iter()
            .map(|project| project.full_name.clone())
            .collect()
    }

    /// Folds the entries of `other` into this table, keeping existing records.
    /// The root stays this table's root.
    pub fn absorb(&mut self, other: ProjectGraph) {
        for (name, project) in other.projects {
            self.projects.entry(name).or_insert(project);
        }
    }
}
