use std::{
    collections::{HashSet, VecDeque},
    path::{Path, PathBuf},
};

use anyhow::Result;
use tracing::debug;

use lspace_domain::{manifest::PackageManifest, Project, ProjectGraph, SpaceError};

use crate::core::runtime::effects::ProjectLocator;

/// Resolves the space reachable from the project at `directory` into an
/// indexed graph. Every linked dependency must have a checkout the locator
/// can find; otherwise resolution fails with `MissingCode`.
pub fn resolve_project(locator: &dyn ProjectLocator, directory: &Path) -> Result<ProjectGraph> {
    let root_dir = directory
        .canonicalize()
        .unwrap_or_else(|_| directory.to_path_buf());
    let root = read_project(&root_dir)?;
    debug!("resolving the space of {}", root.full_name);

    let mut visited_dirs: HashSet<PathBuf> = HashSet::from([root_dir]);
    let mut queue: VecDeque<String> = root.links.iter().cloned().collect();
    let mut graph = ProjectGraph::new(root);

    while let Some(name) = queue.pop_front() {
        if graph.contains(&name) {
            continue;
        }
        let Some(found) = locator.locate(&name)? else {
            return Err(SpaceError::MissingCode { package: name }.into());
        };
        let dir = found.canonicalize().unwrap_or(found);
        if !visited_dirs.insert(dir.clone()) {
            continue;
        }
        let project = read_project(&dir)?;
        queue.extend(project.links.iter().cloned());
        if !graph.insert(project) {
            debug!("{name} already resolved, keeping the first manifest");
        }
    }
    Ok(graph)
}

fn read_project(directory: &Path) -> Result<Project> {
    let manifest = PackageManifest::read_from(directory)?;
    Ok(Project::from_manifest(directory, &manifest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::space::testkit::{write_package, StaticLocator};
    use tempfile::tempdir;

    #[test]
    fn resolves_a_chain_of_links() {
        let temp = tempdir().unwrap();
        let root = write_package(&temp.path().join("root"), "root", &[("a", true)]);
        let a = write_package(&temp.path().join("a"), "a", &[("b", true)]);
        let b = write_package(&temp.path().join("b"), "b", &[]);
        let locator = StaticLocator::of(&[("a", &a), ("b", &b)]);

        let graph = resolve_project(&locator, &root).unwrap();
        assert_eq!(graph.member_names(), vec!["root", "a", "b"]);
        assert_eq!(graph.get("a").unwrap().links, vec!["b".to_string()]);
    }

    #[test]
    fn unlinked_dependencies_stay_out_of_the_graph() {
        let temp = tempdir().unwrap();
        let root = write_package(
            &temp.path().join("root"),
            "root",
            &[("linked", true), ("registry-dep", false)],
        );
        let linked = write_package(&temp.path().join("linked"), "linked", &[]);
        let locator = StaticLocator::of(&[("linked", &linked)]);

        let graph = resolve_project(&locator, &root).unwrap();
        assert_eq!(graph.member_names(), vec!["root", "linked"]);
        assert_eq!(
            graph.root().all_dependencies,
            vec!["linked".to_string(), "registry-dep".to_string()]
        );
    }

    #[test]
    fn a_missing_checkout_fails_resolution() {
        let temp = tempdir().unwrap();
        let root = write_package(&temp.path().join("root"), "root", &[("ghost", true)]);
        let locator = StaticLocator::default();

        let err = resolve_project(&locator, &root).unwrap_err();
        match err.downcast_ref::<SpaceError>() {
            Some(SpaceError::MissingCode { package }) => assert_eq!(package, "ghost"),
            other => panic!("expected MissingCode, got {other:?}"),
        }
    }

    #[test]
    fn cyclic_links_resolve_without_looping() {
        let temp = tempdir().unwrap();
        let root = write_package(&temp.path().join("root"), "root", &[("a", true)]);
        let a = write_package(&temp.path().join("a"), "a", &[("b", true)]);
        let b = write_package(&temp.path().join("b"), "b", &[("a", true)]);
        let locator = StaticLocator::of(&[("a", &a), ("b", &b)]);

        let graph = resolve_project(&locator, &root).unwrap();
        assert_eq!(graph.member_names(), vec!["root", "a", "b"]);
        assert_eq!(graph.get("b").unwrap().links, vec!["a".to_string()]);
    }
}
