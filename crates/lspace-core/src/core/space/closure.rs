use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use anyhow::Result;
use tracing::{debug, info};

use lspace_domain::{
    best_dependency_order, dependency_paths, parse_dependency_info, BuildScope, DependencyInfo,
    ProjectGraph, SpaceError,
};

use crate::core::config::settings::Config;
use crate::core::runtime::effects::Effects;
use crate::core::space::builder::{build_space, BuildRequest};
use crate::core::space::complete::complete_space;
use crate::core::space::resolve::resolve_project;
use crate::core::space::settings::project_settings;
use crate::core::space::tools;

/// State threaded through the closing passes of one run: the dependency
/// information parsed once up front, and the packages already built and
/// published this run.
pub struct ClosureState {
    info: DependencyInfo,
    built_and_published: HashSet<String>,
}

impl ClosureState {
    fn new(info: DependencyInfo) -> Self {
        Self {
            info,
            built_and_published: HashSet::new(),
        }
    }
}

/// Closes and completes the space rooted at `directory`.
///
/// A space is closed when every package on a dependency path between a
/// member and the root is itself a built, published, linked member. Closing
/// runs passes until a pass discovers nothing new, re-resolving the graph
/// after each pass because linking edits manifests on disk. The completion
/// pass then links every remaining in-space direct dependency. Returns the
/// final graph.
pub fn close_and_complete_space(
    effects: &dyn Effects,
    config: &Config,
    directory: &Path,
) -> Result<ProjectGraph> {
    let mut graph = resolve_project(effects.locator(), directory)?;
    let mut state = ClosureState::new(parse_dependency_info(graph.root())?);

    let mut pass = 0u32;
    loop {
        pass += 1;
        info!("closing the space, pass {pass}");
        let discovered = close_space_once(effects, config, &graph, &mut state)?;
        graph = resolve_project(effects.locator(), directory)?;
        if discovered == 0 {
            break;
        }
    }
    info!("space closed after {pass} pass(es)");
    complete_space(effects, config, &graph)
}

/// One closing pass over the members of `graph` in strict dependency order,
/// the root excluded. Returns how many packages outside the graph the pass
/// discovered.
fn close_space_once(
    effects: &dyn Effects,
    config: &Config,
    graph: &ProjectGraph,
    state: &mut ClosureState,
) -> Result<usize> {
    let members = graph.member_names();
    let order = best_dependency_order(graph, &members)?;
    debug!("closing over: {}", order.join(", "));

    let mut discovered = HashSet::new();
    for member in &order {
        if member.as_str() == graph.root_name() {
            continue;
        }
        let Some(project) = graph.get(member) else {
            continue;
        };
        debug!("processing {member}");
        ensure_built_at(effects, config, graph, state, member, &project.path)?;

        for path in dependency_paths(&state.info, member, graph.root_name()) {
            debug!("dependency path: {}", path.join(" -> "));
            walk_path(effects, config, graph, state, &mut discovered, &path)?;
        }
    }

    if !discovered.is_empty() {
        let mut names: Vec<&str> = discovered.iter().map(String::as_str).collect();
        names.sort_unstable();
        info!("discovered {} package(s): {}", names.len(), names.join(", "));
    }
    Ok(discovered.len())
}

/// Walks one reverse-dependency path toward the root, linking the previous
/// element into each next one. Elements outside the current graph are
/// recorded in `discovered` and built before the walk moves past them, so
/// nothing ever links against an unpublished package.
fn walk_path(
    effects: &dyn Effects,
    config: &Config,
    graph: &ProjectGraph,
    state: &mut ClosureState,
    discovered: &mut HashSet<String>,
    path: &[String],
) -> Result<()> {
    let Some(first) = path.first() else {
        return Ok(());
    };
    let mut upstream = first.clone();
    for package in path {
        let directory = locate_dir(effects, package)?;
        if &upstream != package {
            debug!("linking {upstream} into {package}");
            let settings = project_settings(config, graph.root(), package, &directory);
            tools::link_dependency(effects, &settings, &directory, &upstream)?;
        }
        if !graph.contains(package) && !discovered.contains(package) {
            info!("adding {package} to the space from {}", directory.display());
            discovered.insert(package.clone());
            ensure_built_at(effects, config, graph, state, package, &directory)?;
        }
        upstream.clone_from(package);
    }
    Ok(())
}

/// Builds and publishes `package` unless already done this run. The build
/// runs the build engine scoped to exactly that project, link repair
/// included, with publish and push enabled even for a graph root.
fn ensure_built_at(
    effects: &dyn Effects,
    config: &Config,
    root: &ProjectGraph,
    state: &mut ClosureState,
    package: &str,
    directory: &Path,
) -> Result<()> {
    if state.built_and_published.contains(package) {
        return Ok(());
    }
    debug!("building and publishing {package}");
    let pivot = resolve_project(effects.locator(), directory)?;
    build_space(
        effects,
        config,
        &BuildRequest {
            root,
            pivot: &pivot,
            scope: BuildScope {
                push_and_publish_root: true,
                ..BuildScope::default()
            },
        },
    )?;
    state.built_and_published.insert(package.to_string());
    Ok(())
}

fn locate_dir(effects: &dyn Effects, package: &str) -> Result<PathBuf> {
    effects.locator().locate(package)?.ok_or_else(|| {
        SpaceError::MissingCode {
            package: package.to_string(),
        }
        .into()
    })
}
