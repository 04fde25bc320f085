use std::collections::HashSet;

use tracing::debug;

use crate::error::SpaceError;
use crate::graph::ProjectGraph;

/// Scope flags for a partial build centered on a pivot project.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuildScope {
    pub include_upstream: bool,
    pub include_downstream: bool,
    pub push_and_publish_root: bool,
}

/// Dependency-first order from `start`: every reachable project exactly
/// once, after all of its links. Cycles terminate through the visited set,
/// with members emitted in the order they finish.
pub fn build_order(graph: &ProjectGraph, start: &str) -> Vec<String> {
    let mut order = Vec::new();
    let mut visited = HashSet::new();
    visit(graph, start, &mut visited, &mut order);
    order
}

fn visit(graph: &ProjectGraph, name: &str, visited: &mut HashSet<String>, order: &mut Vec<String>) {
    if !visited.insert(name.to_string()) {
        return;
    }
    let Some(project) = graph.get(name) else {
        return;
    };
    for link in &project.links {
        visit(graph, link, visited, order);
    }
    order.push(name.to_string());
}

/// Strict topological order over `members`: repeatedly takes the first
/// member whose links are all placed or outside the set. A cycle leaves no
/// candidate and fails with the unplaced members.
pub fn best_dependency_order(
    graph: &ProjectGraph,
    members: &[String],
) -> Result<Vec<String>, SpaceError> {
    let mut order = Vec::with_capacity(members.len());
    let mut remaining: HashSet<&str> = members.iter().map(String::as_str).collect();
    while !remaining.is_empty() {
        let candidate = members.iter().find(|name| {
            remaining.contains(name.as_str())
                && graph.get(name).is_none_or(|project| {
                    project.links.iter().all(|link| !remaining.contains(link.as_str()))
                })
        });
        let Some(name) = candidate else {
            let unplaced: Vec<String> = members
                .iter()
                .filter(|name| remaining.contains(name.as_str()))
                .cloned()
                .collect();
            return Err(SpaceError::NoValidBuildOrder {
                remaining: unplaced,
            });
        };
        debug!("placing {name} in the build order");
        remaining.remove(name.as_str());
        order.push(name.clone());
    }
    Ok(order)
}

/// Full queue for a scoped build: the root's order, with the pivot's order
/// prepended when the root cannot reach the pivot. Dedup keeps the first
/// occurrence so prepended upstream entries stay ahead.
pub fn plan_build_queue(graph: &ProjectGraph, root: &str, pivot: &str) -> Vec<String> {
    let mut queue = build_order(graph, root);
    if !queue.iter().any(|name| name == pivot) {
        let mut combined = build_order(graph, pivot);
        combined.extend(queue);
        queue = combined;
    }
    let mut seen = HashSet::new();
    queue
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Applies the scope flags to a planned queue, preserving queue order. The
/// downstream check walks each candidate's own reach afresh so shared
/// upstream members never mask a dependent.
pub fn select_build_targets(
    graph: &ProjectGraph,
    queue: &[String],
    pivot: &str,
    scope: BuildScope,
) -> Vec<String> {
    let upstream: HashSet<String> = build_order(graph, pivot).into_iter().collect();
    queue
        .iter()
        .filter(|name| {
            name.as_str() == pivot
                || (scope.include_upstream && upstream.contains(name.as_str()))
                || (scope.include_downstream && depends_on(graph, name, pivot))
        })
        .cloned()
        .collect()
}

/// True when `name` can reach `target` over links.
fn depends_on(graph: &ProjectGraph, name: &str, target: &str) -> bool {
    build_order(graph, name).iter().any(|member| member == target)
}
