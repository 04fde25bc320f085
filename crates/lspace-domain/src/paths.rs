use std::collections::{HashSet, VecDeque};

use crate::lockfile::DependencyInfo;

/// Every simple reverse-dependency path `[from, .., root]` through `info`.
///
/// Paths are explored breadth-first, so shorter chains come first, and a
/// package never repeats within one path. Duplicate paths are dropped by
/// comparing the sequences themselves. Chains that never reach the root
/// are discarded.
pub fn dependency_paths(info: &DependencyInfo, from: &str, root: &str) -> Vec<Vec<String>> {
    if from == root {
        return vec![vec![root.to_string()]];
    }
    let mut complete: Vec<Vec<String>> = Vec::new();
    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut queue: VecDeque<Vec<String>> = VecDeque::new();
    queue.push_back(vec![from.to_string()]);

    while let Some(path) = queue.pop_front() {
        if path.last().is_some_and(|tail| tail == root) {
            if seen.insert(path.clone()) {
                complete.push(path);
            }
            continue;
        }
        let Some(current) = path.last().cloned() else {
            continue;
        };
        for dependent in info.reverse_dependents_of(&current) {
            if path.iter().any(|node| node == &dependent) {
                continue;
            }
            let mut next = path.clone();
            next.push(dependent);
            queue.push_back(next);
        }
    }
    complete
}
