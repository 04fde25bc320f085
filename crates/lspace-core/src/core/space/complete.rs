use anyhow::Result;
use tracing::{debug, info};

use lspace_domain::{PackageManifest, ProjectGraph};

use crate::core::config::settings::Config;
use crate::core::runtime::effects::Effects;
use crate::core::space::resolve::resolve_project;
use crate::core::space::settings::project_settings;
use crate::core::space::tools;

/// Links every direct dependency that is itself a space member but not yet
/// linked, for every member of the space. Dependencies are re-read from the
/// manifests on disk because closing passes edit them. Already-linked pairs
/// are skipped, so a second run performs no link operations. Returns the
/// re-resolved graph.
pub fn complete_space(
    effects: &dyn Effects,
    config: &Config,
    graph: &ProjectGraph,
) -> Result<ProjectGraph> {
    info!("completing the space");
    for member in graph.traverse() {
        let manifest = PackageManifest::read_from(&member.path)?;
        for dependency in manifest.all_dependency_names() {
            if !graph.contains(&dependency) || member.links.contains(&dependency) {
                continue;
            }
            debug!("linking {dependency} into {}", member.full_name);
            let settings = project_settings(config, graph.root(), &member.full_name, &member.path);
            tools::link_dependency(effects, &settings, &member.path, &dependency)?;
        }
    }
    resolve_project(effects.locator(), &graph.root().path)
}
