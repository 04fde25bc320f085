use anyhow::Result;
use tracing::{debug, info};

use lspace_domain::ProjectGraph;

use crate::core::config::settings::Config;
use crate::core::runtime::effects::Effects;
use crate::core::space::settings::project_settings;
use crate::core::space::tools;

/// Removes every link to `package_name` across the space by running each
/// consumer's unlink command. The ejected package's own checkout, links
/// included, is untouched. A package nothing links to is a no-op.
pub fn eject(
    effects: &dyn Effects,
    config: &Config,
    graph: &ProjectGraph,
    package_name: &str,
) -> Result<()> {
    info!("ejecting {package_name} from {}", graph.root_name());
    for member in graph.traverse() {
        if member.full_name == package_name {
            continue;
        }
        if member.links.iter().any(|link| link == package_name) {
            debug!("unlinking {package_name} from {}", member.full_name);
            let settings = project_settings(config, graph.root(), &member.full_name, &member.path);
            tools::unlink_dependency(effects, &settings, &member.path, package_name)?;
        }
    }
    Ok(())
}

/// Ejects every non-root member, walking the membership of the graph as it
/// was handed in. Ejecting over that original enumeration keeps members
/// reachable-at-the-start visible even after earlier ejections cut the
/// root's own links to them. Afterwards the root stands alone.
pub fn eject_all(effects: &dyn Effects, config: &Config, graph: &ProjectGraph) -> Result<()> {
    for member in graph.traverse() {
        if member.full_name == graph.root_name() {
            continue;
        }
        eject(effects, config, graph, &member.full_name)?;
    }
    Ok(())
}
