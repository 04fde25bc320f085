use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use lspace_domain::{
    manifest::{PackageManifest, MANIFEST_FILE, STAGING_DIR},
    planner::{plan_build_queue, select_build_targets, BuildScope},
    Project, ProjectGraph,
};

use crate::core::config::settings::Config;
use crate::core::runtime::effects::Effects;
use crate::core::space::settings::{project_settings, ProjectSettings};
use crate::core::space::tools;

/// One scoped build run: the space root, the pivot the scope centers on,
/// and the selection flags.
pub struct BuildRequest<'a> {
    pub root: &'a ProjectGraph,
    pub pivot: &'a ProjectGraph,
    pub scope: BuildScope,
}

/// Builds every selected project in dependency order and returns their
/// names. Each build repairs the project's links first, then installs,
/// builds, and, for everything but an unpublished root, publishes and
/// pushes the result.
pub fn build_space(
    effects: &dyn Effects,
    config: &Config,
    request: &BuildRequest<'_>,
) -> Result<Vec<String>> {
    let mut merged = request.root.clone();
    merged.absorb(request.pivot.clone());

    let queue = plan_build_queue(&merged, merged.root_name(), request.pivot.root_name());
    debug!("build queue: {}", queue.join(" -> "));
    let selected = select_build_targets(&merged, &queue, request.pivot.root_name(), request.scope);
    info!("building {} project(s): {}", selected.len(), selected.join(", "));

    for name in &selected {
        let Some(project) = merged.get(name) else {
            continue;
        };
        build_one(effects, config, &merged, project, request.scope)?;
    }
    Ok(selected)
}

fn build_one(
    effects: &dyn Effects,
    config: &Config,
    graph: &ProjectGraph,
    project: &Project,
    scope: BuildScope,
) -> Result<()> {
    info!("building {}", project.full_name);
    let root = graph.root();
    let settings = project_settings(config, root, &project.full_name, &project.path);

    remove_broken_links(effects, &settings, project)?;
    repair_staged_links(graph, project)?;

    debug!("installing modules for {}", project.full_name);
    tools::run_settings_command(effects, &settings.install, None, &project.path)?;
    debug!("running `{}` for {}", settings.build, project.full_name);
    tools::run_settings_command(effects, &settings.build, None, &project.path)?;

    if project.full_name != root.full_name || scope.push_and_publish_root {
        let publish_dir = match &settings.publish_directory {
            Some(sub) => project.path.join(sub),
            None => project.path.clone(),
        };
        debug!("publishing {} from {}", project.full_name, publish_dir.display());
        tools::run_settings_command(effects, &settings.publish, None, &publish_dir)?;
        tools::run_settings_command(effects, &settings.push, None, &publish_dir)?;
    }
    Ok(())
}

/// Detaches links whose staged copy under the staging directory has
/// disappeared, by running the project's unlink command.
fn remove_broken_links(
    effects: &dyn Effects,
    settings: &ProjectSettings,
    project: &Project,
) -> Result<()> {
    let staging = project.path.join(STAGING_DIR);
    for link in &project.links {
        if staged_package_dir(&staging, link).exists() {
            continue;
        }
        info!("detaching broken link {link} from {}", project.full_name);
        tools::unlink_dependency(effects, settings, &project.path, link)?;
    }
    Ok(())
}

/// Rewrites stale `file:` references inside staged installations so nested
/// links survive checkouts moving. A reference that cannot be repointed is
/// left in place with a warning.
fn repair_staged_links(graph: &ProjectGraph, project: &Project) -> Result<()> {
    let staging = project.path.join(STAGING_DIR);
    for staged in staged_manifests(&staging) {
        let Some(staged_dir) = staged.path.parent().map(Path::to_path_buf) else {
            continue;
        };
        for (dep_name, version) in staged.manifest.linked_dependencies() {
            let target = staged_dir.join(version.trim_start_matches("file:"));
            if target.exists() {
                continue;
            }
            debug!(
                "stale reference to {dep_name} in {}: {} is gone",
                staged.manifest.name,
                target.display()
            );

            let local = staged_package_dir(&staging, &dep_name);
            if local.join(MANIFEST_FILE).is_file() {
                let replacement = format!("file:{}", local.display());
                replace_version(&staged.path, &version, &replacement)?;
                continue;
            }

            let supplier = graph
                .traverse_from(&project.full_name)
                .into_iter()
                .find(|member| member.full_name == staged.manifest.name);
            let Some(supplier) = supplier else {
                warn!(
                    "could not fix the link to {dep_name}: {} is not part of the space",
                    staged.manifest.name
                );
                continue;
            };
            let original = staged_package_dir(&supplier.path.join(STAGING_DIR), &dep_name);
            if original.join(MANIFEST_FILE).is_file() {
                let replacement = format!("file:{}", original.display());
                replace_version(&staged.path, &version, &replacement)?;
                continue;
            }
            warn!(
                "could not fix the link to {dep_name} in {}",
                staged.manifest.name
            );
        }
    }
    Ok(())
}

struct StagedManifest {
    path: PathBuf,
    manifest: PackageManifest,
}

/// Every package manifest under `staging`; unreadable entries are skipped.
fn staged_manifests(staging: &Path) -> Vec<StagedManifest> {
    let mut found = Vec::new();
    for entry in WalkDir::new(staging) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!("skipping staging entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() || entry.file_name() != MANIFEST_FILE {
            continue;
        }
        let Some(dir) = entry.path().parent() else {
            continue;
        };
        match PackageManifest::read_from(dir) {
            Ok(manifest) => found.push(StagedManifest {
                path: entry.path().to_path_buf(),
                manifest,
            }),
            Err(err) => debug!("skipping {}: {err}", entry.path().display()),
        }
    }
    found
}

/// The staged installation directory for `name`, scope segments included.
pub(crate) fn staged_package_dir(staging: &Path, name: &str) -> PathBuf {
    let mut dir = staging.to_path_buf();
    for part in name.split('/') {
        dir.push(part);
    }
    dir
}

/// The link tool rewrites versions in place without reformatting, so the
/// repair does the same: a textual replace inside the manifest.
fn replace_version(manifest_path: &Path, old: &str, new: &str) -> Result<()> {
    debug!("repointing {old} -> {new} in {}", manifest_path.display());
    let contents = fs::read_to_string(manifest_path)
        .with_context(|| format!("reading {}", manifest_path.display()))?;
    fs::write(manifest_path, contents.replace(old, new))
        .with_context(|| format!("writing {}", manifest_path.display()))?;
    Ok(())
}
