use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tracing::{debug, warn};

use lspace_domain::ProjectGraph;

use crate::core::config::settings::Config;
use crate::core::runtime::effects::Effects;
use crate::core::runtime::process::split_command;

/// Renders the editor workspace for the space and writes it under the
/// space's data directory. Returns the file path.
pub fn write_workspace_file(config: &Config, graph: &ProjectGraph) -> Result<PathBuf> {
    let path = config.workspace_path(&graph.root().non_scoped_name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let workspace = render_workspace(config, graph);
    fs::write(&path, serde_json::to_string_pretty(&workspace)?)
        .with_context(|| format!("writing {}", path.display()))?;
    debug!("wrote {}", path.display());
    Ok(path)
}

/// Writes the workspace file and launches the configured editor on it. A
/// failing editor launch is reported but does not fail the operation.
pub fn open_workspace(
    effects: &dyn Effects,
    config: &Config,
    graph: &ProjectGraph,
) -> Result<PathBuf> {
    let path = write_workspace_file(config, graph)?;
    let space_dir = config.space_dir(&graph.root().non_scoped_name);
    let (program, mut args) = split_command(config.editor())?;
    args.push(path.display().to_string());
    let output = effects.runner().run_passthrough(&program, &args, &space_dir)?;
    if output.code != 0 {
        warn!("{program} exited with status {}", output.code);
    }
    Ok(path)
}

/// One folder per member sorted by name after the data folder, a task per
/// command plus a build task per member, and picker inputs for build modes
/// and package names.
fn render_workspace(config: &Config, graph: &ProjectGraph) -> Value {
    let root = graph.root();
    let root_path = root.path.display().to_string();
    let mut names = graph.member_names();
    names.sort();

    let mut folders = vec![json!({
        "path": config.space_dir(&root.non_scoped_name).display().to_string(),
    })];
    for name in &names {
        if let Some(project) = graph.get(name) {
            folders.push(json!({ "path": project.path.display().to_string() }));
        }
    }

    let mut tasks = vec![
        task("Complete Space", &["complete"], &root.path),
        task("Regenerate Space", &["open"], &root.path),
        task(
            "Eject Package",
            &["eject", "--package", "${input:package}"],
            &root.path,
        ),
        task("Eject All", &["eject", "--all"], &root.path),
        task(
            "Build Everything",
            &["build", "--mode", "everything", "--root", &root_path],
            &root.path,
        ),
    ];
    for name in &names {
        let Some(project) = graph.get(name) else {
            continue;
        };
        let mode = if project.full_name == root.full_name {
            "${input:rootMode}"
        } else {
            "${input:mode}"
        };
        tasks.push(task(
            &format!("Build {}", project.non_scoped_name),
            &["build", "--mode", mode, "--root", &root_path],
            &project.path,
        ));
    }

    json!({
        "folders": folders,
        "settings": {
            "cSpell.words": ["lspace", "yalc"],
        },
        "tasks": {
            "version": "2.0.0",
            "inputs": [
                {
                    "type": "pickString",
                    "id": "mode",
                    "description": "Build mode",
                    "options": ["downstream", "single", "everything"],
                    "default": "downstream",
                },
                {
                    "type": "pickString",
                    "id": "rootMode",
                    "description": "Build mode",
                    "options": ["single", "everything"],
                    "default": "single",
                },
                {
                    "type": "pickString",
                    "id": "package",
                    "description": "Package name",
                    "options": names,
                },
            ],
            "tasks": tasks,
        },
    })
}

fn task(label: &str, args: &[&str], cwd: &Path) -> Value {
    json!({
        "label": label,
        "command": "lspace",
        "args": args,
        "options": { "cwd": cwd.display().to_string() },
        "type": "shell",
        "group": "build",
        "problemMatcher": ["$tsc"],
        "presentation": { "clear": true },
    })
}
