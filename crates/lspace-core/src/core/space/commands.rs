use std::path::PathBuf;

use anyhow::Result;
use serde_json::{json, Value};

use lspace_domain::{plan_build_queue, select_build_targets, BuildScope, ProjectGraph};

use crate::core::config::context::CommandContext;
use crate::core::space::builder::{build_space, BuildRequest};
use crate::core::space::closure::close_and_complete_space;
use crate::core::space::eject::{eject, eject_all};
use crate::core::space::resolve::resolve_project;
use crate::core::space::workspace::{open_workspace, write_workspace_file};
use crate::core::tooling::outcome::{format_status_message, outcome_from_error, ExecutionOutcome};

/// Scope selection for a build centered on the current project.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BuildMode {
    /// Only the pivot itself.
    #[default]
    Single,
    /// The pivot plus its transitive dependents.
    Downstream,
    /// The pivot, everything it depends on, and everything depending on it.
    Everything,
}

impl BuildMode {
    fn scope(self) -> BuildScope {
        BuildScope {
            include_upstream: matches!(self, BuildMode::Everything),
            include_downstream: matches!(self, BuildMode::Downstream | BuildMode::Everything),
            push_and_publish_root: false,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct BuildCommandRequest {
    pub mode: BuildMode,
    /// Directory of the space root; the pivot's own directory when absent.
    pub root: Option<PathBuf>,
    pub dry_run: bool,
}

#[derive(Clone, Debug, Default)]
pub struct EjectRequest {
    pub package: Option<String>,
    pub all: bool,
}

/// Resolves the space at the current project, writes the workspace file,
/// and launches the editor on it.
pub fn space_open(context: &CommandContext<'_>) -> ExecutionOutcome {
    finish("open", open_inner(context))
}

/// Scoped build with the current project as pivot.
pub fn space_build(context: &CommandContext<'_>, request: &BuildCommandRequest) -> ExecutionOutcome {
    finish("build", build_inner(context, request))
}

/// Closes and completes the space, then rewrites the workspace file.
pub fn space_complete(context: &CommandContext<'_>) -> ExecutionOutcome {
    finish("complete", complete_inner(context))
}

/// Removes one package, or every non-root member, from the space.
pub fn space_eject(context: &CommandContext<'_>, request: &EjectRequest) -> ExecutionOutcome {
    finish("eject", eject_inner(context, request))
}

/// Prints the resolved space without touching anything.
pub fn space_list(context: &CommandContext<'_>) -> ExecutionOutcome {
    finish("list", list_inner(context))
}

fn open_inner(context: &CommandContext<'_>) -> Result<ExecutionOutcome> {
    let directory = context.project_dir()?;
    let graph = resolve_project(context.locator(), &directory)?;
    let path = open_workspace(context.effects(), context.config(), &graph)?;
    Ok(ExecutionOutcome::success(
        format!("opened a space of {} project(s)", graph.len()),
        json!({
            "workspace": path.display().to_string(),
            "members": member_summaries(&graph),
        }),
    ))
}

fn build_inner(
    context: &CommandContext<'_>,
    request: &BuildCommandRequest,
) -> Result<ExecutionOutcome> {
    let pivot_dir = context.project_dir()?;
    let pivot = resolve_project(context.locator(), &pivot_dir)?;
    let root = match &request.root {
        Some(dir) => resolve_project(context.locator(), dir)?,
        None => pivot.clone(),
    };
    let scope = request.mode.scope();

    if request.dry_run {
        let mut merged = root.clone();
        merged.absorb(pivot.clone());
        let queue = plan_build_queue(&merged, merged.root_name(), pivot.root_name());
        let selected = select_build_targets(&merged, &queue, pivot.root_name(), scope);
        return Ok(ExecutionOutcome::success(
            format!(
                "would build {} project(s): {}",
                selected.len(),
                selected.join(", ")
            ),
            json!({ "selected": selected, "queue": queue }),
        ));
    }

    let built = build_space(
        context.effects(),
        context.config(),
        &BuildRequest {
            root: &root,
            pivot: &pivot,
            scope,
        },
    )?;
    Ok(ExecutionOutcome::success(
        format!("built {} project(s): {}", built.len(), built.join(", ")),
        json!({ "built": built }),
    ))
}

fn complete_inner(context: &CommandContext<'_>) -> Result<ExecutionOutcome> {
    let directory = context.project_dir()?;
    let graph = close_and_complete_space(context.effects(), context.config(), &directory)?;
    let path = write_workspace_file(context.config(), &graph)?;
    Ok(ExecutionOutcome::success(
        format!("space closed and completed with {} project(s)", graph.len()),
        json!({
            "workspace": path.display().to_string(),
            "members": member_summaries(&graph),
        }),
    ))
}

fn eject_inner(context: &CommandContext<'_>, request: &EjectRequest) -> Result<ExecutionOutcome> {
    let directory = context.project_dir()?;
    let graph = resolve_project(context.locator(), &directory)?;

    let message = if request.all {
        eject_all(context.effects(), context.config(), &graph)?;
        "ejected every non-root member".to_string()
    } else if let Some(package) = &request.package {
        if !graph.contains(package) {
            return Ok(ExecutionOutcome::user_error(
                format!("{package} is not part of the space"),
                json!({ "package": package, "members": graph.member_names() }),
            ));
        }
        eject(context.effects(), context.config(), &graph, package)?;
        format!("ejected {package}")
    } else {
        return Ok(ExecutionOutcome::user_error(
            "pass --package NAME or --all",
            Value::Null,
        ));
    };

    let refreshed = resolve_project(context.locator(), &directory)?;
    let path = write_workspace_file(context.config(), &refreshed)?;
    Ok(ExecutionOutcome::success(
        message,
        json!({
            "workspace": path.display().to_string(),
            "members": member_summaries(&refreshed),
        }),
    ))
}

fn list_inner(context: &CommandContext<'_>) -> Result<ExecutionOutcome> {
    let directory = context.project_dir()?;
    let graph = resolve_project(context.locator(), &directory)?;
    Ok(ExecutionOutcome::success(
        format!(
            "{} project(s) in the space of {}",
            graph.len(),
            graph.root_name()
        ),
        json!({
            "root": graph.root_name(),
            "members": member_summaries(&graph),
        }),
    ))
}

fn member_summaries(graph: &ProjectGraph) -> Value {
    Value::Array(
        graph
            .traverse()
            .into_iter()
            .map(|project| {
                json!({
                    "name": project.full_name,
                    "path": project.path.display().to_string(),
                    "links": project.links,
                })
            })
            .collect(),
    )
}

/// Applies the command prefix and maps engine errors onto the outcome
/// surface; unknown errors become failures carrying the full error chain.
fn finish(command: &str, result: Result<ExecutionOutcome>) -> ExecutionOutcome {
    let mut outcome = match result {
        Ok(outcome) => outcome,
        Err(error) => outcome_from_error(&error)
            .unwrap_or_else(|| ExecutionOutcome::failure(format!("{error:#}"), Value::Null)),
    };
    outcome.message = format_status_message(command, &outcome.message);
    outcome
}
