//! Engines for working with a space of locally linked packages: resolving
//! the graph from disk, scoped builds, closing and completing the space,
//! ejection, and the editor workspace surface. The pure model lives in
//! `lspace-domain`; this crate owns configuration, process execution, and
//! the command handlers the CLI drives.

#![deny(clippy::all, warnings)]

mod core;

pub use lspace_domain::{BuildScope, Project, ProjectGraph, SpaceError};

pub use crate::core::config::context::CommandContext;
pub use crate::core::config::settings::{
    Config, EnvSnapshot, GlobalOptions, ENV_EDITOR, ENV_HOME, ENV_SEARCH_ROOT,
};
pub use crate::core::runtime::effects::{
    CommandRunner, Effects, LocationStore, ProjectLocator, SharedEffects, SystemEffects,
};
pub use crate::core::runtime::locate::{FsLocator, JsonLocationStore};
pub use crate::core::runtime::process::{
    run_command, run_command_passthrough, split_command, RunOutput,
};
pub use crate::core::space::builder::{build_space, BuildRequest};
pub use crate::core::space::closure::close_and_complete_space;
pub use crate::core::space::commands::{
    space_build, space_complete, space_eject, space_list, space_open, BuildCommandRequest,
    BuildMode, EjectRequest,
};
pub use crate::core::space::complete::complete_space;
pub use crate::core::space::eject::{eject, eject_all};
pub use crate::core::space::resolve::resolve_project;
pub use crate::core::space::settings::{project_settings, ProjectSettings};
pub use crate::core::space::workspace::{open_workspace, write_workspace_file};
pub use crate::core::tooling::outcome::{
    format_status_message, outcome_from_error, to_json_response, CommandStatus, ExecutionOutcome,
};
