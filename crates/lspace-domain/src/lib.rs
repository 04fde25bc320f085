//! Core model for a space of locally linked packages: manifests, the
//! project graph, lockfile-derived dependency information, reverse path
//! enumeration, and build-order planning. Everything here is pure; the
//! engines that run commands live in `lspace-core`.

#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod error;
pub mod graph;
pub mod lockfile;
pub mod manifest;
pub mod paths;
pub mod planner;

pub use error::SpaceError;
pub use graph::{non_scoped, Project, ProjectGraph};
pub use lockfile::{
    parse_dependency_info, parse_npm_lock, parse_yarn_lock, DependencyInfo, NPM_LOCKFILE,
    YARN_LOCKFILE,
};
pub use manifest::{
    discover_project_dir, PackageManifest, LINK_PREFIX, MANIFEST_FILE, STAGING_DIR,
};
pub use paths::dependency_paths;
pub use planner::{
    best_dependency_order, build_order, plan_build_queue, select_build_targets, BuildScope,
};
