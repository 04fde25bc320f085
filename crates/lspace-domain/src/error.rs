use std::path::PathBuf;

use thiserror::Error;

/// Failures the engines report to callers instead of panicking.
#[derive(Debug, Error)]
pub enum SpaceError {
    /// A linked package has no source checkout under any search root.
    #[error("could not find code for {package}")]
    MissingCode { package: String },

    /// The root project carries no lockfile format we can read.
    #[error("no recognized lockfile in {}", root.display())]
    UnsupportedLockfile { root: PathBuf },

    /// Strict ordering found no dependency-free candidate among `remaining`.
    #[error("no valid build order; remaining: {}", remaining.join(", "))]
    NoValidBuildOrder { remaining: Vec<String> },

    /// A configured command exited nonzero.
    #[error("command `{command}` exited with status {status} in {}", dir.display())]
    CommandFailure {
        command: String,
        dir: PathBuf,
        status: i32,
    },
}
