//! Errors returned while building, activating or running in an environment.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EnvError>;

#[derive(Debug, Error)]
pub enum EnvError {
    /// Target path exists but is a file or a symlink.
    #[error("Unable to create directory {}", .0.display())]
    InvalidDirectory(PathBuf),

    /// Running inside a venv and no interpreter left on the filtered PATH.
    #[error("No valid python executable discovered")]
    NoBaseExecutable,

    #[error("Base executable {} is not a runnable file", .0.display())]
    NotExecutable(PathBuf),

    #[error("Failed to determine version of {}: {reason}", .program.display())]
    Version { program: PathBuf, reason: String },

    #[error("Invalid installer URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    /// The installer's download path is already occupied.
    #[error("Refusing to overwrite {} with a downloaded installer", .0.display())]
    InstallerPathTaken(PathBuf),

    #[error("Failed to spawn {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} {}", .program.display(), describe_exit(.code))]
    ProcessFailed { program: PathBuf, code: Option<i32> },

    #[error("Cannot build PATH: {0}")]
    SearchPath(#[from] std::env::JoinPathsError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exited with code {}", c),
        None => "was terminated by a signal".to_string(),
    }
}

/// `anyhow::Context`-style helper for `io::Result`.
pub(crate) trait IoContext<T> {
    fn io_context<C: Into<String>>(self, context: C) -> Result<T>;

    fn with_io_context<C: Into<String>, F: FnOnce() -> C>(self, f: F) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn io_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|source| EnvError::Io {
            context: context.into(),
            source,
        })
    }

    fn with_io_context<C: Into<String>, F: FnOnce() -> C>(self, f: F) -> Result<T> {
        self.map_err(|source| EnvError::Io {
            context: f().into(),
            source,
        })
    }
}
