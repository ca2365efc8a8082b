//! Environment variable keys and aliases.
//!
//! Primary variables use the `WITHVENV_*` prefix; a few well-known variables
//! owned by Python itself are listed under [`python`].

/// Variables read from (or written for) the Python runtime.
pub mod python {
    /// Marker set by an activated virtual environment; holds its root.
    pub const VIRTUAL_ENV: &str = "VIRTUAL_ENV";
    /// Search path for executables.
    pub const PATH: &str = "PATH";
    /// Interpreter home override; must not leak into the isolated environment.
    pub const PYTHONHOME: &str = "PYTHONHOME";
    /// Executable override set by the macOS framework launcher.
    pub const PYVENV_LAUNCHER: &str = "__PYVENV_LAUNCHER__";
}

/// Base runtime selection.
pub mod runtime {
    /// Explicit base interpreter for new environments.
    pub const WITHVENV_PYTHON: &str = "WITHVENV_PYTHON";
    pub const PYTHON_ALIASES: &[&str] = &["WITHVENV_BASE_PYTHON"];

    /// Create the environment with copies instead of symlinks.
    pub const WITHVENV_COPIES: &str = "WITHVENV_COPIES";
}

/// Bootstrap installer download.
pub mod installer {
    pub const WITHVENV_PIP_URL: &str = "WITHVENV_PIP_URL";
    pub const PIP_URL_ALIASES: &[&str] = &["GET_PIP_URL"];

    pub const WITHVENV_NO_PIP: &str = "WITHVENV_NO_PIP";

    /// Read timeout for the download, seconds.
    pub const WITHVENV_DOWNLOAD_TIMEOUT_SECS: &str = "WITHVENV_DOWNLOAD_TIMEOUT_SECS";
}

/// Observability and logging.
pub mod observability {
    pub const WITHVENV_QUIET: &str = "WITHVENV_QUIET";
    pub const QUIET_ALIASES: &[&str] = &[];

    pub const WITHVENV_LOG_LEVEL: &str = "WITHVENV_LOG_LEVEL";
    pub const LOG_LEVEL_ALIASES: &[&str] = &[];

    pub const WITHVENV_LOG_JSON: &str = "WITHVENV_LOG_JSON";
    pub const LOG_JSON_ALIASES: &[&str] = &[];
}
