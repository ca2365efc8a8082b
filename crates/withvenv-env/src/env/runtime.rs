//! Base interpreter discovery and version query.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use withvenv_core::config::env_keys::python as py_keys;

use crate::error::{EnvError, Result};
use crate::host::HostEnv;

/// Interpreter name searched for on PATH.
#[cfg(windows)]
pub const BASE_EXECUTABLE_NAMES: &[&str] = &["python.exe"];
#[cfg(not(windows))]
pub const BASE_EXECUTABLE_NAMES: &[&str] = &["python3", "python"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct RuntimeVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl RuntimeVersion {
    /// `X.Y`, as embedded in `lib/pythonX.Y`.
    pub fn short(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }

    /// Parse `python --version` output such as `Python 3.12.1` or `Python 3.13.0rc1`.
    pub fn parse(output: &str) -> Option<Self> {
        static RE: OnceLock<Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            Regex::new(r"Python\s+(\d+)\.(\d+)(?:\.(\d+))?").expect("static regex")
        });
        let caps = re.captures(output)?;
        Some(Self {
            major: caps[1].parse().ok()?,
            minor: caps[2].parse().ok()?,
            patch: caps.get(3).map_or(Some(0), |m| m.as_str().parse().ok())?,
        })
    }
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Run `<program> --version` with the host environment and parse the result.
/// Python 2 prints the version on stderr, so both streams are checked.
pub fn query_version(program: &Path, host: &HostEnv) -> Result<RuntimeVersion> {
    let out = Command::new(program)
        .arg("--version")
        .env_clear()
        .envs(host.vars())
        .output()
        .map_err(|e| EnvError::Version {
            program: program.to_path_buf(),
            reason: e.to_string(),
        })?;
    if !out.status.success() {
        return Err(EnvError::Version {
            program: program.to_path_buf(),
            reason: format!("--version exited with {}", out.status),
        });
    }
    let text = format!(
        "{}\n{}",
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    RuntimeVersion::parse(&text).ok_or_else(|| EnvError::Version {
        program: program.to_path_buf(),
        reason: format!("unrecognised output '{}'", text.trim()),
    })
}

/// Pick the interpreter new environments are based on.
///
/// An explicit `preferred` path always wins. Inside an active venv the PATH
/// is scanned with every entry under that venv removed, and finding nothing
/// is fatal. Otherwise the macOS launcher override is honoured before a
/// plain PATH lookup.
pub fn discover_base_executable(host: &HostEnv, preferred: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = preferred {
        return ensure_runnable(absolutize(p)).map(|p| {
            tracing::debug!(executable = %p.display(), "Using explicit base executable");
            p
        });
    }

    if let Some(venv) = host.active_venv() {
        tracing::debug!(venv = %venv.display(), "Running inside a venv; searching outside it");
        return search(host.base_search_path()).ok_or(EnvError::NoBaseExecutable);
    }

    if cfg!(target_os = "macos") {
        if let Some(launcher) = host.get(py_keys::PYVENV_LAUNCHER).filter(|v| !v.is_empty()) {
            return ensure_runnable(absolutize(Path::new(launcher)));
        }
    }

    search(host.search_path()).ok_or(EnvError::NoBaseExecutable)
}

fn search(entries: Vec<PathBuf>) -> Option<PathBuf> {
    if entries.is_empty() {
        return None;
    }
    let joined = std::env::join_paths(&entries).ok()?;
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    BASE_EXECUTABLE_NAMES
        .iter()
        .find_map(|name| which::which_in(name, Some(&joined), &cwd).ok())
        .map(absolutize)
}

fn absolutize(p: impl AsRef<Path>) -> PathBuf {
    let p = p.as_ref();
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|d| d.join(p))
            .unwrap_or_else(|_| p.to_path_buf())
    }
}

fn ensure_runnable(p: PathBuf) -> Result<PathBuf> {
    if is_runnable(&p) {
        Ok(p)
    } else {
        Err(EnvError::NotExecutable(p))
    }
}

/// A regular file (after following links) with an execute bit on unix.
pub fn is_runnable(p: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(p) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}
