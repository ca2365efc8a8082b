//! Snapshot of the invoking process's environment variables.
//!
//! Discovery and activation read from a `HostEnv` rather than the live
//! process table, and children receive an explicitly derived copy.

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use withvenv_core::config::env_keys::python as py_keys;

/// Variable table handed to child processes. Values need not be UTF-8.
pub type EnvMap = BTreeMap<OsString, OsString>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostEnv {
    vars: EnvMap,
}

impl HostEnv {
    /// Capture the current process environment as-is.
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars_os().collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get_os(&self, key: &str) -> Option<&OsStr> {
        self.vars.get(OsStr::new(key)).map(OsString::as_os_str)
    }

    /// UTF-8 view of a variable; `None` if unset or not valid UTF-8.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_os(key).and_then(OsStr::to_str)
    }

    pub fn vars(&self) -> &EnvMap {
        &self.vars
    }

    /// Root of the virtual environment the invoker is running in, if any.
    pub fn active_venv(&self) -> Option<&Path> {
        self.get_os(py_keys::VIRTUAL_ENV)
            .filter(|v| !v.to_string_lossy().trim().is_empty())
            .map(Path::new)
    }

    /// PATH entries in order. Empty entries are dropped.
    pub fn search_path(&self) -> Vec<PathBuf> {
        self.get_os(py_keys::PATH)
            .map(|p| {
                std::env::split_paths(p)
                    .filter(|e| !e.as_os_str().is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// PATH with every entry that lives under the active venv removed.
    pub fn base_search_path(&self) -> Vec<PathBuf> {
        let entries = self.search_path();
        match self.active_venv() {
            Some(venv) => entries
                .into_iter()
                .filter(|e| !e.starts_with(venv))
                .collect(),
            None => entries,
        }
    }
}
