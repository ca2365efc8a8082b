//! Centralised environment variable loading.
//!
//! Keeps the fallback chains in one place so callers never repeat
//! `or_else` ladders around `std::env::var`.

use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use std::sync::{OnceLock, PoisonError, RwLock};

/// Load `.env` from the current directory into the config lookup table.
/// Runs at most once. The process environment is never modified, so values
/// from `.env` reach config lookups but not child processes.
pub fn load_dotenv() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let dir = env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
        load_dotenv_from(&dir);
    });
}

/// Merge `<dir>/.env` into the config lookup table. Keys already in the
/// table keep their first value.
pub fn load_dotenv_from(dir: &Path) {
    let pairs = read_dotenv(dir);
    if pairs.is_empty() {
        return;
    }
    let mut table = dotenv_table()
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    for (key, value) in pairs {
        table.entry(key).or_insert(value);
    }
}

fn dotenv_table() -> &'static RwLock<BTreeMap<String, String>> {
    static TABLE: OnceLock<RwLock<BTreeMap<String, String>>> = OnceLock::new();
    TABLE.get_or_init(Default::default)
}

/// Process environment first, then values loaded from `.env`.
fn lookup(key: &str) -> Option<String> {
    env::var(key).ok().or_else(|| {
        dotenv_table()
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    })
}

/// Parse `<dir>/.env` into key/value pairs. Missing file yields nothing.
pub fn read_dotenv(dir: &Path) -> Vec<(String, String)> {
    let Ok(content) = std::fs::read_to_string(dir.join(".env")) else {
        return Vec::new();
    };
    content.lines().filter_map(parse_dotenv_line).collect()
}

fn parse_dotenv_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let mut value = value.trim();
    // Strip inline comment (# not inside quotes)
    if let Some(hash_pos) = value.find('#') {
        let before_hash = value[..hash_pos].trim_end();
        if !before_hash.contains('"') && !before_hash.contains('\'') {
            value = before_hash;
        }
    }
    if value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
    {
        value = &value[1..value.len() - 1];
    }
    if key.is_empty() {
        None
    } else {
        Some((key.to_string(), value.to_string()))
    }
}

/// Read the primary variable or the first set alias, else the default.
pub fn env_or<F>(primary: &str, aliases: &[&str], default: F) -> String
where
    F: FnOnce() -> String,
{
    lookup(primary).or_else(|| aliases.iter().find_map(|a| lookup(a)))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(default)
}

/// Read the primary variable or an alias; empty values count as unset.
pub fn env_optional(primary: &str, aliases: &[&str]) -> Option<String> {
    lookup(primary).or_else(|| aliases.iter().find_map(|a| lookup(a)))
        .and_then(|s| {
            let s = s.trim().to_string();
            if s.is_empty() {
                None
            } else {
                Some(s)
            }
        })
}

/// Boolean variable: `0/false/no/off` are false, any other value is true.
pub fn env_bool(primary: &str, aliases: &[&str], default: bool) -> bool {
    let v = lookup(primary).or_else(|| aliases.iter().find_map(|a| lookup(a)));
    match v.as_deref() {
        Some(s) => parse_bool(s),
        None => default,
    }
}

pub(crate) fn parse_bool(s: &str) -> bool {
    !matches!(s.trim().to_lowercase().as_str(), "0" | "false" | "no" | "off")
}
