//! Config structs grouped by concern, loaded from environment variables.

use super::env_keys::{installer as inst_keys, observability as obv_keys, runtime as rt_keys};
use super::loader::{env_bool, env_optional, env_or};

/// Default location of the pip bootstrap script.
pub const DEFAULT_PIP_URL: &str = "https://bootstrap.pypa.io/get-pip.py";

/// Default read timeout for the installer download.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 30;

/// Logging configuration: quiet, log_level, log_json.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| {
            super::loader::load_dotenv();
            Self {
                quiet: env_bool(obv_keys::WITHVENV_QUIET, obv_keys::QUIET_ALIASES, false),
                log_level: env_or(
                    obv_keys::WITHVENV_LOG_LEVEL,
                    obv_keys::LOG_LEVEL_ALIASES,
                    || "withvenv=info".to_string(),
                ),
                log_json: env_bool(obv_keys::WITHVENV_LOG_JSON, obv_keys::LOG_JSON_ALIASES, false),
            }
        })
    }
}

/// Package installer bootstrap settings.
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    pub pip_url: String,
    pub no_pip: bool,
    pub download_timeout_secs: u64,
}

impl InstallerConfig {
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        let download_timeout_secs = env_optional(inst_keys::WITHVENV_DOWNLOAD_TIMEOUT_SECS, &[])
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT_SECS);
        Self {
            pip_url: env_or(inst_keys::WITHVENV_PIP_URL, inst_keys::PIP_URL_ALIASES, || {
                DEFAULT_PIP_URL.to_string()
            }),
            no_pip: env_bool(inst_keys::WITHVENV_NO_PIP, &[], false),
            download_timeout_secs,
        }
    }
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            pip_url: DEFAULT_PIP_URL.to_string(),
            no_pip: false,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
        }
    }
}

/// Base runtime selection.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// Explicit interpreter path; bypasses PATH discovery outside a venv.
    pub python: Option<String>,
    pub copies: bool,
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        Self {
            python: env_optional(rt_keys::WITHVENV_PYTHON, rt_keys::PYTHON_ALIASES),
            copies: env_bool(rt_keys::WITHVENV_COPIES, &[], false),
        }
    }
}
