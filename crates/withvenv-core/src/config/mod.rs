//! withvenv configuration layer
//!
//! All environment variable reads are concentrated here; other crates access
//! structured config instead of calling `std::env::var` directly. The one
//! exception is `HostEnv` in withvenv-env, which snapshots the whole table
//! to derive child environments.
//!
//! - `loader`: env_or, env_optional, env_bool, .env loading
//! - `schema`: ObservabilityConfig, InstallerConfig, RuntimeConfig
//! - `env_keys`: key constants

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{env_bool, env_optional, env_or, load_dotenv, load_dotenv_from};
pub use schema::{
    InstallerConfig, ObservabilityConfig, RuntimeConfig, DEFAULT_DOWNLOAD_TIMEOUT_SECS,
    DEFAULT_PIP_URL,
};
