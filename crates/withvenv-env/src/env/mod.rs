//! Virtual environment layout: directory builder, interpreter discovery and
//! post-build setup.
//!
//! Callers get an [`EnvContext`] describing every resolved path; activation
//! and script execution live in [`crate::activation`].

pub mod builder;
pub mod runtime;
pub mod setup;

pub use builder::{BuilderOptions, EnvBuilder, EnvContext, BIN_NAME};
pub use runtime::{discover_base_executable, query_version, RuntimeVersion};
