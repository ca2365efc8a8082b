//! Disposable Python virtual environments.
//!
//! [`env::EnvBuilder`] lays out the directory tree and links the base
//! interpreter, [`activation::CleanEnv::activate`] derives the child
//! environment and bootstraps pip, and [`activation::ActiveEnv`] runs scripts
//! with streamed output.

pub mod activation;
pub mod bootstrap;
pub mod env;
pub mod error;
pub mod host;
pub mod stream;

#[cfg(test)]
pub(crate) mod testutil;

pub use activation::{activation_env, ActiveEnv, CleanEnv};
pub use bootstrap::{installer_file_name, Bootstrapper, Fetcher, HttpFetcher};
pub use env::{BuilderOptions, EnvBuilder, EnvContext, RuntimeVersion};
pub use error::{EnvError, Result};
pub use host::{EnvMap, HostEnv};
pub use stream::{Progress, StderrProgress, StreamSource};
