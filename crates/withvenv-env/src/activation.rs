//! Activation: the derived child environment, pip bootstrap and running
//! scripts inside a built environment.

use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use withvenv_core::config::env_keys::python as py_keys;

use crate::bootstrap::{Bootstrapper, Fetcher};
use crate::env::{BuilderOptions, EnvContext};
use crate::error::{IoContext, Result};
use crate::host::{EnvMap, HostEnv};
use crate::stream::{piped_command, run_streaming, Progress};

/// Variables for processes run inside the environment: the host's, with
/// `VIRTUAL_ENV` pointing at the environment, its binaries folder first on
/// PATH (entries of any outer venv dropped) and `PYTHONHOME` removed.
pub fn activation_env(ctx: &EnvContext, host: &HostEnv) -> Result<EnvMap> {
    let mut environ = host.vars().clone();

    let mut entries = vec![ctx.bin_path.clone()];
    entries.extend(host.base_search_path());
    let path = std::env::join_paths(entries)?;

    environ.insert(
        OsString::from(py_keys::VIRTUAL_ENV),
        ctx.env_dir.clone().into_os_string(),
    );
    environ.insert(OsString::from(py_keys::PATH), path);
    if environ.remove(OsStr::new(py_keys::PYTHONHOME)).is_some() {
        tracing::debug!("Dropped PYTHONHOME from the child environment");
    }
    Ok(environ)
}

/// A built environment that has not been activated yet.
pub struct CleanEnv {
    context: EnvContext,
    host: HostEnv,
    options: BuilderOptions,
    progress: Arc<dyn Progress>,
    fetcher: Arc<dyn Fetcher>,
}

impl std::fmt::Debug for CleanEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanEnv")
            .field("context", &self.context)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl CleanEnv {
    pub(crate) fn new(
        context: EnvContext,
        host: HostEnv,
        options: BuilderOptions,
        progress: Arc<dyn Progress>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            context,
            host,
            options,
            progress,
            fetcher,
        }
    }

    pub fn context(&self) -> &EnvContext {
        &self.context
    }

    /// Enter the environment: derive the child variables and bootstrap pip
    /// unless disabled. The returned guard is the scope of the activation.
    pub fn activate(self) -> Result<ActiveEnv> {
        let environ = activation_env(&self.context, &self.host)?;
        let active = ActiveEnv {
            inner: self,
            environ,
        };
        if active.inner.options.no_pip {
            tracing::debug!("Skipping pip bootstrap");
        } else {
            let url = active.inner.options.installer_url.clone();
            let args: &[&str] = if active.inner.options.no_setuptools {
                &["--no-setuptools", "--no-wheel"]
            } else {
                &[]
            };
            active.install_script("pip", &url, args)?;
        }
        Ok(active)
    }
}

/// An activated environment. Dropping it leaves the scope; with
/// `remove_on_exit` the environment directory is deleted as well.
pub struct ActiveEnv {
    inner: CleanEnv,
    environ: EnvMap,
}

impl std::fmt::Debug for ActiveEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveEnv")
            .field("env_dir", &self.inner.context.env_dir)
            .finish_non_exhaustive()
    }
}

impl ActiveEnv {
    pub fn context(&self) -> &EnvContext {
        &self.inner.context
    }

    /// Variables passed to every child process.
    pub fn environ(&self) -> &EnvMap {
        &self.environ
    }

    /// Download an installer script and run it in the environment.
    pub fn install_script(&self, name: &str, url: &str, args: &[&str]) -> Result<()> {
        Bootstrapper::new(
            &self.inner.context,
            &self.environ,
            self.inner.fetcher.as_ref(),
            self.inner.progress.as_ref(),
        )
        .install(name, url, args)
    }

    /// Run `script` with the environment's interpreter from the current
    /// directory, streaming its output. A non-zero exit is an error.
    pub fn run_in_env(&self, script: impl AsRef<Path>) -> Result<()> {
        self.run_in_env_with_args(script, Vec::<&OsStr>::new())
    }

    pub fn run_in_env_with_args<I, S>(&self, script: impl AsRef<Path>, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let script = script.as_ref();
        let cwd = std::env::current_dir().io_context("Resolve current directory")?;
        let mut cmd = piped_command(
            &self.inner.context.env_exe,
            [script.as_os_str()],
            &self.environ,
            &cwd,
        );
        cmd.args(args);

        withvenv_core::info_log!(script = %script.display(), "Running in environment");
        let started = Instant::now();
        let result = run_streaming(cmd, self.inner.progress.as_ref());
        tracing::debug!(
            script = %script.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "Script finished"
        );
        result.map(|_| ())
    }
}

impl Drop for ActiveEnv {
    fn drop(&mut self) {
        let env_dir = &self.inner.context.env_dir;
        if !self.inner.options.remove_on_exit {
            tracing::debug!(env_dir = %env_dir.display(), "Leaving environment in place");
            return;
        }
        match std::fs::remove_dir_all(env_dir) {
            Ok(()) => withvenv_core::info_log!(env_dir = %env_dir.display(), "Removed environment"),
            Err(e) => tracing::warn!(env_dir = %env_dir.display(), "Failed to remove environment: {}", e),
        }
    }
}
