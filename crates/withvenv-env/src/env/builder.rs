//! Build the venv directory tree and resolve its [`EnvContext`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use withvenv_core::config::{InstallerConfig, RuntimeConfig};

use super::runtime::{discover_base_executable, query_version, RuntimeVersion};
use super::setup;
use crate::activation::CleanEnv;
use crate::bootstrap::{Fetcher, HttpFetcher};
use crate::error::{EnvError, IoContext, Result};
use crate::host::HostEnv;
use crate::stream::{Progress, StderrProgress};

/// Binaries folder name.
#[cfg(windows)]
pub const BIN_NAME: &str = "Scripts";
#[cfg(not(windows))]
pub const BIN_NAME: &str = "bin";

#[cfg(windows)]
const INCLUDE_NAME: &str = "Include";
#[cfg(not(windows))]
const INCLUDE_NAME: &str = "include";

/// Options for [`EnvBuilder`].
#[derive(Debug, Clone)]
pub struct BuilderOptions {
    /// Remove the contents of an existing target directory first.
    pub clear: bool,
    /// Give the environment access to the base interpreter's site-packages.
    pub system_site_packages: bool,
    /// Symlink the interpreter instead of copying it. Ignored on Windows.
    pub symlinks: bool,
    /// Skip setuptools and wheel when bootstrapping pip.
    pub no_setuptools: bool,
    /// Skip the pip bootstrap entirely.
    pub no_pip: bool,
    /// Delete the environment directory when the active env is dropped.
    pub remove_on_exit: bool,
    /// Where to download the pip bootstrap script from.
    pub installer_url: String,
    pub download_timeout_secs: u64,
    /// Explicit base interpreter; bypasses discovery.
    pub python: Option<PathBuf>,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        Self::from_config(&InstallerConfig::default(), &RuntimeConfig::default())
    }
}

impl BuilderOptions {
    pub fn from_config(installer: &InstallerConfig, runtime: &RuntimeConfig) -> Self {
        Self {
            clear: false,
            system_site_packages: false,
            symlinks: !cfg!(windows) && !runtime.copies,
            no_setuptools: false,
            no_pip: installer.no_pip,
            remove_on_exit: false,
            installer_url: installer.pip_url.clone(),
            download_timeout_secs: installer.download_timeout_secs,
            python: runtime.python.as_ref().map(PathBuf::from),
        }
    }

    /// Load from WITHVENV_* variables (and `.env`).
    pub fn from_env() -> Self {
        Self::from_config(&InstallerConfig::from_env(), &RuntimeConfig::from_env())
    }
}

/// Resolved paths for one environment. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvContext {
    pub env_dir: PathBuf,
    pub env_name: String,
    pub prompt: String,
    /// Base interpreter the environment was created from.
    pub executable: PathBuf,
    pub python_dir: PathBuf,
    pub python_exe: String,
    pub bin_path: PathBuf,
    pub bin_name: String,
    pub inc_path: PathBuf,
    pub lib_path: PathBuf,
    /// Interpreter inside the environment.
    pub env_exe: PathBuf,
    pub version: RuntimeVersion,
}

impl EnvContext {
    /// Field name / value pairs, in declaration order, for display.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("env_dir", self.env_dir.display().to_string()),
            ("env_name", self.env_name.clone()),
            ("prompt", self.prompt.clone()),
            ("executable", self.executable.display().to_string()),
            ("python_dir", self.python_dir.display().to_string()),
            ("python_exe", self.python_exe.clone()),
            ("bin_path", self.bin_path.display().to_string()),
            ("bin_name", self.bin_name.clone()),
            ("inc_path", self.inc_path.display().to_string()),
            ("lib_path", self.lib_path.display().to_string()),
            ("env_exe", self.env_exe.display().to_string()),
            ("version", self.version.to_string()),
        ]
    }
}

/// Creates virtual environments.
pub struct EnvBuilder {
    options: BuilderOptions,
    host: HostEnv,
    progress: Arc<dyn Progress>,
    fetcher: Arc<dyn Fetcher>,
}

impl EnvBuilder {
    pub fn new(options: BuilderOptions) -> Self {
        let fetcher = HttpFetcher::new(options.download_timeout_secs);
        Self {
            options,
            host: HostEnv::capture(),
            progress: Arc::new(StderrProgress),
            fetcher: Arc::new(fetcher),
        }
    }

    /// Replace the host environment snapshot used for discovery and activation.
    pub fn with_host_env(mut self, host: HostEnv) -> Self {
        self.host = host;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn options(&self) -> &BuilderOptions {
        &self.options
    }

    /// Create (or refresh) the environment at `env_dir` and return it ready
    /// for activation.
    pub fn create(&self, env_dir: impl AsRef<Path>) -> Result<CleanEnv> {
        let env_dir = absolutize(env_dir.as_ref())?;
        tracing::info!(env_dir = %env_dir.display(), "Creating environment");
        let context = self.ensure_directories(&env_dir)?;
        setup::write_pyvenv_cfg(&context, self.options.system_site_packages)?;
        setup::setup_python(&context, self.options.symlinks)?;
        setup::setup_scripts(&context)?;
        Ok(CleanEnv::new(
            context,
            self.host.clone(),
            self.options.clone(),
            Arc::clone(&self.progress),
            Arc::clone(&self.fetcher),
        ))
    }

    /// Create the directories for the environment and return the context
    /// describing them.
    pub fn ensure_directories(&self, env_dir: &Path) -> Result<EnvContext> {
        // Checked without following links: clearing a symlink empties its target.
        let is_real_dir = fs::symlink_metadata(env_dir)
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        if self.options.clear && is_real_dir {
            clear_directory(env_dir)?;
        }
        create_if_needed(env_dir)?;

        let env_name = env_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let prompt = format!("({}) ", env_name);

        let executable = discover_base_executable(&self.host, self.options.python.as_deref())?;
        let version = query_version(&executable, &self.host)?;
        let python_dir = executable
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let python_exe = executable
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| EnvError::NotExecutable(executable.clone()))?;

        let inc_path = env_dir.join(INCLUDE_NAME);
        let lib_path = lib_path(env_dir, &version);
        create_if_needed(&inc_path)?;
        create_if_needed(&lib_path)?;
        ensure_lib64_link(env_dir)?;

        let bin_path = env_dir.join(BIN_NAME);
        let env_exe = bin_path.join(&python_exe);
        create_if_needed(&bin_path)?;

        Ok(EnvContext {
            env_dir: env_dir.to_path_buf(),
            env_name,
            prompt,
            executable,
            python_dir,
            python_exe,
            bin_path,
            bin_name: BIN_NAME.to_string(),
            inc_path,
            lib_path,
            env_exe,
            version,
        })
    }
}

#[cfg(windows)]
fn lib_path(env_dir: &Path, _version: &RuntimeVersion) -> PathBuf {
    env_dir.join("Lib").join("site-packages")
}

#[cfg(not(windows))]
fn lib_path(env_dir: &Path, version: &RuntimeVersion) -> PathBuf {
    env_dir
        .join("lib")
        .join(format!("python{}", version.short()))
        .join("site-packages")
}

/// `lib64 -> lib` on 64-bit POSIX other than macOS.
#[cfg(all(unix, target_pointer_width = "64", not(target_os = "macos")))]
fn ensure_lib64_link(env_dir: &Path) -> Result<()> {
    let link_path = env_dir.join("lib64");
    if fs::symlink_metadata(&link_path).is_err() {
        std::os::unix::fs::symlink("lib", &link_path).with_io_context(|| {
            format!("Create lib64 link in {}", env_dir.display())
        })?;
    }
    Ok(())
}

#[cfg(not(all(unix, target_pointer_width = "64", not(target_os = "macos"))))]
fn ensure_lib64_link(_env_dir: &Path) -> Result<()> {
    Ok(())
}

/// Create `d` (and parents) unless it is already a directory. A file or
/// symlink in the way is a configuration error.
fn create_if_needed(d: &Path) -> Result<()> {
    match fs::symlink_metadata(d) {
        Ok(meta) if meta.file_type().is_symlink() || !meta.is_dir() => {
            Err(EnvError::InvalidDirectory(d.to_path_buf()))
        }
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(d).with_io_context(|| format!("Create {}", d.display()))
        }
        Err(e) => Err(EnvError::Io {
            context: format!("Inspect {}", d.display()),
            source: e,
        }),
    }
}

/// Remove everything inside `path`, keeping `path` itself.
fn clear_directory(path: &Path) -> Result<()> {
    tracing::debug!(path = %path.display(), "Clearing existing environment");
    let entries = fs::read_dir(path).with_io_context(|| format!("Read {}", path.display()))?;
    for entry in entries {
        let entry = entry.with_io_context(|| format!("Read {}", path.display()))?;
        let p = entry.path();
        let ft = entry
            .file_type()
            .with_io_context(|| format!("Inspect {}", p.display()))?;
        let removed = if ft.is_dir() {
            fs::remove_dir_all(&p)
        } else {
            fs::remove_file(&p)
        };
        removed.with_io_context(|| format!("Remove {}", p.display()))?;
    }
    Ok(())
}

fn absolutize(p: &Path) -> Result<PathBuf> {
    if p.is_absolute() {
        return Ok(p.to_path_buf());
    }
    let cwd = std::env::current_dir().io_context("Resolve current directory")?;
    Ok(cwd.join(p))
}
