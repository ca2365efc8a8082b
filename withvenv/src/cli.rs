use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use withvenv_env::BuilderOptions;

/// withvenv - run scripts in a clean, disposable Python virtual environment
#[derive(Parser, Debug)]
#[command(name = "withvenv")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Defaults to `run` with its default arguments.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build an environment, bootstrap pip and run a script inside it
    Run(RunArgs),

    /// Build an environment and print its paths (no pip, no script)
    Create {
        /// Directory of the environment to create
        #[arg(value_name = "ENV_DIR")]
        env_dir: PathBuf,

        #[command(flatten)]
        env: EnvArgs,

        /// Print the environment context as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Script to run with the environment's interpreter
    #[arg(value_name = "SCRIPT", default_value = "test_articulation.py")]
    pub script: PathBuf,

    /// Arguments passed to the script (after `--`)
    #[arg(value_name = "ARGS", last = true)]
    pub args: Vec<String>,

    /// Directory of the environment to create
    #[arg(long, value_name = "DIR", default_value = "foo")]
    pub env_dir: PathBuf,

    #[command(flatten)]
    pub env: EnvArgs,

    /// Print the environment context as JSON
    #[arg(long)]
    pub json: bool,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            script: PathBuf::from("test_articulation.py"),
            args: Vec::new(),
            env_dir: PathBuf::from("foo"),
            env: EnvArgs::default(),
            json: false,
        }
    }
}

/// Options shared by every command that builds an environment.
/// Unset flags fall back to WITHVENV_* configuration.
#[derive(Args, Debug, Default)]
pub struct EnvArgs {
    /// Delete the contents of the environment directory if it already exists
    #[arg(long)]
    pub clear: bool,

    /// Do not bootstrap pip into the environment
    #[arg(long)]
    pub no_pip: bool,

    /// Bootstrap pip without setuptools and wheel
    #[arg(long)]
    pub no_setuptools: bool,

    /// Copy the interpreter instead of symlinking it
    #[arg(long)]
    pub copies: bool,

    /// Give the environment access to the system site-packages
    #[arg(long)]
    pub system_site_packages: bool,

    /// URL of the pip bootstrap script (default: from env or get-pip.py)
    #[arg(long, value_name = "URL", env = "WITHVENV_PIP_URL")]
    pub installer_url: Option<String>,

    /// Base interpreter to build from (default: from env or PATH discovery)
    #[arg(long, value_name = "PATH", env = "WITHVENV_PYTHON")]
    pub python: Option<PathBuf>,

    /// Remove the environment directory once the script has finished
    #[arg(long)]
    pub remove_on_exit: bool,
}

impl EnvArgs {
    /// Apply CLI flags on top of configuration-derived options.
    pub fn apply(&self, mut opts: BuilderOptions) -> BuilderOptions {
        opts.clear |= self.clear;
        opts.no_pip |= self.no_pip;
        opts.no_setuptools |= self.no_setuptools;
        opts.system_site_packages |= self.system_site_packages;
        opts.remove_on_exit |= self.remove_on_exit;
        if self.copies {
            opts.symlinks = false;
        }
        if let Some(ref url) = self.installer_url {
            opts.installer_url = url.clone();
        }
        if let Some(ref python) = self.python {
            opts.python = Some(python.clone());
        }
        opts
    }
}
