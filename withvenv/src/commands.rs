//! Command implementations behind the CLI.

use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use withvenv_env::{BuilderOptions, EnvBuilder, EnvContext};

use crate::cli::{EnvArgs, RunArgs};

fn builder(env: &EnvArgs) -> EnvBuilder {
    let options = env.apply(BuilderOptions::from_env());
    tracing::debug!(
        clear = options.clear,
        no_pip = options.no_pip,
        no_setuptools = options.no_setuptools,
        symlinks = options.symlinks,
        python = ?options.python,
        "Resolved builder options"
    );
    EnvBuilder::new(options)
}

/// Build the environment only and print its context.
pub fn create(env_dir: &Path, env: &EnvArgs, json: bool) -> Result<()> {
    let clean = builder(env)
        .create(env_dir)
        .with_context(|| format!("Failed to create environment at {}", env_dir.display()))?;
    print_context(clean.context(), json)
}

/// Build, activate (bootstrapping pip) and run the script inside.
pub fn run(args: &RunArgs) -> Result<()> {
    let clean = builder(&args.env)
        .create(&args.env_dir)
        .with_context(|| format!("Failed to create environment at {}", args.env_dir.display()))?;
    let active = clean.activate().context("Failed to activate environment")?;
    print_context(active.context(), args.json)?;
    active
        .run_in_env_with_args(&args.script, &args.args)
        .with_context(|| format!("Script {} failed", args.script.display()))?;
    withvenv_core::info_log!(
        script = %args.script.display(),
        env_dir = %active.context().env_dir.display(),
        "Run complete"
    );
    Ok(())
}

fn print_context(ctx: &EnvContext, json: bool) -> Result<()> {
    let mut out = io::stdout().lock();
    if json {
        let s = serde_json::to_string_pretty(ctx).context("Serialize environment context")?;
        writeln!(out, "{}", s)?;
    } else {
        for (key, value) in ctx.fields() {
            writeln!(out, "{}: {}", key, value)?;
        }
    }
    out.flush()?;
    Ok(())
}
