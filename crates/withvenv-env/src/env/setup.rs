//! Populate a freshly laid out environment: `pyvenv.cfg`, the interpreter
//! inside `bin/`, and the POSIX `activate` script.

use std::fs;
use std::path::Path;

use super::builder::EnvContext;
use crate::error::{IoContext, Result};

pub const PYVENV_CFG: &str = "pyvenv.cfg";

const ACTIVATE_TEMPLATE: &str = r#"# This file must be used with "source bin/activate" *from bash or zsh*
# you cannot run it directly

deactivate () {
    if [ -n "${_OLD_VIRTUAL_PATH:-}" ] ; then
        PATH="${_OLD_VIRTUAL_PATH:-}"
        export PATH
        unset _OLD_VIRTUAL_PATH
    fi
    if [ -n "${_OLD_VIRTUAL_PYTHONHOME:-}" ] ; then
        PYTHONHOME="${_OLD_VIRTUAL_PYTHONHOME:-}"
        export PYTHONHOME
        unset _OLD_VIRTUAL_PYTHONHOME
    fi
    hash -r 2> /dev/null
    if [ -n "${_OLD_VIRTUAL_PS1:-}" ] ; then
        PS1="${_OLD_VIRTUAL_PS1:-}"
        export PS1
        unset _OLD_VIRTUAL_PS1
    fi
    unset VIRTUAL_ENV
    unset VIRTUAL_ENV_PROMPT
    if [ ! "${1:-}" = "nondestructive" ] ; then
        unset -f deactivate
    fi
}

deactivate nondestructive

VIRTUAL_ENV="__VENV_DIR__"
export VIRTUAL_ENV

_OLD_VIRTUAL_PATH="$PATH"
PATH="$VIRTUAL_ENV/__VENV_BIN_NAME__:$PATH"
export PATH

if [ -n "${PYTHONHOME:-}" ] ; then
    _OLD_VIRTUAL_PYTHONHOME="${PYTHONHOME:-}"
    unset PYTHONHOME
fi

if [ -z "${VIRTUAL_ENV_DISABLE_PROMPT:-}" ] ; then
    _OLD_VIRTUAL_PS1="${PS1:-}"
    PS1="__VENV_PROMPT__${PS1:-}"
    export PS1
    VIRTUAL_ENV_PROMPT="__VENV_PROMPT__"
    export VIRTUAL_ENV_PROMPT
fi

hash -r 2> /dev/null
"#;

/// Write `pyvenv.cfg`, which the interpreter uses to find its home.
pub fn write_pyvenv_cfg(ctx: &EnvContext, system_site_packages: bool) -> Result<()> {
    let body = format!(
        "home = {}\ninclude-system-site-packages = {}\nversion = {}\nexecutable = {}\n",
        ctx.python_dir.display(),
        system_site_packages,
        ctx.version,
        ctx.executable.display(),
    );
    let path = ctx.env_dir.join(PYVENV_CFG);
    fs::write(&path, body).with_io_context(|| format!("Write {}", path.display()))
}

/// Put the base interpreter into the binaries folder under its own name and
/// the usual aliases. Existing entries are replaced.
pub fn setup_python(ctx: &EnvContext, symlinks: bool) -> Result<()> {
    for name in interpreter_names(ctx) {
        let dest = ctx.bin_path.join(&name);
        if fs::symlink_metadata(&dest).is_ok() {
            fs::remove_file(&dest).with_io_context(|| format!("Replace {}", dest.display()))?;
        }
        link_or_copy(&ctx.executable, &dest, symlinks)?;
    }
    tracing::debug!(env_exe = %ctx.env_exe.display(), symlinks, "Interpreter installed");
    Ok(())
}

#[cfg(windows)]
fn interpreter_names(ctx: &EnvContext) -> Vec<String> {
    let mut names = vec![ctx.python_exe.clone()];
    if !names.iter().any(|n| n.eq_ignore_ascii_case("python.exe")) {
        names.push("python.exe".to_string());
    }
    names
}

#[cfg(not(windows))]
fn interpreter_names(ctx: &EnvContext) -> Vec<String> {
    let mut names = vec![ctx.python_exe.clone()];
    for alias in [
        "python".to_string(),
        format!("python{}", ctx.version.major),
        format!("python{}", ctx.version.short()),
    ] {
        if !names.contains(&alias) {
            names.push(alias);
        }
    }
    names
}

#[cfg(unix)]
fn link_or_copy(src: &Path, dest: &Path, symlinks: bool) -> Result<()> {
    if symlinks {
        std::os::unix::fs::symlink(src, dest)
            .with_io_context(|| format!("Link {} -> {}", dest.display(), src.display()))
    } else {
        copy(src, dest)
    }
}

#[cfg(not(unix))]
fn link_or_copy(src: &Path, dest: &Path, _symlinks: bool) -> Result<()> {
    copy(src, dest)
}

fn copy(src: &Path, dest: &Path) -> Result<()> {
    fs::copy(src, dest)
        .map(|_| ())
        .with_io_context(|| format!("Copy {} -> {}", src.display(), dest.display()))
}

/// Write `bin/activate` for interactive use of the environment.
pub fn setup_scripts(ctx: &EnvContext) -> Result<()> {
    if cfg!(windows) {
        return Ok(());
    }
    let path = ctx.bin_path.join("activate");
    fs::write(&path, render_activate(ctx)).with_io_context(|| format!("Write {}", path.display()))
}

fn render_activate(ctx: &EnvContext) -> String {
    ACTIVATE_TEMPLATE
        .replace("__VENV_DIR__", &ctx.env_dir.display().to_string())
        .replace("__VENV_BIN_NAME__", &ctx.bin_name)
        .replace("__VENV_PROMPT__", &ctx.prompt)
}
