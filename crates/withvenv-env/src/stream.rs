//! Streaming child output to a progress sink.
//!
//! Both pipes are read in their own thread *while* the child runs. Without
//! this, a child writing more than a pipe buffer (~64KB) to either stream
//! blocks on write and `wait` never returns.

use std::ffi::OsStr;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;

use crate::error::{EnvError, Result};
use crate::host::EnvMap;

/// Where a progress line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSource {
    /// Emitted by withvenv itself (e.g. "Installing pip ...").
    Main,
    Stdout,
    Stderr,
}

/// Receives progress lines. Implementations are called from reader threads.
pub trait Progress: Send + Sync {
    fn report(&self, line: &str, source: StreamSource);
}

impl<F> Progress for F
where
    F: Fn(&str, StreamSource) + Send + Sync,
{
    fn report(&self, line: &str, source: StreamSource) {
        self(line, source)
    }
}

/// Default sink: every line goes to the invoker's stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrProgress;

impl Progress for StderrProgress {
    fn report(&self, line: &str, _source: StreamSource) {
        let mut err = io::stderr().lock();
        let _ = writeln!(err, "{}", line);
        let _ = err.flush();
    }
}

/// Build a command with piped output, an explicit environment and its own
/// process group.
pub fn piped_command<I, S>(
    program: &Path,
    args: I,
    environ: &EnvMap,
    cwd: &Path,
) -> Command
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .env_clear()
        .envs(environ)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    new_process_group(&mut cmd);
    cmd
}

#[cfg(unix)]
fn new_process_group(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(windows)]
fn new_process_group(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    cmd.creation_flags(CREATE_NEW_PROCESS_GROUP);
}

#[cfg(not(any(unix, windows)))]
fn new_process_group(_cmd: &mut Command) {}

/// Spawn `cmd`, stream its output and fail on a non-zero exit.
pub fn run_streaming(mut cmd: Command, progress: &dyn Progress) -> Result<ExitStatus> {
    let program = Path::new(cmd.get_program()).to_path_buf();
    let mut child = cmd.spawn().map_err(|source| EnvError::Spawn {
        program: program.clone(),
        source,
    })?;
    let status = drain_child(&mut child, progress).map_err(|source| EnvError::Io {
        context: format!("Wait for {}", program.display()),
        source,
    })?;
    if !status.success() {
        return Err(EnvError::ProcessFailed {
            program,
            code: status.code(),
        });
    }
    Ok(status)
}

/// Forward both output streams line by line until the child exits.
///
/// Readers start before the wait and are joined before the status is
/// returned, so every line has reached `progress` when this returns.
pub fn drain_child(child: &mut Child, progress: &dyn Progress) -> io::Result<ExitStatus> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    thread::scope(|s| {
        let out = stdout.map(|p| s.spawn(move || forward_lines(p, StreamSource::Stdout, progress)));
        let err = stderr.map(|p| s.spawn(move || forward_lines(p, StreamSource::Stderr, progress)));
        let status = child.wait();
        for handle in [out, err].into_iter().flatten() {
            if handle.join().is_err() {
                tracing::warn!("Output reader thread panicked");
            }
        }
        status
    })
}

fn forward_lines<R: Read>(pipe: R, source: StreamSource, progress: &dyn Progress) {
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                while matches!(buf.last(), Some(b'\n' | b'\r')) {
                    buf.pop();
                }
                progress.report(&String::from_utf8_lossy(&buf), source);
            }
            Err(e) => {
                tracing::debug!(?source, "Stopped reading child output: {}", e);
                break;
            }
        }
    }
}
