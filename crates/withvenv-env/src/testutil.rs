//! Shared test fixtures.
#![cfg_attr(not(unix), allow(dead_code))]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::env::{BuilderOptions, EnvBuilder};
use crate::error::Result;
use crate::host::HostEnv;
use crate::stream::{Progress, StreamSource};
use crate::Fetcher;

/// A `python3` stand-in: answers `--version`, runs anything else with sh.
#[cfg(unix)]
pub fn fake_python(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    std::fs::create_dir_all(dir).unwrap();
    let p = dir.join("python3");
    std::fs::write(
        &p,
        "#!/bin/sh\nif [ \"$1\" = \"--version\" ]; then echo 'Python 3.11.4'; exit 0; fi\nexec /bin/sh \"$@\"\n",
    )
    .unwrap();
    std::fs::set_permissions(&p, std::fs::Permissions::from_mode(0o755)).unwrap();
    p
}

pub fn path_of(dirs: &[&Path]) -> String {
    std::env::join_paths(dirs).unwrap().into_string().unwrap()
}

/// Builder pinned to `python` with a minimal host environment.
pub fn builder_for(python: &Path, options: BuilderOptions) -> EnvBuilder {
    let options = BuilderOptions {
        python: Some(python.to_path_buf()),
        ..options
    };
    EnvBuilder::new(options).with_host_env(HostEnv::from_pairs([(
        "PATH",
        path_of(&[Path::new("/usr/bin"), Path::new("/bin")]),
    )]))
}

/// Collects every progress line.
#[derive(Default)]
pub struct Recorder {
    lines: Mutex<Vec<(String, StreamSource)>>,
}

impl Recorder {
    pub fn lines(&self) -> Vec<(String, StreamSource)> {
        self.lines.lock().unwrap().clone()
    }
}

impl Progress for Recorder {
    fn report(&self, line: &str, source: StreamSource) {
        self.lines.lock().unwrap().push((line.to_string(), source));
    }
}

/// "Downloads" a fixed script body regardless of URL.
pub struct ScriptFetcher {
    body: String,
}

impl ScriptFetcher {
    pub fn new(body: &str) -> Self {
        Self {
            body: body.to_string(),
        }
    }
}

impl Fetcher for ScriptFetcher {
    fn fetch(&self, _url: &str, dest: &Path) -> Result<()> {
        std::fs::write(dest, &self.body).unwrap();
        Ok(())
    }
}
