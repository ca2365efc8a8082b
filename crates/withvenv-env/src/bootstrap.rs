//! Download a bootstrap installer (e.g. `get-pip.py`) and run it inside the
//! environment.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::env::EnvContext;
use crate::error::{EnvError, Result};
use crate::host::EnvMap;
use crate::stream::{piped_command, run_streaming, Progress, StreamSource};

/// Retrieves a URL into a local file.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Plain HTTP(S) GET via `ureq`. No auth, no retry.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(read_timeout_secs: u64) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout_read(Duration::from_secs(read_timeout_secs))
            .build();
        Self { agent }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let download_err = |reason: String| EnvError::Download {
            url: url.to_string(),
            reason,
        };
        let response = self.agent.get(url).call().map_err(|e| match e {
            ureq::Error::Status(code, _) => download_err(format!("HTTP {}", code)),
            ureq::Error::Transport(t) => download_err(t.to_string()),
        })?;
        // Never write through an existing file or link.
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dest)
            .map_err(|e| EnvError::Io {
                context: format!("Create {}", dest.display()),
                source: e,
            })?;
        io::copy(&mut response.into_reader(), &mut file)
            .map_err(|e| download_err(e.to_string()))?;
        Ok(())
    }
}

/// Local file name for a downloaded installer: the URL's last path segment.
pub fn installer_file_name(url: &str) -> Result<String> {
    let invalid = |reason: &str| EnvError::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };
    let parsed = Url::parse(url).map_err(|e| invalid(&e.to_string()))?;
    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .map(str::to_string)
        .ok_or_else(|| invalid("no file name in path"))
}

/// Deletes the wrapped path when dropped, whatever happened in between.
struct RemoveOnDrop(PathBuf);

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.0) {
            Ok(()) => tracing::debug!(path = %self.0.display(), "Removed installer"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.0.display(), "Failed to remove installer: {}", e),
        }
    }
}

/// Runs installers against one activated environment.
pub struct Bootstrapper<'a> {
    context: &'a EnvContext,
    environ: &'a EnvMap,
    fetcher: &'a dyn Fetcher,
    progress: &'a dyn Progress,
}

impl<'a> Bootstrapper<'a> {
    pub fn new(
        context: &'a EnvContext,
        environ: &'a EnvMap,
        fetcher: &'a dyn Fetcher,
        progress: &'a dyn Progress,
    ) -> Self {
        Self {
            context,
            environ,
            fetcher,
            progress,
        }
    }

    /// Download `url` into the binaries folder and run it with the
    /// environment's interpreter. The downloaded file is always removed.
    pub fn install(&self, name: &str, url: &str, args: &[&str]) -> Result<()> {
        let file_name = installer_file_name(url)?;
        let dist_path = self.context.bin_path.join(&file_name);
        // The guard below deletes whatever sits at `dist_path`, so refuse
        // names that collide with the interpreter links or anything else.
        if std::fs::symlink_metadata(&dist_path).is_ok() {
            return Err(EnvError::InstallerPathTaken(dist_path));
        }
        let _cleanup = RemoveOnDrop(dist_path.clone());

        tracing::debug!(url, dist_path = %dist_path.display(), "Downloading installer");
        self.fetcher.fetch(url, &dist_path)?;

        self.progress
            .report(&format!("Installing {} ...", name), StreamSource::Main);
        withvenv_core::info_log!(name, env_exe = %self.context.env_exe.display(), "Installing");

        let cmd = piped_command(
            &self.context.env_exe,
            std::iter::once(file_name.as_str()).chain(args.iter().copied()),
            self.environ,
            &self.context.bin_path,
        );
        run_streaming(cmd, self.progress)?;

        self.progress.report("done.", StreamSource::Main);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_installer_file_name() {
        assert_eq!(
            installer_file_name("https://bootstrap.pypa.io/get-pip.py").unwrap(),
            "get-pip.py"
        );
        assert_eq!(
            installer_file_name("https://example.com/a/b/ez_setup.py?ref=x#frag").unwrap(),
            "ez_setup.py"
        );
        assert_eq!(
            installer_file_name("file:///srv/mirror/get-pip.py").unwrap(),
            "get-pip.py"
        );
    }

    #[test]
    fn test_installer_file_name_rejects_missing_segment() {
        for url in ["https://example.com/", "https://example.com/dir/", "not a url"] {
            assert!(
                matches!(installer_file_name(url), Err(EnvError::InvalidUrl { .. })),
                "{url}"
            );
        }
    }

    mod http {
        use super::super::*;
        use std::io::{Read, Write};
        use std::net::TcpListener;
        use std::thread;

        /// Answer a single request with `response`, returning the URL to fetch.
        fn serve_once(response: String) -> (String, thread::JoinHandle<()>) {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = listener.local_addr().unwrap();
            let handle = thread::spawn(move || {
                let (mut stream, _) = listener.accept().unwrap();
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = stream.read(&mut buf).unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }
                stream.write_all(response.as_bytes()).unwrap();
            });
            (format!("http://{}/get-pip.py", addr), handle)
        }

        fn response(status: &str, body: &str) -> String {
            format!(
                "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            )
        }

        #[test]
        fn test_http_fetch_writes_body() {
            let tmp = tempfile::tempdir().unwrap();
            let dest = tmp.path().join("get-pip.py");
            let body = "print('bootstrapping pip')\n";
            let (url, server) = serve_once(response("200 OK", body));

            HttpFetcher::new(5).fetch(&url, &dest).unwrap();
            server.join().unwrap();
            assert_eq!(std::fs::read_to_string(&dest).unwrap(), body);
        }

        #[test]
        fn test_http_fetch_maps_status_error() {
            let tmp = tempfile::tempdir().unwrap();
            let dest = tmp.path().join("get-pip.py");
            let (url, server) = serve_once(response("404 Not Found", "missing"));

            let err = HttpFetcher::new(5).fetch(&url, &dest).unwrap_err();
            server.join().unwrap();
            match err {
                EnvError::Download { url: u, reason } => {
                    assert_eq!(u, url);
                    assert_eq!(reason, "HTTP 404");
                }
                other => panic!("expected Download, got {:?}", other),
            }
            assert!(!dest.exists());
        }

        #[test]
        fn test_http_fetch_maps_refused_connection() {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let url = format!("http://{}/get-pip.py", listener.local_addr().unwrap());
            drop(listener);
            let tmp = tempfile::tempdir().unwrap();
            let dest = tmp.path().join("get-pip.py");

            let err = HttpFetcher::new(5).fetch(&url, &dest).unwrap_err();
            assert!(matches!(err, EnvError::Download { .. }), "{:?}", err);
            assert!(!dest.exists());
        }

        #[test]
        fn test_http_fetch_refuses_existing_dest() {
            let tmp = tempfile::tempdir().unwrap();
            let dest = tmp.path().join("get-pip.py");
            std::fs::write(&dest, "keep").unwrap();
            let (url, server) = serve_once(response("200 OK", "overwrite"));

            let err = HttpFetcher::new(5).fetch(&url, &dest).unwrap_err();
            server.join().unwrap();
            assert!(matches!(err, EnvError::Io { .. }), "{:?}", err);
            assert_eq!(std::fs::read_to_string(&dest).unwrap(), "keep");
        }
    }

    #[test]
    fn test_remove_on_drop_tolerates_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("never-written.py");
        drop(RemoveOnDrop(p.clone()));
        std::fs::write(&p, "x").unwrap();
        drop(RemoveOnDrop(p.clone()));
        assert!(!p.exists());
    }

    #[cfg(unix)]
    mod unix {
        use super::super::*;
        use crate::activation::activation_env;
        use crate::env::BuilderOptions;
        use crate::testutil::{builder_for, fake_python, Recorder, ScriptFetcher};

        fn setup(tmp: &Path) -> (EnvContext, EnvMap) {
            let py = fake_python(&tmp.join("base/bin"));
            let env = builder_for(&py, BuilderOptions::default())
                .create(tmp.join("env"))
                .unwrap();
            let ctx = env.context().clone();
            let environ = activation_env(&ctx, &crate::host::HostEnv::default()).unwrap();
            (ctx, environ)
        }

        #[test]
        fn test_install_runs_and_removes_installer() {
            let tmp = tempfile::tempdir().unwrap();
            let (ctx, environ) = setup(tmp.path());
            let fetcher = ScriptFetcher::new("echo installed-ok; pwd; echo warn 1>&2\n");
            let rec = Recorder::default();

            Bootstrapper::new(&ctx, &environ, &fetcher, &rec)
                .install("pip", "https://bootstrap.pypa.io/get-pip.py", &[])
                .unwrap();

            assert!(!ctx.bin_path.join("get-pip.py").exists());
            let lines = rec.lines();
            assert_eq!(lines[0], ("Installing pip ...".to_string(), StreamSource::Main));
            assert!(lines.contains(&("installed-ok".to_string(), StreamSource::Stdout)));
            assert!(lines.contains(&("warn".to_string(), StreamSource::Stderr)));
            // Installer runs from the binaries folder.
            let bin = ctx.bin_path.canonicalize().unwrap();
            assert!(lines.contains(&(bin.display().to_string(), StreamSource::Stdout)));
            assert_eq!(lines.last().unwrap().0, "done.");
        }

        #[test]
        fn test_install_passes_args() {
            let tmp = tempfile::tempdir().unwrap();
            let (ctx, environ) = setup(tmp.path());
            let fetcher = ScriptFetcher::new("echo \"args:$*\"\n");
            let rec = Recorder::default();
            Bootstrapper::new(&ctx, &environ, &fetcher, &rec)
                .install("pip", "https://x/get-pip.py", &["--no-setuptools", "--no-wheel"])
                .unwrap();
            assert!(rec
                .lines()
                .contains(&("args:--no-setuptools --no-wheel".to_string(), StreamSource::Stdout)));
        }

        #[test]
        fn test_failed_install_still_removes_installer() {
            let tmp = tempfile::tempdir().unwrap();
            let (ctx, environ) = setup(tmp.path());
            let fetcher = ScriptFetcher::new("echo broken 1>&2; exit 2\n");
            let rec = Recorder::default();

            let err = Bootstrapper::new(&ctx, &environ, &fetcher, &rec)
                .install("pip", "https://x/get-pip.py", &[])
                .unwrap_err();
            assert!(matches!(err, EnvError::ProcessFailed { code: Some(2), .. }));
            assert!(!ctx.bin_path.join("get-pip.py").exists());
            assert!(rec.lines().contains(&("broken".to_string(), StreamSource::Stderr)));
        }

        #[test]
        fn test_install_refuses_to_clobber_interpreter_link() {
            let tmp = tempfile::tempdir().unwrap();
            let (ctx, environ) = setup(tmp.path());
            let link = ctx.bin_path.join("python3");
            let before = std::fs::read_to_string(&ctx.executable).unwrap();
            let fetcher = ScriptFetcher::new("echo should-not-run\n");
            let rec = Recorder::default();

            let err = Bootstrapper::new(&ctx, &environ, &fetcher, &rec)
                .install("pip", "https://x/python3", &[])
                .unwrap_err();
            assert!(matches!(err, EnvError::InstallerPathTaken(ref p) if *p == link));
            assert!(std::fs::symlink_metadata(&link).is_ok());
            assert_eq!(std::fs::read_to_string(&ctx.executable).unwrap(), before);
            assert!(rec.lines().is_empty());
        }

        #[test]
        fn test_failed_download_leaves_nothing() {
            struct Partial;
            impl Fetcher for Partial {
                fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
                    std::fs::write(dest, "trunc").unwrap();
                    Err(EnvError::Download {
                        url: url.to_string(),
                        reason: "connection reset".into(),
                    })
                }
            }
            let tmp = tempfile::tempdir().unwrap();
            let (ctx, environ) = setup(tmp.path());
            let rec = Recorder::default();
            let err = Bootstrapper::new(&ctx, &environ, &Partial, &rec)
                .install("pip", "https://x/get-pip.py", &[])
                .unwrap_err();
            assert!(matches!(err, EnvError::Download { .. }));
            assert!(!ctx.bin_path.join("get-pip.py").exists());
            assert!(rec.lines().is_empty());
        }
    }
}
