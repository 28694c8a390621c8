//! Test doubles and fixtures shared by the end-to-end tests

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use devloop_core::{Config, Invocation, Outcome, ProcessRunner, ProjectPaths};
use tempfile::TempDir;
use tokio::sync::Notify;

/// What the fake compiler writes for a host binary: a long-running process
pub const HOST_SCRIPT: &str = "#!/bin/sh\nexec sleep 600\n";

/// A compiler stand-in that records every invocation.
///
/// Successful runs write the `-o` output: plugin artifacts get placeholder
/// bytes, anything else gets [`HOST_SCRIPT`] made executable.
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<Invocation>>,
    failing: Mutex<Vec<String>>,
    delay: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    skip_outputs: AtomicBool,
    called: Notify,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every run with an argument containing `needle`
    pub fn fail_when(&self, needle: &str) {
        self.failing.lock().unwrap().push(needle.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing.lock().unwrap().clear();
    }

    /// Report success without writing the `-o` output
    pub fn skip_outputs(&self, skip: bool) {
        self.skip_outputs.store(skip, Ordering::SeqCst);
    }

    /// Make every run take at least `delay`
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// The highest number of runs that were in progress at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Wait until at least `count` runs have started
    pub async fn wait_for_calls(&self, count: usize, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.called.notified();
                if self.call_count() >= count {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }

    fn should_fail(&self, invocation: &Invocation) -> bool {
        let failing = self.failing.lock().unwrap();
        invocation
            .args
            .iter()
            .any(|arg| failing.iter().any(|needle| arg.contains(needle.as_str())))
    }
}

#[async_trait]
impl ProcessRunner for RecordingRunner {
    async fn run(&self, invocation: &Invocation) -> Outcome {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().unwrap().push(invocation.clone());
        self.called.notify_waiters();

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let outcome = if self.should_fail(invocation) {
            Outcome::CompilerFailure { code: Some(1) }
        } else if self.skip_outputs.load(Ordering::SeqCst) {
            Outcome::Success
        } else {
            match output_of(invocation) {
                Some(output) => match write_output(&output) {
                    Ok(()) => Outcome::Success,
                    Err(e) => Outcome::SpawnFailure {
                        cause: e.to_string(),
                    },
                },
                None => Outcome::Success,
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}

fn output_of(invocation: &Invocation) -> Option<PathBuf> {
    let position = invocation.args.iter().position(|arg| arg == "-o")?;
    invocation.args.get(position + 1).map(PathBuf::from)
}

fn write_output(output: &Path) -> std::io::Result<()> {
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    if output.extension().is_some_and(|ext| ext == "so") {
        return fs::write(output, b"artifact");
    }
    write_host_script(output)
}

/// Write [`HOST_SCRIPT`] to `path` as an executable, replacing the file atomically
pub fn write_host_script(path: &Path) -> std::io::Result<()> {
    let staged = path.with_extension("tmp");
    fs::write(&staged, HOST_SCRIPT)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&staged, fs::Permissions::from_mode(0o755))?;
    }
    fs::rename(&staged, path)
}

/// Whether a process with `pid` exists
#[cfg(unix)]
pub fn pid_alive(pid: u32) -> bool {
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stderr(std::process::Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// A throwaway project with the default layout
pub struct TestProject {
    pub dir: TempDir,
    pub config: Config,
    pub paths: ProjectPaths,
}

impl TestProject {
    /// Creates the source roots, both asset trees and an empty modules root
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let dir = TempDir::new().unwrap();
        let paths = ProjectPaths::resolve(&config, dir.path());

        for root in &paths.source_roots {
            fs::create_dir_all(root).unwrap();
        }
        for tree in &paths.assets {
            fs::create_dir_all(&tree.source).unwrap();
        }
        fs::create_dir_all(&paths.modules_root).unwrap();

        let project = Self { dir, config, paths };
        project.write("application/main.go", "package main\n");
        project
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Write `contents` to a project-relative path, creating parents
    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    pub fn add_module(&self, name: &str) -> PathBuf {
        self.write(&format!("contrib/{name}/{name}.go"), "package main\n")
            .parent()
            .map(Path::to_path_buf)
            .unwrap()
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}
