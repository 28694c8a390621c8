//! Lifecycle of the supervised host process

use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

use crate::{
    config::{Config, ProjectPaths},
    error::{Error, Result},
};

/// How to launch the host. Every restart reuses the same settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub env: Vec<(String, String)>,
}

impl HostSpec {
    /// The built host binary, run inside the staging tree with the development
    /// environment and the staging directory exported.
    pub fn from_config(config: &Config, paths: &ProjectPaths) -> Self {
        let mut env: Vec<(String, String)> = config
            .host
            .dev_env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        env.push((
            config.host.staging_env_var.clone(),
            paths.staging_dir.to_string_lossy().into_owned(),
        ));

        Self {
            program: paths.host_binary.clone(),
            args: config.host.args.clone(),
            working_dir: paths.staging_dir.clone(),
            env,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.working_dir)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }
}

/// A host instance started by the supervisor.
///
/// The handle outlives the process: once stopped or exited it keeps the exit
/// status until a replacement has been started.
#[derive(Debug)]
pub struct SupervisedProcess {
    child: Child,
    pid: u32,
    working_dir: PathBuf,
    env: Vec<(String, String)>,
    exit_status: Option<ExitStatus>,
}

impl SupervisedProcess {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn working_dir(&self) -> &PathBuf {
        &self.working_dir
    }

    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    /// How the process ended, once it has been reaped
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.exit_status
    }

    pub fn is_alive(&self) -> bool {
        self.exit_status.is_none()
    }

    /// Stop the process and reap it. A process already reaped is left alone.
    async fn stop(&mut self, grace: Duration) -> io::Result<ExitStatus> {
        if let Some(status) = self.exit_status {
            return Ok(status);
        }
        info!("Stopping host process {}", self.pid);
        let status = shutdown_child(&mut self.child, grace).await?;
        debug!("Host process {} exited with {}", self.pid, status);
        self.exit_status = Some(status);
        Ok(status)
    }
}

/// Owns the single "current" host process.
///
/// Callers share it behind one lock; every mutation goes through `&mut self`.
/// The current handle is only swapped once its replacement is running.
#[derive(Debug)]
pub struct ProcessSupervisor {
    spec: HostSpec,
    stop_timeout: Duration,
    current: Option<SupervisedProcess>,
    spawned: u64,
}

impl ProcessSupervisor {
    pub fn new(spec: HostSpec, stop_timeout: Duration) -> Self {
        Self {
            spec,
            stop_timeout,
            current: None,
            spawned: 0,
        }
    }

    pub fn spec(&self) -> &HostSpec {
        &self.spec
    }

    /// The current handle, which may belong to a process that has exited
    pub fn current(&self) -> Option<&SupervisedProcess> {
        self.current.as_ref()
    }

    /// Pid of the current process while it is alive
    pub fn pid(&self) -> Option<u32> {
        self.current
            .as_ref()
            .filter(|p| p.is_alive())
            .map(SupervisedProcess::pid)
    }

    /// Number of processes started over the supervisor's lifetime
    pub fn spawn_count(&self) -> u64 {
        self.spawned
    }

    /// Start the host. Fails if a live one is already current.
    pub fn spawn(&mut self) -> Result<u32> {
        if let Some(current) = self.current.as_ref().filter(|p| p.is_alive()) {
            return Err(Error::Other(format!(
                "Host process {} is already running",
                current.pid
            )));
        }

        let process = self.launch()?;
        let pid = process.pid;
        self.current = Some(process);
        Ok(pid)
    }

    fn launch(&mut self) -> Result<SupervisedProcess> {
        let spawn_error = |source| Error::SpawnError {
            program: self.spec.program.display().to_string(),
            source,
        };
        let child = self.spec.command().spawn().map_err(spawn_error)?;
        let pid = child
            .id()
            .ok_or_else(|| spawn_error(io::Error::other("process exited before reporting a pid")))?;

        info!("Started {} (pid {})", self.spec.program.display(), pid);
        self.spawned += 1;
        Ok(SupervisedProcess {
            child,
            pid,
            working_dir: self.spec.working_dir.clone(),
            env: self.spec.env.clone(),
            exit_status: None,
        })
    }

    /// Stop the current host, if any, reap it and drop its handle
    pub async fn terminate(&mut self) -> Result<Option<ExitStatus>> {
        let Some(process) = self.current.as_mut() else {
            return Ok(None);
        };
        let status = process.stop(self.stop_timeout).await?;
        self.current = None;
        Ok(Some(status))
    }

    /// Stop the current host and start a fresh one from the same spec.
    ///
    /// The old handle stays current until the new process has started. When
    /// the start fails it is still there, carrying its exit status, and the
    /// spawn error is returned.
    pub async fn replace(&mut self) -> Result<u32> {
        if let Some(process) = self.current.as_mut() {
            process.stop(self.stop_timeout).await?;
        }

        let process = self.launch()?;
        let pid = process.pid;
        self.current = Some(process);
        Ok(pid)
    }

    /// Record and return the exit status the first time the current host is
    /// seen to have exited on its own
    pub fn check_exit(&mut self) -> Option<ExitStatus> {
        let process = self.current.as_mut().filter(|p| p.is_alive())?;
        match process.child.try_wait() {
            Ok(Some(status)) => {
                process.exit_status = Some(status);
                Some(status)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Cannot query host process {}: {}", process.pid, e);
                None
            }
        }
    }

    pub fn is_running(&mut self) -> bool {
        self.check_exit();
        self.pid().is_some()
    }
}

/// SIGTERM, wait up to `grace`, then SIGKILL and reap
async fn shutdown_child(child: &mut Child, grace: Duration) -> io::Result<ExitStatus> {
    #[cfg(unix)]
    {
        let Some(pid) = child.id() else {
            return child.wait().await;
        };

        if let Err(e) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            if e == nix::errno::Errno::ESRCH {
                return child.wait().await;
            }
            return Err(io::Error::other(e));
        }

        if let Ok(result) = tokio::time::timeout(grace, child.wait()).await {
            return result;
        }
        warn!("Host process {} ignored SIGTERM, killing", pid);
    }

    #[cfg(not(unix))]
    let _ = grace;

    child.kill().await?;
    child.wait().await
}
