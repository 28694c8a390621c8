//! Subprocess invocation for the external compiler toolchain

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

/// A single command line to run in a given directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
            env: Vec::new(),
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn to_shell_command(&self) -> String {
        let mut cmd = quote(&self.program);
        for arg in &self.args {
            cmd.push(' ');
            cmd.push_str(&quote(arg));
        }
        cmd
    }
}

fn quote(part: &str) -> String {
    if part.contains(' ') {
        format!("'{part}'")
    } else {
        part.to_string()
    }
}

/// How a subprocess run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// The program ran and exited non-zero. `None` when it was killed by a signal.
    CompilerFailure { code: Option<i32> },
    /// The program could not be launched at all
    SpawnFailure { cause: String },
    /// Another module already claimed the same artifact name
    ArtifactCollision { module: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::CompilerFailure { code: Some(code) } => write!(f, "exited with code {code}"),
            Outcome::CompilerFailure { code: None } => write!(f, "terminated by signal"),
            Outcome::SpawnFailure { cause } => write!(f, "could not be started: {cause}"),
            Outcome::ArtifactCollision { module } => {
                write!(f, "artifact name already used by module `{module}`")
            }
        }
    }
}

/// Capability to run a command to completion with inherited output streams
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> Outcome;
}

/// Runs invocations as real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessRunner;

#[async_trait]
impl ProcessRunner for SystemProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Outcome {
        info!("Running: {}", invocation.to_shell_command());

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        if let Some(ref dir) = invocation.working_dir {
            cmd.current_dir(dir);
        }

        for (key, value) in &invocation.env {
            debug!("Setting env: {}={}", key, value);
            cmd.env(key, value);
        }

        match cmd.status().await {
            Ok(status) if status.success() => Outcome::Success,
            Ok(status) => Outcome::CompilerFailure {
                code: status.code(),
            },
            Err(e) => Outcome::SpawnFailure {
                cause: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_shell_command_quotes_spaces() {
        let inv = Invocation::new(
            "go",
            vec!["build".into(), "-o".into(), "/tmp/my dir/app".into()],
        );
        assert_eq!(inv.to_shell_command(), "go build -o '/tmp/my dir/app'");
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::Success.to_string(), "success");
        assert_eq!(
            Outcome::CompilerFailure { code: Some(2) }.to_string(),
            "exited with code 2"
        );
        assert!(
            Outcome::SpawnFailure {
                cause: "not found".into()
            }
            .to_string()
            .contains("not found")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_success() {
        let inv = Invocation::new("/bin/sh", vec!["-c".into(), "exit 0".into()]);
        assert_eq!(SystemProcessRunner.run(&inv).await, Outcome::Success);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_non_zero_exit() {
        let inv = Invocation::new("/bin/sh", vec!["-c".into(), "exit 3".into()]);
        assert_eq!(
            SystemProcessRunner.run(&inv).await,
            Outcome::CompilerFailure { code: Some(3) }
        );
    }

    #[tokio::test]
    async fn test_run_missing_program_is_spawn_failure() {
        let inv = Invocation::new("/nonexistent/devloop-compiler", vec![]);
        let outcome = SystemProcessRunner.run(&inv).await;
        assert!(matches!(outcome, Outcome::SpawnFailure { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_uses_working_dir_and_env() {
        let dir = tempfile::TempDir::new().unwrap();
        let inv = Invocation::new(
            "/bin/sh",
            vec!["-c".into(), "echo \"$MARKER\" > marker.txt".into()],
        )
        .with_working_dir(dir.path())
        .with_env("MARKER", "hello");

        assert_eq!(SystemProcessRunner.run(&inv).await, Outcome::Success);
        let written = std::fs::read_to_string(dir.path().join("marker.txt")).unwrap();
        assert_eq!(written.trim(), "hello");
    }
}
