//! Compiler invocations for the host binary and plugin modules

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info};

use crate::{
    config::{ToolchainConfig, render_args},
    discovery::ModuleDescriptor,
    error::{Error, Result},
    process::{Invocation, Outcome, ProcessRunner},
};

/// One compiler invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildTarget {
    HostBinary {
        entry_point: PathBuf,
        output_path: PathBuf,
    },
    PluginModule {
        source_dir: PathBuf,
        output_path: PathBuf,
    },
}

impl BuildTarget {
    pub fn output_path(&self) -> &Path {
        match self {
            BuildTarget::HostBinary { output_path, .. }
            | BuildTarget::PluginModule { output_path, .. } => output_path,
        }
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildTarget::HostBinary { entry_point, .. } => {
                write!(f, "host binary ({})", entry_point.display())
            }
            BuildTarget::PluginModule { source_dir, .. } => {
                let name = source_dir
                    .file_name()
                    .map(|n| n.to_string_lossy())
                    .unwrap_or_default();
                write!(f, "module {name}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    pub target: BuildTarget,
    pub outcome: Outcome,
}

impl BuildResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Turn a failed build into an error, for callers where failure is fatal
    pub fn into_result(self) -> Result<BuildTarget> {
        if self.outcome.is_success() {
            Ok(self.target)
        } else {
            Err(Error::BuildFailed {
                target: self.target.to_string(),
                outcome: self.outcome,
            })
        }
    }
}

/// Runs the external compiler for both artifact kinds
pub struct ArtifactBuilder {
    runner: Arc<dyn ProcessRunner>,
    toolchain: ToolchainConfig,
    project_root: PathBuf,
}

impl ArtifactBuilder {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        toolchain: ToolchainConfig,
        project_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            toolchain,
            project_root: project_root.into(),
        }
    }

    /// Artifact path of a plugin module inside `output_dir`
    pub fn plugin_artifact_path(&self, module: &ModuleDescriptor, output_dir: &Path) -> PathBuf {
        output_dir.join(self.plugin_artifact_name(&module.name))
    }

    pub fn plugin_artifact_name(&self, module_name: &str) -> String {
        format!("{module_name}.{}", self.toolchain.plugin_extension)
    }

    pub fn host_target(&self, entry_point: &Path, output_path: &Path) -> BuildTarget {
        BuildTarget::HostBinary {
            entry_point: entry_point.to_path_buf(),
            output_path: output_path.to_path_buf(),
        }
    }

    pub fn plugin_target(&self, module: &ModuleDescriptor, output_dir: &Path) -> BuildTarget {
        BuildTarget::PluginModule {
            source_dir: module.path.clone(),
            output_path: self.plugin_artifact_path(module, output_dir),
        }
    }

    /// The compiler command line for a target
    pub fn invocation(&self, target: &BuildTarget) -> Invocation {
        let args = match target {
            BuildTarget::HostBinary {
                entry_point,
                output_path,
            } => render_args(
                &self.toolchain.host_args,
                &[
                    ("output", &*output_path.to_string_lossy()),
                    ("entry", &*entry_point.to_string_lossy()),
                ],
            ),
            BuildTarget::PluginModule {
                source_dir,
                output_path,
            } => render_args(
                &self.toolchain.plugin_args,
                &[
                    ("output", &*output_path.to_string_lossy()),
                    ("source", &*source_dir.to_string_lossy()),
                ],
            ),
        };

        let mut invocation = Invocation::new(self.toolchain.program.clone(), args)
            .with_working_dir(&self.project_root);
        for (key, value) in &self.toolchain.extra_env {
            invocation = invocation.with_env(key.clone(), value.clone());
        }
        invocation
    }

    pub async fn build_host(&self, entry_point: &Path, output_path: &Path) -> BuildResult {
        info!("Building application...");
        self.build(self.host_target(entry_point, output_path)).await
    }

    pub async fn build_plugin(&self, module: &ModuleDescriptor, output_dir: &Path) -> BuildResult {
        info!("Building module: {}", module.name);
        let target = self.plugin_target(module, output_dir);

        if let Err(e) = tokio::fs::create_dir_all(output_dir).await {
            error!(
                "Cannot create module output directory {}: {}",
                output_dir.display(),
                e
            );
            return BuildResult {
                target,
                outcome: Outcome::SpawnFailure {
                    cause: e.to_string(),
                },
            };
        }

        self.build(target).await
    }

    pub async fn build(&self, target: BuildTarget) -> BuildResult {
        let invocation = self.invocation(&target);
        let outcome = self.runner.run(&invocation).await;

        if outcome.is_success() {
            info!("Built {} -> {}", target, target.output_path().display());
        } else {
            error!("Failed to build {}: {}", target, outcome);
        }

        BuildResult { target, outcome }
    }
}
