//! One-shot build of every plugin module

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::{
    builder::{ArtifactBuilder, BuildResult},
    discovery::discover_modules,
    error::Result,
    process::Outcome,
};

pub struct BatchPluginBuilder {
    builder: Arc<ArtifactBuilder>,
}

impl BatchPluginBuilder {
    pub fn new(builder: Arc<ArtifactBuilder>) -> Self {
        Self { builder }
    }

    /// Build every module under `modules_root` into `output_dir`.
    ///
    /// Returns one result per discovered module, in discovery order. Only a
    /// failure to create `output_dir` is an error. A modules root that cannot
    /// be listed is logged and yields no results; individual module failures
    /// are recorded and the next module is tried.
    pub async fn build_all(&self, modules_root: &Path, output_dir: &Path) -> Result<Vec<BuildResult>> {
        tokio::fs::create_dir_all(output_dir).await?;

        let modules = match discover_modules(modules_root) {
            Ok(modules) => modules,
            Err(e) => {
                error!("Cannot list modules: {}", e);
                return Ok(Vec::new());
            }
        };
        info!(
            "Building {} module(s) into {}",
            modules.len(),
            output_dir.display()
        );

        // Artifact names claimed so far, compared case-insensitively
        let mut claimed: HashMap<String, String> = HashMap::new();
        let mut results = Vec::with_capacity(modules.len());

        for module in modules {
            let artifact = self
                .builder
                .plugin_artifact_name(&module.name)
                .to_ascii_lowercase();

            if let Some(owner) = claimed.get(&artifact) {
                warn!(
                    "Module {} would overwrite the artifact of module {}, skipping",
                    module.name, owner
                );
                results.push(BuildResult {
                    target: self.builder.plugin_target(&module, output_dir),
                    outcome: Outcome::ArtifactCollision {
                        module: owner.clone(),
                    },
                });
                continue;
            }
            claimed.insert(artifact, module.name.clone());

            results.push(self.builder.build_plugin(&module, output_dir).await);
        }

        let failed = results.iter().filter(|r| !r.is_success()).count();
        if failed > 0 {
            warn!("{} of {} module(s) failed to build", failed, results.len());
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolchainConfig;
    use crate::process::{Invocation, ProcessRunner};
    use async_trait::async_trait;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct TouchRunner {
        calls: Mutex<Vec<Invocation>>,
    }

    #[async_trait]
    impl ProcessRunner for TouchRunner {
        async fn run(&self, invocation: &Invocation) -> Outcome {
            // plugin_args are ["{output}", "{source}"] in these tests
            fs::write(&invocation.args[0], b"artifact").unwrap();
            self.calls.lock().unwrap().push(invocation.clone());
            Outcome::Success
        }
    }

    fn batch(runner: Arc<TouchRunner>, root: &Path) -> BatchPluginBuilder {
        let toolchain = ToolchainConfig {
            program: "cc".to_string(),
            plugin_args: vec!["{output}".to_string(), "{source}".to_string()],
            ..Default::default()
        };
        BatchPluginBuilder::new(Arc::new(ArtifactBuilder::new(runner, toolchain, root)))
    }

    #[tokio::test]
    async fn test_build_all_empty_root() {
        let temp_dir = TempDir::new().unwrap();
        let modules_root = temp_dir.path().join("contrib");
        fs::create_dir(&modules_root).unwrap();
        let out_dir = temp_dir.path().join("dist").join("modules");

        let runner = Arc::new(TouchRunner::default());
        let results = batch(runner.clone(), temp_dir.path())
            .build_all(&modules_root, &out_dir)
            .await
            .unwrap();

        assert!(results.is_empty());
        assert!(out_dir.is_dir());
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_build_all_missing_root_is_not_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let out_dir = temp_dir.path().join("dist").join("modules");

        let runner = Arc::new(TouchRunner::default());
        let results = batch(runner.clone(), temp_dir.path())
            .build_all(&temp_dir.path().join("contrib"), &out_dir)
            .await
            .unwrap();

        assert!(results.is_empty());
        assert!(out_dir.is_dir());
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_build_all_fails_when_output_dir_cannot_be_created() {
        let temp_dir = TempDir::new().unwrap();
        let modules_root = temp_dir.path().join("contrib");
        fs::create_dir_all(modules_root.join("documents")).unwrap();
        let blocker = temp_dir.path().join("dist");
        fs::write(&blocker, "not a directory").unwrap();

        let runner = Arc::new(TouchRunner::default());
        let result = batch(runner.clone(), temp_dir.path())
            .build_all(&modules_root, &blocker.join("modules"))
            .await;

        assert!(result.is_err());
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_build_all_reports_case_collision() {
        let temp_dir = TempDir::new().unwrap();
        let modules_root = temp_dir.path().join("contrib");
        fs::create_dir_all(modules_root.join("Docs")).unwrap();
        fs::create_dir_all(modules_root.join("docs")).unwrap();
        let out_dir = temp_dir.path().join("out");

        let runner = Arc::new(TouchRunner::default());
        let results = batch(runner.clone(), temp_dir.path())
            .build_all(&modules_root, &out_dir)
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results[0].is_success());
        assert_eq!(
            results[1].outcome,
            Outcome::ArtifactCollision {
                module: "Docs".to_string()
            }
        );
        assert_eq!(runner.calls.lock().unwrap().len(), 1);
    }
}
