//! Incremental rebuilds of a single plugin module

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::{
    builder::{ArtifactBuilder, BuildResult},
    discovery::ModuleDescriptor,
    error::{Error, Result},
    watch::{EventSource, FileWatchService, WatchEvent, is_hidden_below},
};

/// Rebuilds one module's artifact on every source change.
///
/// Builds are issued independently: a change arriving while a build runs
/// starts another one right away. The host process is never touched.
pub struct ModuleDevWatcher {
    builder: Arc<ArtifactBuilder>,
    module: ModuleDescriptor,
    output_dir: PathBuf,
    source_extensions: Vec<String>,
    builds: JoinSet<BuildResult>,
}

impl ModuleDevWatcher {
    pub fn new(
        builder: Arc<ArtifactBuilder>,
        module: ModuleDescriptor,
        output_dir: impl Into<PathBuf>,
        source_extensions: Vec<String>,
    ) -> Self {
        Self {
            builder,
            module,
            output_dir: output_dir.into(),
            source_extensions,
            builds: JoinSet::new(),
        }
    }

    pub fn module(&self) -> &ModuleDescriptor {
        &self.module
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.builder
            .plugin_artifact_path(&self.module, &self.output_dir)
    }

    /// Build once before watching. A failure is reported, not fatal.
    pub async fn initial_build(&self) -> BuildResult {
        self.builder
            .build_plugin(&self.module, &self.output_dir)
            .await
    }

    /// Whether `event` is a content change to one of the module's sources
    pub fn qualifies(&self, event: &WatchEvent) -> bool {
        event.kind.is_content_change()
            && event.path.starts_with(&self.module.path)
            && !is_hidden_below(&event.path, &self.module.path)
            && has_extension(&event.path, &self.source_extensions)
    }

    /// Start a rebuild for a qualifying event. Returns whether one was started.
    pub fn handle_event(&mut self, event: &WatchEvent) -> bool {
        if !self.qualifies(event) {
            debug!("Ignoring {:?} {}", event.kind, event.path.display());
            return false;
        }

        info!("{} changed", event.path.display());
        let builder = self.builder.clone();
        let module = self.module.clone();
        let output_dir = self.output_dir.clone();
        self.builds
            .spawn(async move { builder.build_plugin(&module, &output_dir).await });
        true
    }

    /// Build, then watch the module directory until `shutdown` resolves
    pub async fn run<F>(self, settle: Duration, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        self.initial_build().await;
        let watcher = FileWatchService::start(&[self.module.path.clone()], settle)?;
        info!(
            "Watching module {} for changes, press Ctrl-C to stop",
            self.module.name
        );
        self.run_until(watcher, shutdown).await
    }

    /// Consume events from `source` until `shutdown` resolves or the source fails
    pub async fn run_until<S, F>(mut self, mut source: S, shutdown: F) -> Result<()>
    where
        S: EventSource,
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);

        let result = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Interrupt received, shutting down");
                    break Ok(());
                }
                event = source.next_event() => match event {
                    Some(Ok(event)) => {
                        self.handle_event(&event);
                    }
                    Some(Err(e)) => {
                        error!("File watching failed: {}", e);
                        break Err(e);
                    }
                    None => break Err(Error::WatchClosed),
                },
                Some(joined) = self.builds.join_next() => {
                    if let Err(e) = joined {
                        error!("Module build task failed: {}", e);
                    }
                }
            }
        };

        self.builds.shutdown().await;
        result
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|wanted| wanted == ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolchainConfig;
    use crate::process::{Invocation, Outcome, ProcessRunner};
    use crate::watch::ChangeKind;
    use async_trait::async_trait;

    struct NoopRunner;

    #[async_trait]
    impl ProcessRunner for NoopRunner {
        async fn run(&self, _invocation: &Invocation) -> Outcome {
            Outcome::Success
        }
    }

    fn watcher() -> ModuleDevWatcher {
        let builder = Arc::new(ArtifactBuilder::new(
            Arc::new(NoopRunner),
            ToolchainConfig::default(),
            "/p",
        ));
        let module = ModuleDescriptor::from_path(Path::new("/p/contrib/documents")).unwrap();
        ModuleDevWatcher::new(builder, module, "/p/dist.dev/modules", vec!["go".to_string()])
    }

    #[test]
    fn test_qualifying_events() {
        let w = watcher();
        assert!(w.qualifies(&WatchEvent::new(
            "/p/contrib/documents/handlers/list.go",
            ChangeKind::Modified
        )));
        assert!(w.qualifies(&WatchEvent::new(
            "/p/contrib/documents/doc.go",
            ChangeKind::Created
        )));
    }

    #[test]
    fn test_non_qualifying_events() {
        let w = watcher();
        for event in [
            WatchEvent::new("/p/contrib/documents/doc.go", ChangeKind::Removed),
            WatchEvent::new("/p/contrib/documents/README.md", ChangeKind::Modified),
            WatchEvent::new("/p/contrib/documents/.doc.go", ChangeKind::Modified),
            WatchEvent::new("/p/contrib/other/doc.go", ChangeKind::Modified),
        ] {
            assert!(!w.qualifies(&event), "{event:?} should not qualify");
        }
    }

    #[test]
    fn test_artifact_path() {
        assert_eq!(
            watcher().artifact_path(),
            PathBuf::from("/p/dist.dev/modules/documents.so")
        );
    }
}
