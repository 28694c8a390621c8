//! The live development loop: build, run, watch, rebuild and restart
//!
//! Change events are consumed one at a time. Asset changes are copied inline.
//! Source changes are queued to a single rebuild worker, so at most one
//! rebuild-and-restart sequence is in flight while the event loop keeps
//! draining the watcher.

mod routing;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::{
    assets::AssetSynchronizer,
    builder::ArtifactBuilder,
    config::{Config, ProjectPaths},
    error::{Error, Result},
    process::ProcessRunner,
    supervisor::{HostSpec, ProcessSupervisor},
    watch::{EventSource, FileWatchService, WatchEvent},
};

pub use routing::{EventRoute, WatchLayout};

const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Bootstrapping,
    Running,
    RebuildInFlight,
    ShuttingDown,
    /// Stopped after an interrupt
    Terminated,
    /// Stopped because file watching could not continue
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Terminated | Phase::Failed)
    }
}

/// Observable state of the dev loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DevStatus {
    pub phase: Phase,
    /// Rebuild sequences finished, successful or not
    pub rebuilds_completed: u64,
    pub rebuilds_failed: u64,
    pub restarts: u64,
    /// Successful builds whose host could not be started
    pub restarts_failed: u64,
    pub assets_synced: u64,
}

/// Shared handles of the rebuild worker
struct RebuildContext {
    builder: Arc<ArtifactBuilder>,
    supervisor: Arc<Mutex<ProcessSupervisor>>,
    status: watch::Sender<DevStatus>,
    entry_point: PathBuf,
    output_path: PathBuf,
}

pub struct DevOrchestrator {
    layout: WatchLayout,
    assets: AssetSynchronizer,
    supervisor: Arc<Mutex<ProcessSupervisor>>,
    status: watch::Sender<DevStatus>,
    rebuilds: mpsc::UnboundedSender<PathBuf>,
    worker: JoinHandle<()>,
    settle: Duration,
    health_interval: Duration,
}

impl DevOrchestrator {
    /// Prepare the staging tree, build the host and start it.
    ///
    /// A failed initial build or a host that cannot be started is fatal.
    pub async fn bootstrap(
        config: &Config,
        paths: &ProjectPaths,
        runner: Arc<dyn ProcessRunner>,
    ) -> Result<Self> {
        let (status, _) = watch::channel(DevStatus::default());

        tokio::fs::create_dir_all(&paths.staging_dir).await?;
        tokio::fs::create_dir_all(&paths.staging_modules_dir).await?;

        let assets = AssetSynchronizer::new(paths.assets.clone());
        let sync = assets.clone();
        let report = tokio::task::spawn_blocking(move || sync.sync_all())
            .await
            .map_err(|e| Error::Other(format!("Asset sync task failed: {e}")))?;
        for failure in &report.failures {
            warn!("{}", failure);
        }
        info!(
            "Synced {} asset file(s) into {}",
            report.files_copied,
            paths.staging_dir.display()
        );

        let builder = Arc::new(ArtifactBuilder::new(
            runner,
            config.toolchain.clone(),
            &paths.root,
        ));
        builder
            .build_host(&paths.host_entry, &paths.host_binary)
            .await
            .into_result()?;

        let mut supervisor = ProcessSupervisor::new(
            HostSpec::from_config(config, paths),
            Duration::from_secs(config.host.stop_timeout_secs),
        );
        supervisor.spawn()?;
        let supervisor = Arc::new(Mutex::new(supervisor));

        let (rebuilds, rebuild_rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(rebuild_worker(
            rebuild_rx,
            RebuildContext {
                builder,
                supervisor: supervisor.clone(),
                status: status.clone(),
                entry_point: paths.host_entry.clone(),
                output_path: paths.host_binary.clone(),
            },
        ));

        status.send_modify(|s| s.phase = Phase::Running);

        Ok(Self {
            layout: WatchLayout::from_config(config, paths),
            assets,
            supervisor,
            status,
            rebuilds,
            worker,
            settle: Duration::from_millis(config.watch.settle_ms),
            health_interval: HEALTH_CHECK_INTERVAL,
        })
    }

    pub fn with_health_interval(mut self, interval: Duration) -> Self {
        self.health_interval = interval;
        self
    }

    pub fn layout(&self) -> &WatchLayout {
        &self.layout
    }

    pub fn subscribe(&self) -> watch::Receiver<DevStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> DevStatus {
        self.status.borrow().clone()
    }

    pub fn supervisor(&self) -> Arc<Mutex<ProcessSupervisor>> {
        self.supervisor.clone()
    }

    /// Watch the project trees until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let watcher = match FileWatchService::start(&self.layout.watch_roots(), self.settle) {
            Ok(watcher) => watcher,
            Err(e) => {
                error!("Cannot watch the project: {}", e);
                self.shutdown(Phase::Failed).await;
                return Err(e);
            }
        };
        info!("Watching for changes, press Ctrl-C to stop");
        self.run_until(watcher, shutdown).await
    }

    /// Drive the loop from any event source until `shutdown` resolves or the
    /// source fails. The host is stopped on every exit path; a watch failure
    /// ends in [`Phase::Failed`] instead of [`Phase::Terminated`].
    pub async fn run_until<S, F>(self, mut source: S, shutdown: F) -> Result<()>
    where
        S: EventSource,
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);
        let mut health = tokio::time::interval(self.health_interval);
        health.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let result = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Interrupt received, shutting down");
                    break Ok(());
                }
                event = source.next_event() => match event {
                    Some(Ok(event)) => {
                        self.handle_event(event).await;
                    }
                    Some(Err(e)) => {
                        error!("File watching failed: {}", e);
                        break Err(e);
                    }
                    None => break Err(Error::WatchClosed),
                },
                _ = health.tick() => self.check_health(),
            }
        };

        let end = if result.is_ok() {
            Phase::Terminated
        } else {
            Phase::Failed
        };
        self.shutdown(end).await;
        result
    }

    /// Route one change event and carry out the asset or rebuild branch
    pub async fn handle_event(&self, event: WatchEvent) -> EventRoute {
        let route = self.layout.route(&event);

        match &route {
            EventRoute::SyncAsset { destination } => {
                let assets = self.assets.clone();
                let path = event.path.clone();
                match tokio::task::spawn_blocking(move || assets.sync_path(&path)).await {
                    Ok(Ok(_)) => {
                        info!(
                            "Copied {} -> {}",
                            event.path.display(),
                            destination.display()
                        );
                        self.status.send_modify(|s| s.assets_synced += 1);
                    }
                    Ok(Err(e)) => warn!("{}", e),
                    Err(e) => warn!("Asset copy task failed: {}", e),
                }
            }
            EventRoute::Rebuild => {
                if self.rebuilds.send(event.path.clone()).is_err() {
                    error!("Rebuild worker is gone, ignoring {}", event.path.display());
                }
            }
            EventRoute::PluginArtifact => {
                info!("Plugin artifact updated: {}", event.path.display());
            }
            EventRoute::Ignore => {
                debug!("Ignoring {:?} {}", event.kind, event.path.display());
            }
        }

        route
    }

    fn check_health(&self) {
        // Skip while a restart holds the lock
        let Ok(mut supervisor) = self.supervisor.try_lock() else {
            return;
        };
        if let Some(status) = supervisor.check_exit() {
            warn!(
                "Host process exited on its own ({}); it will be started again after the next successful build",
                status
            );
        }
    }

    /// Stop the rebuild worker and the host, then settle in `end`.
    /// In-flight compiler runs are abandoned.
    async fn shutdown(self, end: Phase) {
        self.status.send_modify(|s| s.phase = Phase::ShuttingDown);

        self.worker.abort();
        let _ = self.worker.await;

        let mut supervisor = self.supervisor.lock().await;
        match supervisor.terminate().await {
            Ok(Some(status)) => info!("Host process stopped ({})", status),
            Ok(None) => debug!("No host process to stop"),
            Err(e) => error!("Failed to stop host process: {}", e),
        }

        self.status.send_modify(|s| s.phase = end);
    }
}

/// Runs queued rebuilds strictly one after another
async fn rebuild_worker(mut triggers: mpsc::UnboundedReceiver<PathBuf>, ctx: RebuildContext) {
    while let Some(trigger) = triggers.recv().await {
        ctx.status.send_modify(|s| s.phase = Phase::RebuildInFlight);
        info!("{} changed, rebuilding", trigger.display());

        let result = ctx
            .builder
            .build_host(&ctx.entry_point, &ctx.output_path)
            .await;

        let restarted = if result.is_success() {
            let mut supervisor = ctx.supervisor.lock().await;
            match supervisor.replace().await {
                Ok(pid) => {
                    info!("Restarted host process (pid {})", pid);
                    Some(true)
                }
                Err(e) => {
                    error!("Failed to restart host process: {}", e);
                    Some(false)
                }
            }
        } else {
            warn!("Build failed, keeping the current host process");
            None
        };

        ctx.status.send_modify(|s| {
            s.rebuilds_completed += 1;
            if !result.is_success() {
                s.rebuilds_failed += 1;
            }
            match restarted {
                Some(true) => s.restarts += 1,
                Some(false) => s.restarts_failed += 1,
                None => {}
            }
            if s.phase == Phase::RebuildInFlight {
                s.phase = Phase::Running;
            }
        });
    }
}
