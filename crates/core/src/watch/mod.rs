//! File change notification as an explicit event queue
//!
//! The `notify` backend calls back on its own thread; every callback is
//! translated into [`WatchEvent`]s and pushed into an unbounded channel so the
//! OS-level watcher never waits on the consumer. Consumers pull events one at
//! a time through [`EventSource`].

mod filter;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

pub use filter::{collapse_roots, is_hidden_below, owning_root};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
    Other,
}

impl ChangeKind {
    /// Whether the path now holds content worth acting on
    pub fn is_content_change(self) -> bool {
        matches!(self, ChangeKind::Created | ChangeKind::Modified)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl WatchEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

pub type WatchSender = mpsc::UnboundedSender<Result<WatchEvent>>;

/// Anything the orchestrators can pull change events from
#[async_trait]
pub trait EventSource: Send {
    /// The next event, an error from the watch backend, or `None` once the
    /// source is closed.
    async fn next_event(&mut self) -> Option<Result<WatchEvent>>;
}

/// Channel-backed queue that merges identical events arriving within the
/// settle window, preserving first-arrival order.
pub struct EventQueue {
    rx: mpsc::UnboundedReceiver<Result<WatchEvent>>,
    pending: VecDeque<WatchEvent>,
    deferred_error: Option<Error>,
    settle: Duration,
}

impl EventQueue {
    pub fn channel(settle: Duration) -> (WatchSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let queue = Self {
            rx,
            pending: VecDeque::new(),
            deferred_error: None,
            settle,
        };
        (tx, queue)
    }

    fn drain_ready(&mut self) {
        while let Ok(item) = self.rx.try_recv() {
            match item {
                Ok(event) => {
                    if !self.pending.contains(&event) {
                        self.pending.push_back(event);
                    }
                }
                Err(e) => {
                    self.deferred_error = Some(e);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl EventSource for EventQueue {
    async fn next_event(&mut self) -> Option<Result<WatchEvent>> {
        if let Some(event) = self.pending.pop_front() {
            return Some(Ok(event));
        }
        if let Some(e) = self.deferred_error.take() {
            return Some(Err(e));
        }

        match self.rx.recv().await? {
            Ok(event) => self.pending.push_back(event),
            Err(e) => return Some(Err(e)),
        }

        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
            self.drain_ready();
        }

        self.pending.pop_front().map(Ok)
    }
}

/// A watched root and its canonical spelling, which some backends report
#[derive(Debug, Clone)]
struct WatchRoot {
    path: PathBuf,
    canonical: PathBuf,
}

/// Recursive watcher over a set of directory trees
pub struct FileWatchService {
    _watcher: RecommendedWatcher,
    queue: EventQueue,
    roots: Vec<PathBuf>,
}

impl FileWatchService {
    /// Start watching `roots` recursively.
    ///
    /// Nested roots are collapsed and missing ones skipped with a warning. It is
    /// an error when nothing is left to watch.
    pub fn start(roots: &[PathBuf], settle: Duration) -> Result<Self> {
        let roots: Vec<WatchRoot> = collapse_roots(roots)
            .into_iter()
            .filter(|root| {
                let exists = root.is_dir();
                if !exists {
                    warn!("Watch root {} does not exist, skipping", root.display());
                }
                exists
            })
            .map(|path| WatchRoot {
                canonical: path.canonicalize().unwrap_or_else(|_| path.clone()),
                path,
            })
            .collect();

        if roots.is_empty() {
            return Err(Error::Other("No existing directories to watch".to_string()));
        }

        let (tx, queue) = EventQueue::channel(settle);
        let handler_roots = roots.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    for event in translate(event, &handler_roots) {
                        let _ = tx.send(Ok(event));
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(Error::WatchError(e)));
                }
            }
        })?;

        for root in &roots {
            watcher.watch(&root.path, RecursiveMode::Recursive)?;
            info!("Watching {}", root.path.display());
        }

        Ok(Self {
            _watcher: watcher,
            queue,
            roots: roots.into_iter().map(|r| r.path).collect(),
        })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

#[async_trait]
impl EventSource for FileWatchService {
    async fn next_event(&mut self) -> Option<Result<WatchEvent>> {
        self.queue.next_event().await
    }
}

/// Convert one backend event into zero or more filtered [`WatchEvent`]s
fn translate(event: notify::Event, roots: &[WatchRoot]) -> Vec<WatchEvent> {
    let kinds: Vec<ChangeKind> = match event.kind {
        EventKind::Access(_) | EventKind::Modify(ModifyKind::Metadata(_)) => return Vec::new(),
        EventKind::Create(_) => vec![ChangeKind::Created],
        EventKind::Remove(_) => vec![ChangeKind::Removed],
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => vec![ChangeKind::Removed],
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => vec![ChangeKind::Created],
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            vec![ChangeKind::Removed, ChangeKind::Created]
        }
        EventKind::Modify(ModifyKind::Name(_)) => Vec::new(),
        EventKind::Modify(_) => vec![ChangeKind::Modified],
        EventKind::Any | EventKind::Other => vec![ChangeKind::Other],
    };

    event
        .paths
        .into_iter()
        .enumerate()
        .filter_map(|(i, path)| {
            let kind = match kinds.as_slice() {
                [] => rename_kind(&path),
                [single] => *single,
                many => many.get(i).copied().unwrap_or(ChangeKind::Other),
            };
            let (root, path) = relocate(path, roots)?;
            if is_hidden_below(&path, root) {
                debug!("Ignoring hidden path {}", path.display());
                return None;
            }
            Some(WatchEvent { path, kind })
        })
        .collect()
}

/// Renames of unknown direction are judged by whether the path still exists
fn rename_kind(path: &Path) -> ChangeKind {
    if path.exists() {
        ChangeKind::Created
    } else {
        ChangeKind::Removed
    }
}

/// Express `path` relative to the configured spelling of its watch root
fn relocate<'a>(path: PathBuf, roots: &'a [WatchRoot]) -> Option<(&'a Path, PathBuf)> {
    for root in roots {
        if path.starts_with(&root.path) {
            return Some((&root.path, path));
        }
        if let Ok(rest) = path.strip_prefix(&root.canonical) {
            return Some((&root.path, root.path.join(rest)));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind};
    use tempfile::TempDir;

    fn roots(paths: &[&str]) -> Vec<WatchRoot> {
        paths
            .iter()
            .map(|p| WatchRoot {
                path: PathBuf::from(p),
                canonical: PathBuf::from(p),
            })
            .collect()
    }

    fn raw(kind: EventKind, paths: &[&str]) -> notify::Event {
        let mut event = notify::Event::new(kind);
        for p in paths {
            event = event.add_path(PathBuf::from(p));
        }
        event
    }

    #[test]
    fn test_translate_modify_and_create() {
        let roots = roots(&["/p/core"]);
        let modified = translate(
            raw(
                EventKind::Modify(ModifyKind::Data(DataChange::Content)),
                &["/p/core/server.go"],
            ),
            &roots,
        );
        assert_eq!(
            modified,
            vec![WatchEvent::new("/p/core/server.go", ChangeKind::Modified)]
        );

        let created = translate(
            raw(EventKind::Create(CreateKind::File), &["/p/core/new.go"]),
            &roots,
        );
        assert_eq!(created[0].kind, ChangeKind::Created);
    }

    #[test]
    fn test_translate_drops_access_and_metadata() {
        let roots = roots(&["/p/core"]);
        let meta = raw(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
            &["/p/core/server.go"],
        );
        assert!(translate(meta, &roots).is_empty());
    }

    #[test]
    fn test_translate_filters_dotfiles() {
        let roots = roots(&["/p/application"]);
        let event = raw(
            EventKind::Modify(ModifyKind::Any),
            &["/p/application/.main.go.swp", "/p/application/main.go"],
        );
        let events = translate(event, &roots);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].path, PathBuf::from("/p/application/main.go"));
    }

    #[test]
    fn test_translate_rename_both() {
        let roots = roots(&["/p/web"]);
        let event = raw(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/p/web/old.css", "/p/web/new.css"],
        );
        let events = translate(event, &roots);
        assert_eq!(events[0], WatchEvent::new("/p/web/old.css", ChangeKind::Removed));
        assert_eq!(events[1], WatchEvent::new("/p/web/new.css", ChangeKind::Created));
    }

    #[test]
    fn test_translate_directory_removal_is_plain_event() {
        let roots = roots(&["/p/web"]);
        let event = raw(EventKind::Remove(RemoveKind::Folder), &["/p/web/img"]);
        assert_eq!(
            translate(event, &roots),
            vec![WatchEvent::new("/p/web/img", ChangeKind::Removed)]
        );
    }

    #[test]
    fn test_translate_maps_canonical_paths_back() {
        let roots = vec![WatchRoot {
            path: PathBuf::from("/var/p/core"),
            canonical: PathBuf::from("/private/var/p/core"),
        }];
        let event = raw(
            EventKind::Modify(ModifyKind::Any),
            &["/private/var/p/core/db.go"],
        );
        assert_eq!(translate(event, &roots)[0].path, PathBuf::from("/var/p/core/db.go"));
    }

    #[tokio::test]
    async fn test_queue_merges_duplicates_within_settle_window() {
        let (tx, mut queue) = EventQueue::channel(Duration::from_millis(20));
        let a = WatchEvent::new("/p/a.go", ChangeKind::Modified);
        let b = WatchEvent::new("/p/b.go", ChangeKind::Modified);
        tx.send(Ok(a.clone())).unwrap();
        tx.send(Ok(a.clone())).unwrap();
        tx.send(Ok(b.clone())).unwrap();
        drop(tx);

        assert_eq!(queue.next_event().await.unwrap().unwrap(), a);
        assert_eq!(queue.next_event().await.unwrap().unwrap(), b);
        assert!(queue.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_queue_without_settle_keeps_every_event() {
        let (tx, mut queue) = EventQueue::channel(Duration::ZERO);
        let a = WatchEvent::new("/p/a.go", ChangeKind::Modified);
        tx.send(Ok(a.clone())).unwrap();
        tx.send(Ok(a.clone())).unwrap();

        assert_eq!(queue.next_event().await.unwrap().unwrap(), a);
        assert_eq!(queue.next_event().await.unwrap().unwrap(), a);
    }

    #[tokio::test]
    async fn test_queue_surfaces_backend_errors() {
        let (tx, mut queue) = EventQueue::channel(Duration::ZERO);
        tx.send(Err(Error::Other("inotify limit reached".to_string())))
            .unwrap();
        assert!(queue.next_event().await.unwrap().is_err());
    }

    #[test]
    fn test_start_without_existing_roots_fails() {
        let temp_dir = TempDir::new().unwrap();
        let missing = vec![temp_dir.path().join("nope")];
        assert!(FileWatchService::start(&missing, Duration::ZERO).is_err());
    }

    #[tokio::test]
    async fn test_start_reports_file_changes() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("core");
        std::fs::create_dir_all(&root).unwrap();

        let mut service =
            FileWatchService::start(&[root.clone()], Duration::from_millis(10)).unwrap();
        assert_eq!(service.roots(), &[root.clone()]);

        let file = root.join("server.go");
        std::fs::write(&file, "package core").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                match service.next_event().await {
                    Some(Ok(event)) if event.path == file => return event,
                    Some(_) => continue,
                    None => panic!("watch stream closed"),
                }
            }
        })
        .await
        .expect("no event for the written file");

        assert!(event.kind.is_content_change());
    }
}
