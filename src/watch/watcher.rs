// src/watch/watcher.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::fs::FileSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Changed,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
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

/// Live filesystem subscription for one unit.
///
/// Dropping it stops the underlying watcher.
pub struct WatchSubscription {
    unit: String,
    roots: Vec<PathBuf>,
    _inner: RecommendedWatcher,
}

impl fmt::Debug for WatchSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchSubscription")
            .field("unit", &self.unit)
            .field("roots", &self.roots)
            .finish_non_exhaustive()
    }
}

impl WatchSubscription {
    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

fn change_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Added),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(ChangeKind::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(ChangeKind::Added),
        EventKind::Modify(_) => Some(ChangeKind::Changed),
        EventKind::Remove(_) => Some(ChangeKind::Deleted),
        _ => None,
    }
}

/// Rewrite a reported path under its declared root. Watchers report
/// canonical paths, which may differ from the configured ones.
fn declared_path(path: &Path, roots: &[(PathBuf, PathBuf)]) -> PathBuf {
    for (canonical, declared) in roots {
        if let Ok(rel) = path.strip_prefix(canonical) {
            return declared.join(rel);
        }
    }
    path.to_path_buf()
}

/// Watch `roots` recursively and forward every relevant change to `tx`.
pub fn subscribe(
    fs: &dyn FileSystem,
    unit: &str,
    roots: &[PathBuf],
    tx: mpsc::UnboundedSender<WatchEvent>,
) -> Result<WatchSubscription> {
    let pairs: Vec<(PathBuf, PathBuf)> = roots
        .iter()
        .map(|root| {
            let canonical = fs.canonicalize(root).unwrap_or_else(|_| root.clone());
            (canonical, root.clone())
        })
        .collect();

    let mapping = pairs.clone();
    let unit_name = unit.to_string();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let Some(kind) = change_kind(&event.kind) else {
                    return;
                };
                for path in event.paths {
                    let event = WatchEvent::new(declared_path(&path, &mapping), kind);
                    if tx.send(event).is_err() {
                        debug!(unit = %unit_name, "watch channel closed");
                        return;
                    }
                }
            }
            Err(err) => warn!(unit = %unit_name, error = %err, "file watch error"),
        },
        Config::default(),
    )?;

    for (canonical, _) in &pairs {
        watcher
            .watch(canonical, RecursiveMode::Recursive)
            .with_context(|| format!("watching {:?}", canonical))?;
    }
    info!(unit = %unit, roots = ?roots, "file watcher started");

    Ok(WatchSubscription {
        unit: unit.to_string(),
        roots: roots.to_vec(),
        _inner: watcher,
    })
}
