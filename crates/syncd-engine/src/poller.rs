//! The remote poller (spec §4.C): no change feed exists on the remote
//! side, so changes are discovered by diffing `children(dir)` against a
//! persisted prior snapshot.
//!
//! Grounded in `syncd-watch::watcher::LocalWatcher`: the same
//! `watched: DashMap<dir, HashSet<profile>>` ref-counted subscription
//! shape and the same "emit `(profile_id, handle)` pairs on an unbounded
//! channel" handler protocol, so the engine's dispatch loop treats both
//! change sources identically.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{mpsc, Notify};
use tracing::warn;

use syncd_core::domain::handle::{Backend, FileHandle, RemoteSnapshotEntry};
use syncd_core::domain::runtime::IgnoreEcho;
use syncd_core::ports::{Monitor, StateStore, Syncer};

/// Periodic snapshot-diff change source backed by a persisted prior view
/// (spec §4.C).
pub struct RemotePoller {
    remote: Arc<dyn Syncer>,
    store: Arc<dyn StateStore>,
    ignore_echo: Arc<IgnoreEcho>,
    watched: DashMap<String, HashSet<String>>,
    paused: AtomicBool,
    stopping: AtomicBool,
    idle: Notify,
}

impl RemotePoller {
    /// Launches the poll loop. Returns the poller (for `subscribe`/
    /// `unsubscribe`/`pause`/`resume`/`stop`) and a channel of settled
    /// `(profile_id, handle)` pairs.
    pub fn start(
        remote: Arc<dyn Syncer>,
        store: Arc<dyn StateStore>,
        ignore_echo: Arc<IgnoreEcho>,
        interval: Duration,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<(String, FileHandle)>) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        let this = Arc::new(Self {
            remote,
            store,
            ignore_echo,
            watched: DashMap::new(),
            paused: AtomicBool::new(false),
            stopping: AtomicBool::new(false),
            idle: Notify::new(),
        });

        let loop_owner = this.clone();
        tokio::spawn(async move {
            loop_owner.run(out_tx, interval).await;
        });

        (this, out_rx)
    }

    async fn run(self: Arc<Self>, out_tx: mpsc::UnboundedSender<(String, FileHandle)>, interval: Duration) {
        loop {
            if self.stopping.load(Ordering::SeqCst) {
                self.idle.notify_waiters();
                return;
            }
            if !self.paused.load(Ordering::SeqCst) {
                self.poll_pass(&out_tx).await;
            }
            self.idle.notify_waiters();
            tokio::time::sleep(interval).await;
        }
    }

    /// One poll pass: diffs every watched directory in parallel.
    async fn poll_pass(&self, out_tx: &mpsc::UnboundedSender<(String, FileHandle)>) {
        let dirs: Vec<String> = self.watched.iter().map(|e| e.key().clone()).collect();
        let mut passes = Vec::with_capacity(dirs.len());
        for dir_id in dirs {
            passes.push(self.diff_one(dir_id, out_tx));
        }
        futures_join_all(passes).await;
    }

    async fn diff_one(&self, dir_id: String, out_tx: &mpsc::UnboundedSender<(String, FileHandle)>) {
        let dir_handle = match self.remote.stat(&dir_id).await {
            Ok(h) => h,
            Err(e) => {
                warn!(dir = %dir_id, error = %e, "failed to stat watched remote directory");
                return;
            }
        };
        let cur = match self.remote.children(&dir_handle).await {
            Ok(cur) => cur,
            Err(e) => {
                warn!(dir = %dir_id, error = %e, "failed to list watched remote directory");
                return;
            }
        };
        let prev = self.store.load_remote_snapshot(&dir_id).await.unwrap_or_default();

        let profiles: HashSet<String> = self
            .watched
            .get(&dir_id)
            .map(|e| e.clone())
            .unwrap_or_default();
        if profiles.is_empty() {
            return;
        }

        let emit = |handle: FileHandle| {
            if self.ignore_echo.contains(&handle.id) {
                return;
            }
            for profile_id in &profiles {
                let _ = out_tx.send((profile_id.clone(), handle.clone()));
            }
        };

        for p in &prev {
            match cur.iter().find(|c| c.id == p.id) {
                None => emit(FileHandle::deleted(p.id.clone(), Backend::Remote)),
                Some(c) if c.modified != p.modified => emit(c.clone()),
                Some(c) if c.is_dir => emit(c.clone()),
                Some(_) => {}
            }
        }
        for c in &cur {
            if !prev.iter().any(|p| p.id == c.id) {
                emit(c.clone());
            }
        }

        let snapshot: Vec<RemoteSnapshotEntry> = cur.iter().map(RemoteSnapshotEntry::from).collect();
        if let Err(e) = self.store.save_remote_snapshot(&dir_id, &snapshot).await {
            warn!(dir = %dir_id, error = %e, "failed to persist remote snapshot");
        }
    }

    /// Pauses the poll loop (used by the retry drainer to get a
    /// quiescent view before replaying a record).
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Signals the loop to exit and blocks until the current pass
    /// completes (spec §4.C `stop()`).
    pub async fn stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.idle.notified().await;
    }
}

#[async_trait]
impl Monitor for RemotePoller {
    async fn subscribe(&self, profile_id: &str, dir: &FileHandle) {
        self.watched
            .entry(dir.id.clone())
            .or_default()
            .insert(profile_id.to_string());
    }

    async fn unsubscribe(&self, profile_id: &str, dir: &FileHandle) {
        let teardown = match self.watched.get_mut(&dir.id) {
            Some(mut entry) => {
                entry.remove(profile_id);
                entry.is_empty()
            }
            None => false,
        };
        if teardown {
            self.watched.remove(&dir.id);
            if let Err(e) = self.store.delete_remote_snapshot(&dir.id).await {
                warn!(dir = %dir.id, error = %e, "failed to delete remote snapshot");
            }
        }
    }
}

/// Small local stand-in for `futures::future::join_all` so the crate
/// doesn't need to pull in the `futures` crate for one call site.
async fn futures_join_all<F: std::future::Future<Output = ()>>(futs: Vec<F>) {
    for fut in futs {
        fut.await;
    }
}
