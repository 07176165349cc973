//! Per-profile Change Queue & Retry — the serialized mutation applier
//! (spec §4.E).
//!
//! One bounded `mpsc` channel per active profile, drained by a single
//! consumer task, so "within a profile, mutation application is total
//! order of queue arrival" (spec §5) holds by construction: there is
//! exactly one task executing `Syncer` calls for that profile.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{instrument, warn};

use syncd_core::domain::errors::EngineError;
use syncd_core::domain::handle::Backend;
use syncd_core::domain::runtime::IgnoreEcho;

use crate::context::Backends;
use crate::intents::Intent;

/// Default channel capacity (spec doesn't mandate a number; bounded per
/// Design Note "Retry": "a bounded queue ... replaces the source's
/// unbounded channel-with-sleep pattern").
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

struct QueuedIntent {
    intent: Intent,
    reply: oneshot::Sender<Result<(), EngineError>>,
}

/// Handle the reconcile loop submits intents through. Cheap to clone.
#[derive(Clone)]
pub struct ChangeQueueHandle {
    tx: mpsc::Sender<QueuedIntent>,
}

impl ChangeQueueHandle {
    /// Enqueues `intent` and awaits the result channel that resolves
    /// when the mutation actually lands (spec §4.D: "the caller receives
    /// a result channel that resolves when the mutation lands").
    pub async fn submit(&self, intent: Intent) -> Result<(), EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(QueuedIntent { intent, reply: reply_tx })
            .await
            .map_err(|_| EngineError::Transient("change queue consumer is gone".into()))?;
        reply_rx
            .await
            .map_err(|_| EngineError::Transient("change queue dropped the reply".into()))?
    }
}

/// Spawns the single consumer task for one profile's queue. Returns the
/// handle callers submit through and the task's join handle (awaited by
/// `profile.stop()` to drain pending intents before returning).
pub fn spawn_consumer(
    backends: Arc<Backends>,
    ignore_echo: Arc<IgnoreEcho>,
) -> (ChangeQueueHandle, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(DEFAULT_QUEUE_CAPACITY);
    let join = tokio::spawn(run_consumer(backends, ignore_echo, rx));
    (ChangeQueueHandle { tx }, join)
}

async fn run_consumer(
    backends: Arc<Backends>,
    ignore_echo: Arc<IgnoreEcho>,
    mut rx: mpsc::Receiver<QueuedIntent>,
) {
    // Closing the sender side (profile.stop()) drains whatever is
    // already queued, then `recv()` returns `None` and the task exits —
    // "pending intents are drained and signalled" (spec §4.E).
    while let Some(queued) = rx.recv().await {
        let result = execute(&backends, &ignore_echo, queued.intent).await;
        let _ = queued.reply.send(result);
    }
}

#[instrument(skip(backends, ignore_echo, intent))]
async fn execute(
    backends: &Backends,
    ignore_echo: &Arc<IgnoreEcho>,
    intent: Intent,
) -> Result<(), EngineError> {
    let _guard = ignore_echo.guard(intent.echo_id().to_string());

    match intent {
        Intent::Write { from, to } => {
            let reader = backends.syncer(from.backend).open_read(&from).await?;
            // The remote file service has no in-place replace (spec
            // §4.A "Writes"): delete first, then upload, in the same
            // mutation.
            if to.backend == Backend::Remote && to.exists {
                backends.remote.delete(&to).await?;
            }
            backends
                .syncer(to.backend)
                .write(&to.id, reader, from.size, from.modified)
                .await?;
            Ok(())
        }
        Intent::CreateDir { target } => {
            backends.syncer(target.backend).create_dir(&target.id).await?;
            Ok(())
        }
        Intent::Rename { target } => {
            if target.is_dir {
                return Err(EngineError::Precondition(format!(
                    "rename is forbidden on directories: {}",
                    target.id
                )));
            }
            backends.syncer(target.backend).rename(&target).await?;
            Ok(())
        }
        Intent::Delete { target } => {
            backends.syncer(target.backend).delete(&target).await?;
            Ok(())
        }
    }
}

/// Logged when a retried intent exhausts its attempts (spec §4.E: "A
/// record that fails three successive retries is logged and dropped").
pub fn log_dropped(profile_id: &str, id: &str, error: &EngineError) {
    warn!(profile_id, id, error = %error, "retry exhausted, dropping record");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use syncd_core::domain::handle::FileHandle;
    use syncd_core::ports::{ByteStream, Monitor};

    struct RecordingSyncer {
        backend: Backend,
        deletes: AtomicUsize,
        writes: AtomicUsize,
    }

    impl RecordingSyncer {
        fn new(backend: Backend) -> Self {
            Self {
                backend,
                deletes: AtomicUsize::new(0),
                writes: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Syncer for RecordingSyncer {
        fn backend(&self) -> Backend {
            self.backend
        }
        async fn stat(&self, id: &str) -> Result<FileHandle, EngineError> {
            Ok(FileHandle::absent(id, self.backend))
        }
        async fn children(&self, _dir: &FileHandle) -> Result<Vec<FileHandle>, EngineError> {
            Ok(vec![])
        }
        async fn open_read(&self, _handle: &FileHandle) -> Result<ByteStream, EngineError> {
            Ok(Box::pin(std::io::Cursor::new(b"x".to_vec())))
        }
        async fn write(
            &self,
            id: &str,
            _reader: ByteStream,
            _size: u64,
            modified: chrono::DateTime<Utc>,
        ) -> Result<FileHandle, EngineError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(FileHandle {
                id: id.to_string(),
                backend: self.backend,
                modified,
                size: 1,
                is_dir: false,
                exists: true,
                deleted: false,
            })
        }
        async fn create_dir(&self, id: &str) -> Result<FileHandle, EngineError> {
            Ok(FileHandle {
                id: id.to_string(),
                backend: self.backend,
                modified: Utc::now(),
                size: 0,
                is_dir: true,
                exists: true,
                deleted: false,
            })
        }
        async fn delete(&self, _handle: &FileHandle) -> Result<(), EngineError> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn rename(&self, handle: &FileHandle) -> Result<FileHandle, EngineError> {
            Ok(handle.clone())
        }
    }

    struct NullMonitor;
    #[async_trait]
    impl Monitor for NullMonitor {
        async fn subscribe(&self, _profile_id: &str, _dir: &FileHandle) {}
        async fn unsubscribe(&self, _profile_id: &str, _dir: &FileHandle) {}
    }

    fn handle(id: &str, backend: Backend, exists: bool) -> FileHandle {
        FileHandle {
            id: id.to_string(),
            backend,
            modified: Utc::now(),
            size: 1,
            is_dir: false,
            exists,
            deleted: false,
        }
    }

    use syncd_core::ports::Syncer;

    #[tokio::test]
    async fn write_to_existing_remote_deletes_first() {
        let local = Arc::new(RecordingSyncer::new(Backend::Local));
        let remote = Arc::new(RecordingSyncer::new(Backend::Remote));
        let backends = Arc::new(Backends {
            local: local.clone(),
            remote: remote.clone(),
            local_monitor: Arc::new(NullMonitor),
            remote_monitor: Arc::new(NullMonitor),
        });
        let ignore_echo = IgnoreEcho::new();

        let from = handle("/local/a.txt", Backend::Local, true);
        let to = handle("/remote/a.txt", Backend::Remote, true);
        execute(&backends, &ignore_echo, Intent::Write { from, to })
            .await
            .unwrap();

        assert_eq!(remote.deletes.load(Ordering::SeqCst), 1);
        assert_eq!(remote.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn write_to_absent_remote_skips_delete() {
        let local = Arc::new(RecordingSyncer::new(Backend::Local));
        let remote = Arc::new(RecordingSyncer::new(Backend::Remote));
        let backends = Arc::new(Backends {
            local: local.clone(),
            remote: remote.clone(),
            local_monitor: Arc::new(NullMonitor),
            remote_monitor: Arc::new(NullMonitor),
        });
        let ignore_echo = IgnoreEcho::new();

        let from = handle("/local/a.txt", Backend::Local, true);
        let to = handle("/remote/a.txt", Backend::Remote, false);
        execute(&backends, &ignore_echo, Intent::Write { from, to })
            .await
            .unwrap();

        assert_eq!(remote.deletes.load(Ordering::SeqCst), 0);
        assert_eq!(remote.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rename_on_directory_is_rejected() {
        let local = Arc::new(RecordingSyncer::new(Backend::Local));
        let remote = Arc::new(RecordingSyncer::new(Backend::Remote));
        let backends = Arc::new(Backends {
            local,
            remote,
            local_monitor: Arc::new(NullMonitor),
            remote_monitor: Arc::new(NullMonitor),
        });
        let ignore_echo = IgnoreEcho::new();

        let mut dir = handle("/local/sub", Backend::Local, true);
        dir.is_dir = true;
        let err = execute(&backends, &ignore_echo, Intent::Rename { target: dir })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Precondition(_)));
    }

    #[tokio::test]
    async fn consumer_processes_in_submission_order() {
        let local = Arc::new(RecordingSyncer::new(Backend::Local));
        let remote = Arc::new(RecordingSyncer::new(Backend::Remote));
        let backends = Arc::new(Backends {
            local,
            remote: remote.clone(),
            local_monitor: Arc::new(NullMonitor),
            remote_monitor: Arc::new(NullMonitor),
        });
        let ignore_echo = IgnoreEcho::new();
        let (handle_q, join) = spawn_consumer(backends, ignore_echo);

        for i in 0..5 {
            let from = handle(&format!("/local/{i}.txt"), Backend::Local, true);
            let to = handle(&format!("/remote/{i}.txt"), Backend::Remote, false);
            handle_q.submit(Intent::Write { from, to }).await.unwrap();
        }
        drop(handle_q);
        join.await.unwrap();
        assert_eq!(remote.writes.load(Ordering::SeqCst), 5);
    }
}
