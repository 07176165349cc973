//! The sync decision procedure (spec §4.D Steps 0-6).
//!
//! `handle_change` is the single entry point both the local watcher and
//! the remote poller feed: a watcher/poller only ever hands the engine
//! "this id changed", never a decision about what to do about it.

use std::sync::Arc;

use syncd_core::domain::errors::EngineError;
use syncd_core::domain::handle::{Backend, FileHandle};
use syncd_core::domain::profile::Direction;

use syncd_conflict::detector::{self, Resolution};

use crate::context::EngineContext;
use crate::intents::Intent;
use crate::paths;

/// Entry point for one observed change. `changed` is the handle the
/// watcher/poller already has in hand — it is used as-is for its own
/// side so a synthetic `deleted` handle (spec §4.B/§4.C) survives
/// rather than being clobbered by a fresh `stat`.
pub async fn handle_change(ctx: &EngineContext, changed: FileHandle) -> Result<(), EngineError> {
    let counterpart_id = paths::counterpart_id(&ctx.profile, changed.backend, &changed.id)?;

    let profile_id = ctx.profile_id();
    let guard = match ctx
        .in_flight
        .try_acquire(&profile_id, &[&changed.id, &counterpart_id])
    {
        Some(guard) => guard,
        // Step 0: another invocation already owns this pair.
        None => return Ok(()),
    };

    let counterpart_backend = opposite(changed.backend);
    let counterpart = ctx
        .backends
        .syncer(counterpart_backend)
        .stat(&counterpart_id)
        .await?;

    let (local, remote) = match changed.backend {
        Backend::Local => (changed, counterpart),
        Backend::Remote => (counterpart, changed),
    };

    let result = reconcile_pair(ctx, local, remote).await;
    drop(guard);
    result
}

fn opposite(backend: Backend) -> Backend {
    match backend {
        Backend::Local => Backend::Remote,
        Backend::Remote => Backend::Local,
    }
}

/// Steps 0 (ignore/existence half) through 6.
async fn reconcile_pair(
    ctx: &EngineContext,
    local: FileHandle,
    remote: FileHandle,
) -> Result<(), EngineError> {
    if ctx.profile.is_ignored(&local.id) || ctx.profile.is_ignored(&remote.id) {
        return Ok(());
    }
    if !local.exists && !remote.exists {
        return Ok(());
    }

    // Step 1: type coercion. Only applies once both sides exist.
    if local.exists && remote.exists && local.is_dir != remote.is_dir {
        return coerce_type(ctx, local, remote).await;
    }

    // Step 2: one-sided existence.
    if local.exists != remote.exists {
        return one_sided(ctx, local, remote).await;
    }

    // Step 3: directory pair — subscribe both sides, never recurse.
    if local.is_dir && remote.is_dir {
        ctx.backends.monitor(Backend::Local).subscribe(&ctx.profile_id(), &local).await;
        ctx.backends.monitor(Backend::Remote).subscribe(&ctx.profile_id(), &remote).await;
        return Ok(());
    }

    // Step 4: equal modification times, already converged.
    if local.modified == remote.modified {
        return Ok(());
    }

    // Step 5: direction and order.
    let (before, after) = if local.modified < remote.modified {
        (local, remote)
    } else {
        (remote, local)
    };

    // Step 6 always writes onto `before`, so "never write local under
    // PUSH, never write remote under PULL" (spec invariant 5) means:
    // exit here whenever `before` is the side direction forbids writing
    // to. See DESIGN.md's "Step 5 direction check" entry.
    match ctx.profile.direction {
        Direction::Push if before.backend == Backend::Local => return Ok(()),
        Direction::Pull if before.backend == Backend::Remote => return Ok(()),
        _ => {}
    }

    // Step 6: conflict detection.
    match detector::decide(&before, &after, ctx.profile.conflict_window, ctx.profile.conflict_policy) {
        Resolution::Overwrite => {
            submit(ctx, Intent::Write { from: after, to: before }).await
        }
        Resolution::RenameAside => {
            submit(ctx, Intent::Rename { target: before }).await
        }
    }
}

async fn coerce_type(
    ctx: &EngineContext,
    local: FileHandle,
    remote: FileHandle,
) -> Result<(), EngineError> {
    // Whichever side is the directory dictates the shape: rename the
    // file side aside, then create a directory in its place.
    let (file_side, dir_side) = if local.is_dir {
        (remote, local)
    } else {
        (local, remote)
    };
    submit(ctx, Intent::Rename { target: file_side.clone() }).await?;
    submit(ctx, Intent::CreateDir { target: file_side.clone() }).await?;

    // Spec §4.D Step 1: "subscribe L and the new R to their respective
    // watchers" — both sides are directories now.
    let new_dir = FileHandle { is_dir: true, ..file_side };
    ctx.backends.monitor(dir_side.backend).subscribe(&ctx.profile_id(), &dir_side).await;
    ctx.backends.monitor(new_dir.backend).subscribe(&ctx.profile_id(), &new_dir).await;
    Ok(())
}

async fn one_sided(ctx: &EngineContext, local: FileHandle, remote: FileHandle) -> Result<(), EngineError> {
    let (present, absent) = if local.exists {
        (local, remote)
    } else {
        (remote, local)
    };

    // A side that used to exist and vanished: propagate the deletion.
    // A side that has never existed: propagate a creation, direction
    // permitting.
    if !present.exists && !absent.exists {
        // Both vanished since the earlier existence check raced with a
        // concurrent delete; nothing to do.
        return Ok(());
    }

    if absent.deleted {
        if !is_write_allowed(ctx.profile.direction, present.backend) {
            return Ok(());
        }
        return submit(ctx, Intent::Delete { target: present }).await;
    }

    if !is_write_allowed(ctx.profile.direction, absent.backend) {
        return Ok(());
    }

    if present.is_dir {
        let new_dir = counterpart_handle(&absent, present.is_dir);
        submit(ctx, Intent::CreateDir { target: new_dir.clone() }).await?;
        // Spec §4.D Step 2: "subscribe both sides" once the counterpart
        // directory exists.
        ctx.backends.monitor(present.backend).subscribe(&ctx.profile_id(), &present).await;
        ctx.backends.monitor(new_dir.backend).subscribe(&ctx.profile_id(), &new_dir).await;
        Ok(())
    } else {
        submit(
            ctx,
            Intent::Write {
                from: present,
                to: counterpart_handle(&absent, false),
            },
        )
        .await
    }
}

fn counterpart_handle(absent: &FileHandle, is_dir: bool) -> FileHandle {
    FileHandle {
        id: absent.id.clone(),
        backend: absent.backend,
        modified: absent.modified,
        size: absent.size,
        is_dir,
        exists: absent.exists,
        deleted: absent.deleted,
    }
}

/// Whether a mutation landing on `target` is permitted under `direction`
/// (spec §8 invariant 5: under PUSH no local file is ever written by the
/// engine, under PULL no remote file is ever written).
fn is_write_allowed(direction: Direction, target: Backend) -> bool {
    match direction {
        Direction::Both => true,
        Direction::Push => target == Backend::Remote,
        Direction::Pull => target == Backend::Local,
    }
}

async fn submit(ctx: &EngineContext, intent: Intent) -> Result<(), EngineError> {
    ctx.queue.submit(intent).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use syncd_core::domain::newtypes::{RemotePath, SyncPath};
    use syncd_core::domain::profile::{ConflictPolicy, Profile};
    use syncd_core::domain::runtime::InFlight;
    use syncd_core::ports::{ByteStream, Monitor, Syncer};

    use crate::context::Backends;
    use crate::queue::spawn_consumer;
    use syncd_core::domain::runtime::IgnoreEcho;

    struct FakeSyncer {
        backend: Backend,
        files: Mutex<HashMap<String, FileHandle>>,
    }

    impl FakeSyncer {
        fn new(backend: Backend, files: Vec<FileHandle>) -> Self {
            let mut map = HashMap::new();
            for f in files {
                map.insert(f.id.clone(), f);
            }
            Self { backend, files: Mutex::new(map) }
        }
    }

    #[async_trait]
    impl Syncer for FakeSyncer {
        fn backend(&self) -> Backend {
            self.backend
        }
        async fn stat(&self, id: &str) -> Result<FileHandle, EngineError> {
            Ok(self
                .files
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .unwrap_or_else(|| FileHandle::absent(id, self.backend)))
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
            size: u64,
            modified: DateTime<Utc>,
        ) -> Result<FileHandle, EngineError> {
            let h = FileHandle {
                id: id.to_string(),
                backend: self.backend,
                modified,
                size,
                is_dir: false,
                exists: true,
                deleted: false,
            };
            self.files.lock().unwrap().insert(id.to_string(), h.clone());
            Ok(h)
        }
        async fn create_dir(&self, id: &str) -> Result<FileHandle, EngineError> {
            let h = FileHandle {
                id: id.to_string(),
                backend: self.backend,
                modified: Utc::now(),
                size: 0,
                is_dir: true,
                exists: true,
                deleted: false,
            };
            self.files.lock().unwrap().insert(id.to_string(), h.clone());
            Ok(h)
        }
        async fn delete(&self, handle: &FileHandle) -> Result<(), EngineError> {
            self.files.lock().unwrap().remove(&handle.id);
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

    fn profile(direction: Direction) -> Profile {
        Profile {
            name: "docs".into(),
            direction,
            conflict_policy: ConflictPolicy::Overwrite,
            conflict_window: Duration::from_secs(30),
            ignore: vec![],
            local_root: SyncPath::new("/home/user/docs".into()).unwrap(),
            remote_root: RemotePath::new("/docs".into()).unwrap(),
            active: true,
        }
    }

    fn at(id: &str, backend: Backend, secs: i64, exists: bool) -> FileHandle {
        FileHandle {
            id: id.to_string(),
            backend,
            modified: DateTime::<Utc>::from_timestamp(secs, 0).unwrap(),
            size: 1,
            is_dir: false,
            exists,
            deleted: false,
        }
    }

    fn ctx_with(direction: Direction, local_files: Vec<FileHandle>, remote_files: Vec<FileHandle>) -> (EngineContext, Arc<FakeSyncer>, tokio::task::JoinHandle<()>) {
        let local = Arc::new(FakeSyncer::new(Backend::Local, local_files));
        let remote = Arc::new(FakeSyncer::new(Backend::Remote, remote_files));
        let backends = Arc::new(Backends {
            local: local.clone(),
            remote: remote.clone(),
            local_monitor: Arc::new(NullMonitor),
            remote_monitor: Arc::new(NullMonitor),
        });
        let ignore_echo = IgnoreEcho::new();
        let (queue, join) = spawn_consumer(backends.clone(), ignore_echo);
        let ctx = EngineContext {
            profile: profile(direction),
            backends,
            queue,
            in_flight: InFlight::new(),
        };
        (ctx, remote, join)
    }

    #[tokio::test]
    async fn new_local_file_propagates_to_remote_under_both() {
        let local_file = at("/home/user/docs/a.txt", Backend::Local, 100, true);
        let (ctx, remote, _join) = ctx_with(Direction::Both, vec![local_file.clone()], vec![]);
        handle_change(&ctx, local_file).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(remote.files.lock().unwrap().contains_key("/docs/a.txt"));
    }

    #[tokio::test]
    async fn new_local_file_under_pull_is_not_pushed() {
        let local_file = at("/home/user/docs/a.txt", Backend::Local, 100, true);
        let (ctx, remote, _join) = ctx_with(Direction::Pull, vec![local_file.clone()], vec![]);
        handle_change(&ctx, local_file).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!remote.files.lock().unwrap().contains_key("/docs/a.txt"));
    }

    #[tokio::test]
    async fn equal_mtime_pair_is_a_no_op() {
        let local_file = at("/home/user/docs/a.txt", Backend::Local, 100, true);
        let remote_file = at("/docs/a.txt", Backend::Remote, 100, true);
        let (ctx, remote, _join) = ctx_with(Direction::Both, vec![local_file.clone()], vec![remote_file.clone()]);
        handle_change(&ctx, local_file).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let stored = remote.files.lock().unwrap().get("/docs/a.txt").cloned().unwrap();
        assert_eq!(stored.modified, remote_file.modified);
    }

    #[tokio::test]
    async fn newer_remote_overwrites_older_local_under_both() {
        let local_file = at("/home/user/docs/a.txt", Backend::Local, 100, true);
        let remote_file = at("/docs/a.txt", Backend::Remote, 200, true);
        let (ctx, _remote, _join) = ctx_with(Direction::Both, vec![local_file.clone()], vec![remote_file.clone()]);
        handle_change(&ctx, remote_file.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let stored = ctx
            .backends
            .local
            .stat("/home/user/docs/a.txt")
            .await
            .unwrap();
        assert_eq!(stored.modified, remote_file.modified);
    }
}
