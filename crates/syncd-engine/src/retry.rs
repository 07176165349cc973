//! Retry drainer (spec §4.E "Retry").
//!
//! Errors produced by enqueued mutations are converted into retry
//! records holding the pair, the original error, and a retry count.
//! Retries only drain while `P.in_flight == 0` and the remote poller is
//! paused, so a retry always re-evaluates against quiescent state
//! rather than racing a pass already in flight.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{info, warn};

use syncd_core::domain::errors::EngineError;
use syncd_core::domain::handle::FileHandle;

use crate::context::EngineContext;
use crate::poller::RemotePoller;
use crate::reconcile;

const MAX_ATTEMPTS: u32 = 3;

/// A mutation that failed transiently and is waiting to be replayed.
#[derive(Debug, Clone)]
struct RetryRecord {
    changed: FileHandle,
    attempts: u32,
}

/// Per-profile FIFO of pending retries, shared between `dispatch_change`
/// (which pushes) and the drainer loop (which pops).
#[derive(Default)]
pub struct RetryQueue {
    records: Mutex<VecDeque<RetryRecord>>,
}

impl RetryQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, changed: FileHandle) {
        self.records.lock().unwrap().push_back(RetryRecord { changed, attempts: 0 });
    }

    fn pop_front(&self) -> Option<RetryRecord> {
        self.records.lock().unwrap().pop_front()
    }

    fn push_back(&self, record: RetryRecord) {
        self.records.lock().unwrap().push_back(record);
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }
}

/// Runs the drain loop for one profile until its `EngineContext`'s queue
/// is torn down. Coordinates with `poller` via `pause`/`resume` so every
/// retried record is re-evaluated against a quiescent view.
pub async fn run(
    ctx: Arc<EngineContext>,
    queue: Arc<RetryQueue>,
    poller: Arc<RemotePoller>,
    tick: Duration,
) {
    loop {
        tokio::time::sleep(tick).await;
        if queue.is_empty() {
            continue;
        }
        drain_once(&ctx, &queue, &poller).await;
    }
}

async fn drain_once(ctx: &EngineContext, queue: &RetryQueue, poller: &RemotePoller) {
    let profile_id = ctx.profile_id();
    if ctx.in_flight.count(&profile_id) != 0 {
        // Another invocation is mid-flight; try again next tick.
        return;
    }

    poller.pause();
    while let Some(mut record) = queue.pop_front() {
        record.attempts += 1;
        match reconcile::handle_change(ctx, record.changed.clone()).await {
            Ok(()) => {
                info!(profile_id, id = %record.changed.id, "retry succeeded");
            }
            Err(e) if e.is_transient() && record.attempts < MAX_ATTEMPTS => {
                queue.push_back(record);
            }
            Err(e) => {
                log_dropped(&profile_id, &record.changed.id, &e, record.attempts);
            }
        }
    }
    poller.resume();
}

fn log_dropped(profile_id: &str, id: &str, error: &EngineError, attempts: u32) {
    warn!(profile_id, id, attempts, error = %error, "retry exhausted, dropping record");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_pop_preserves_order() {
        let q = RetryQueue::new();
        q.push(FileHandle::absent("/a", syncd_core::domain::handle::Backend::Local));
        q.push(FileHandle::absent("/b", syncd_core::domain::handle::Backend::Local));
        let first = q.pop_front().unwrap();
        assert_eq!(first.changed.id, "/a");
        assert_eq!(first.attempts, 0);
    }

    #[test]
    fn empty_queue_reports_empty() {
        let q = RetryQueue::new();
        assert!(q.is_empty());
        q.push(FileHandle::absent("/a", syncd_core::domain::handle::Backend::Local));
        assert!(!q.is_empty());
    }
}
