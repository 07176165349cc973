//! syncd daemon — the background synchronization service (spec §5).
//!
//! Loads settings and the persistent store, starts the two change
//! sources (the local kernel watcher and the remote snapshot poller),
//! spins up one [`EngineContext`] plus consumer and retry drainer per
//! active profile, and dispatches every `(profile_id, FileHandle)` pair
//! either source emits into `reconcile::handle_change`. Runs until
//! SIGINT/SIGTERM, then tears both change sources down and drains.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use syncd_audit::AuditLog;
use syncd_core::config::Settings;
use syncd_core::domain::audit::LogKind;
use syncd_core::domain::handle::{Backend, FileHandle};
use syncd_core::domain::profile::Profile;
use syncd_core::domain::runtime::{IgnoreEcho, InFlight};
use syncd_core::filesystem_local::LocalSyncer;
use syncd_core::ports::{Monitor, StateStore, Syncer};
use syncd_engine::{spawn_consumer, Backends, EngineContext, RemotePoller, RetryQueue};
use syncd_http::{RemoteClient, RemoteSyncer};
use syncd_store::{DatabasePool, SqliteStore};
use syncd_watch::LocalWatcher;

/// Tick between retry-drainer sweeps per profile.
const RETRY_TICK: Duration = Duration::from_secs(5);
/// Settle delay between a raw local kernel event and its dispatch.
const DEBOUNCE: Duration = Duration::from_millis(500);

/// Everything the dispatch loop needs for one active profile.
struct ActiveProfile {
    ctx: Arc<EngineContext>,
    retry: Arc<RetryQueue>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let settings = Settings::load_or_default(&Settings::default_path());
    info!(path = ?Settings::default_path(), "loaded settings");

    let db_path = dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("syncd")
        .join("state.db");
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("creating state directory")?;
    }
    let pool = DatabasePool::new(&db_path).await.context("opening state store")?;
    let store: Arc<dyn StateStore> = Arc::new(SqliteStore::new(pool.pool().clone()));
    let audit = Arc::new(AuditLog::new(store.clone(), settings.log_capacity));

    let records = store.load_all_profiles().await.context("loading profile registry")?;
    let profiles: Vec<Profile> = records
        .into_iter()
        .filter(|(_, r)| r.active)
        .map(|(id, r)| {
            r.into_profile()
                .with_context(|| format!("invalid profile record {id}"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    if profiles.is_empty() {
        warn!("no active profiles configured, nothing to synchronize");
    }

    let ignore_echo = IgnoreEcho::new();

    let (watcher, mut watcher_rx) =
        LocalWatcher::start(ignore_echo.clone(), DEBOUNCE).context("starting local watcher")?;

    let remote_client = Arc::new(RemoteClient::new(
        settings.remote_base_url.clone(),
        settings.remote_username.clone(),
        settings.remote_token.clone(),
        Duration::from_secs(settings.http_timeout_seconds),
    )?);
    let remote_syncer: Arc<dyn Syncer> = Arc::new(RemoteSyncer::new(remote_client));

    let (poller, mut poller_rx) = RemotePoller::start(
        remote_syncer.clone(),
        store.clone(),
        ignore_echo.clone(),
        Duration::from_secs(settings.remote_polling_seconds),
    );

    let mut active: HashMap<String, ActiveProfile> = HashMap::new();

    for profile in profiles {
        let profile_id = profile.id();
        let backends = Arc::new(Backends {
            local: Arc::new(LocalSyncer::new()),
            remote: remote_syncer.clone(),
            local_monitor: watcher.clone() as Arc<dyn Monitor>,
            remote_monitor: poller.clone() as Arc<dyn Monitor>,
        });

        let local_root = backends.local.stat(&profile.local_root.to_string()).await?;
        let remote_root = backends.remote.stat(profile.remote_root.as_str()).await?;
        backends.local_monitor.subscribe(&profile_id, &local_root).await;
        backends.remote_monitor.subscribe(&profile_id, &remote_root).await;

        let (queue, _consumer) = spawn_consumer(backends.clone(), ignore_echo.clone());
        let ctx = Arc::new(EngineContext {
            profile,
            backends,
            queue,
            in_flight: InFlight::new(),
        });
        let retry = RetryQueue::new();

        tokio::spawn(syncd_engine::retry::run(ctx.clone(), retry.clone(), poller.clone(), RETRY_TICK));

        audit.record(LogKind::Both, format!("profile {profile_id} started")).await.ok();
        active.insert(profile_id, ActiveProfile { ctx, retry });
    }

    info!(profiles = active.len(), "syncd daemon running");

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("installing SIGTERM handler")?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("received SIGINT, shutting down");
                break;
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                break;
            }
            Some((profile_id, handle)) = watcher_rx.recv() => {
                dispatch(&active, &audit, profile_id, handle).await;
            }
            Some((profile_id, handle)) = poller_rx.recv() => {
                dispatch(&active, &audit, profile_id, handle).await;
            }
        }
    }

    shutdown(watcher, poller).await;
    Ok(())
}

/// Routes one observed change to its profile's engine, pushing
/// transient failures onto that profile's retry queue (spec §4.E) and
/// persisting permanent ones to the audit trail.
async fn dispatch(
    active: &HashMap<String, ActiveProfile>,
    audit: &Arc<AuditLog>,
    profile_id: String,
    handle: FileHandle,
) {
    let Some(ap) = active.get(&profile_id) else {
        return;
    };
    match syncd_engine::reconcile::handle_change(&ap.ctx, handle.clone()).await {
        Ok(()) => {}
        Err(e) if e.is_transient() => {
            ap.retry.push(handle);
        }
        Err(e) => {
            error!(profile_id, id = %handle.id, error = %e, "permanent sync failure");
            audit
                .record(
                    backend_kind(handle.backend),
                    format!("{profile_id}: {} failed permanently: {e}", handle.id),
                )
                .await
                .ok();
        }
    }
}

fn backend_kind(backend: Backend) -> LogKind {
    match backend {
        Backend::Local => LogKind::Local,
        Backend::Remote => LogKind::Remote,
    }
}

/// Spec §5 `daemon.shutdown()`: stops both watchers before returning.
/// The retry channel and store close implicitly as their `Arc`s drop.
async fn shutdown(watcher: Arc<LocalWatcher>, poller: Arc<RemotePoller>) {
    watcher.stop().await;
    poller.stop().await;
}
