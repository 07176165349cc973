//! Sync command - run one foreground reconciliation pass.
//!
//! Unlike the daemon, this walks both roots of each selected profile
//! once, feeding every discovered handle through the same
//! `reconcile::handle_change` decision procedure the daemon's watcher
//! and poller drive, then tears its own queue down and reports counts.
//! There is no IPC to the running daemon: this spins up its own
//! short-lived `Syncer`/`Monitor` pair for the duration of the pass.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use syncd_core::config::Settings;
use syncd_core::domain::handle::{Backend, FileHandle};
use syncd_core::domain::profile::Profile;
use syncd_core::domain::runtime::{IgnoreEcho, InFlight};
use syncd_core::filesystem_local::LocalSyncer;
use syncd_core::ports::{Monitor, Syncer};
use syncd_engine::{spawn_consumer, Backends, EngineContext};
use syncd_http::{RemoteClient, RemoteSyncer};

use crate::commands::profile::open_store;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Only sync the profile with this id (default: every active profile)
    #[arg(long)]
    pub profile: Option<String>,

    /// Walk both roots and report what would be looked at, without
    /// reconciling anything
    #[arg(long)]
    pub dry_run: bool,
}

struct PassCounts {
    discovered: usize,
    reconciled: usize,
    transient_errors: usize,
    permanent_errors: usize,
}

impl SyncCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        let settings = Settings::load_or_default(&Settings::default_path());
        let store = open_store().await?;

        let records = store
            .load_all_profiles()
            .await
            .context("failed to load profile registry")?;
        let profiles: Vec<Profile> = records
            .into_iter()
            .filter(|(id, r)| {
                r.active && self.profile.as_deref().map_or(true, |want| want == id)
            })
            .map(|(id, r)| r.into_profile().with_context(|| format!("invalid profile record {id}")))
            .collect::<Result<Vec<_>>>()?;

        if profiles.is_empty() {
            formatter.info("no matching active profiles to synchronize");
            return Ok(());
        }

        let remote_client = Arc::new(RemoteClient::new(
            settings.remote_base_url.clone(),
            settings.remote_username.clone(),
            settings.remote_token.clone(),
            Duration::from_secs(settings.http_timeout_seconds),
        )?);
        let remote_syncer: Arc<dyn Syncer> = Arc::new(RemoteSyncer::new(remote_client));
        let ignore_echo = IgnoreEcho::new();

        let mut total = PassCounts { discovered: 0, reconciled: 0, transient_errors: 0, permanent_errors: 0 };

        for profile in profiles {
            let profile_id = profile.id();
            info!(profile_id = %profile_id, "starting one-shot sync");

            let backends = Arc::new(Backends {
                local: Arc::new(LocalSyncer::new()),
                remote: remote_syncer.clone(),
                local_monitor: Arc::new(NullMonitor) as Arc<dyn Monitor>,
                remote_monitor: Arc::new(NullMonitor) as Arc<dyn Monitor>,
            });

            let local_root = backends.local.stat(&profile.local_root.to_string()).await?;
            let remote_root = backends.remote.stat(profile.remote_root.as_str()).await?;

            let mut handles = walk(&backends, Backend::Local, local_root).await?;
            handles.extend(walk(&backends, Backend::Remote, remote_root).await?);
            total.discovered += handles.len();

            if self.dry_run {
                formatter.info(&format!(
                    "{profile_id}: would inspect {} path{}",
                    handles.len(),
                    if handles.len() == 1 { "" } else { "s" }
                ));
                continue;
            }

            let (queue, consumer) = spawn_consumer(backends.clone(), ignore_echo.clone());
            let ctx = Arc::new(EngineContext {
                profile,
                backends,
                queue,
                in_flight: InFlight::new(),
            });

            for handle in handles {
                match syncd_engine::reconcile::handle_change(&ctx, handle.clone()).await {
                    Ok(()) => total.reconciled += 1,
                    Err(e) if e.is_transient() => {
                        total.transient_errors += 1;
                        warn!(profile_id = %profile_id, id = %handle.id, error = %e, "transient failure during one-shot sync");
                    }
                    Err(e) => {
                        total.permanent_errors += 1;
                        warn!(profile_id = %profile_id, id = %handle.id, error = %e, "permanent failure during one-shot sync");
                    }
                }
            }

            drop(ctx);
            consumer.await.ok();
        }

        if matches!(format, OutputFormat::Json) {
            formatter.print_json(&serde_json::json!({
                "discovered": total.discovered,
                "reconciled": total.reconciled,
                "transientErrors": total.transient_errors,
                "permanentErrors": total.permanent_errors,
                "dryRun": self.dry_run,
            }));
            return Ok(());
        }

        if self.dry_run {
            formatter.success(&format!("dry run: {} path(s) would be inspected", total.discovered));
            return Ok(());
        }

        formatter.success(&format!(
            "reconciled {}/{} path(s)",
            total.reconciled, total.discovered
        ));
        if total.transient_errors > 0 {
            formatter.info(&format!("{} transient failure(s), will retry on next daemon run", total.transient_errors));
        }
        if total.permanent_errors > 0 {
            formatter.error(&format!("{} permanent failure(s), see `syncd audit`", total.permanent_errors));
        }

        Ok(())
    }
}

/// Iterative (stack-based) walk of one side's tree, so discovery doesn't
/// need async recursion. Directories are not submitted as handles
/// themselves — only the files beneath them, matching what the watcher
/// and poller actually hand the engine.
async fn walk(backends: &Backends, backend: Backend, root: FileHandle) -> Result<Vec<FileHandle>> {
    let mut found = Vec::new();
    let mut stack = vec![root];
    while let Some(dir) = stack.pop() {
        if !dir.exists {
            continue;
        }
        if !dir.is_dir {
            found.push(dir);
            continue;
        }
        let children = backends.syncer(backend).children(&dir).await?;
        for child in children {
            if child.is_dir {
                stack.push(child);
            } else {
                found.push(child);
            }
        }
    }
    Ok(found)
}

struct NullMonitor;

#[async_trait::async_trait]
impl Monitor for NullMonitor {
    async fn subscribe(&self, _profile_id: &str, _dir: &FileHandle) {}
    async fn unsubscribe(&self, _profile_id: &str, _dir: &FileHandle) {}
}
