//! Status command - summarize registered profiles and recent activity.
//!
//! The CLI is a separate process from the daemon with no IPC channel
//! between them (spec's admin surface is a batch command set, not a
//! live control plane), so this reports persisted state only: the
//! profile registry and a tail of the audit log, rather than in-flight
//! counts only the running daemon process holds.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use syncd_audit::AuditLog;

use crate::commands::profile::open_store;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Only show this profile's entry and history
    #[arg(long)]
    pub profile: Option<String>,

    /// How many recent audit entries to tail
    #[arg(long, default_value_t = 10)]
    pub recent: usize,
}

impl StatusCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        let store = open_store().await?;
        let records = store
            .load_all_profiles()
            .await
            .context("failed to load profile registry")?;
        let records: Vec<_> = records
            .into_iter()
            .filter(|(id, _)| self.profile.as_deref().map_or(true, |want| want == id))
            .collect();

        let log = AuditLog::new(store, syncd_audit::DEFAULT_LOG_CAPACITY);
        info!(recent = self.recent, "reading recent audit tail");
        let recent = log
            .page(0, self.recent)
            .await
            .context("reading audit log")?;

        if matches!(format, OutputFormat::Json) {
            let profiles: Vec<_> = records
                .iter()
                .map(|(id, r)| {
                    serde_json::json!({
                        "id": id,
                        "name": r.name,
                        "active": r.active,
                        "direction": r.direction,
                        "local": r.local_path,
                        "remote": r.remote_path,
                    })
                })
                .collect();
            let history: Vec<_> = recent
                .iter()
                .map(|e| {
                    serde_json::json!({
                        "when": e.when().to_rfc3339(),
                        "kind": e.kind().to_string(),
                        "message": e.message(),
                    })
                })
                .collect();
            formatter.print_json(&serde_json::json!({"profiles": profiles, "recent": history}));
            return Ok(());
        }

        if records.is_empty() {
            formatter.info("no profiles registered; see `syncd profile add`");
            return Ok(());
        }

        let active_count = records.iter().filter(|(_, r)| r.active).count();
        formatter.success(&format!(
            "{}/{} profile(s) active",
            active_count,
            records.len()
        ));
        formatter.info("");
        for (id, r) in &records {
            formatter.info(&format!(
                "{} {} — {} <-> {} ({:?})",
                if r.active { "*" } else { " " },
                r.name,
                r.local_path,
                r.remote_path,
                r.direction,
            ));
            formatter.info(&format!("    id: {id}"));
        }

        if !recent.is_empty() {
            formatter.info("");
            formatter.info("recent activity:");
            for entry in &recent {
                formatter.info(&format!(
                    "  {} [{}] {}",
                    entry.when().format("%Y-%m-%d %H:%M:%S"),
                    entry.kind(),
                    entry.message(),
                ));
            }
        }

        Ok(())
    }
}
