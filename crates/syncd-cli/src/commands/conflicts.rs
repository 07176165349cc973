//! Conflicts command - surface recent conflict resolutions.
//!
//! Conflicts are resolved synchronously and in-line by the engine's
//! decision procedure (spec §4.D Step 6); there is no separate queryable
//! "pending conflicts" bucket to page through. This command instead
//! pages the persisted log looking for rename-aside/conflict wording,
//! the same technique `syncd explain` uses for path history.

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use syncd_audit::AuditLog;
use syncd_core::domain::audit::LogEntry;

use crate::commands::profile::open_store;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConflictsCommand {
    /// List recent conflict-related log entries
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

impl ConflictsCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        match self {
            ConflictsCommand::List { limit } => self.execute_list(*limit, format).await,
        }
    }

    async fn execute_list(&self, limit: usize, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        let store = open_store().await?;
        let log = AuditLog::new(store, syncd_audit::DEFAULT_LOG_CAPACITY);

        info!(limit, "scanning log for conflict-related entries");
        let entries = conflict_entries(&log, limit).await?;

        if matches!(format, OutputFormat::Json) {
            let json: Vec<_> = entries
                .iter()
                .map(|e| {
                    serde_json::json!({
                        "when": e.when().to_rfc3339(),
                        "kind": e.kind().to_string(),
                        "message": e.message(),
                    })
                })
                .collect();
            formatter.print_json(&serde_json::json!({"count": entries.len(), "entries": json}));
            return Ok(());
        }

        if entries.is_empty() {
            formatter.info("no conflict-related entries in the retained log window");
            return Ok(());
        }

        formatter.success(&format!(
            "{} conflict-related entr{}",
            entries.len(),
            if entries.len() == 1 { "y" } else { "ies" }
        ));
        for entry in &entries {
            formatter.info(&format!(
                "  {} [{}] {}",
                entry.when().format("%Y-%m-%d %H:%M:%S"),
                entry.kind(),
                entry.message(),
            ));
        }
        Ok(())
    }
}

const KEYWORDS: &[&str] = &["conflict", "renamed aside", "overwrit"];

async fn conflict_entries(log: &AuditLog, limit: usize) -> Result<Vec<LogEntry>> {
    const PAGE: usize = 200;
    let mut found = Vec::new();
    let mut offset = 0;
    loop {
        let page = log.page(offset, PAGE).await.context("reading audit log")?;
        if page.is_empty() {
            break;
        }
        let advanced = page.len();
        found.extend(page.into_iter().filter(|e| {
            let lower = e.message().to_ascii_lowercase();
            KEYWORDS.iter().any(|k| lower.contains(k))
        }));
        offset += advanced;
        if advanced < PAGE {
            break;
        }
    }
    if found.len() > limit {
        found.drain(0..found.len() - limit);
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_matching_is_case_insensitive() {
        let message = "profile docs: /a.txt failed permanently: permanent I/O error: Conflict";
        let lower = message.to_ascii_lowercase();
        assert!(KEYWORDS.iter().any(|k| lower.contains(k)));
    }

    #[test]
    fn non_matching_message_is_excluded() {
        let message = "profile docs converged";
        let lower = message.to_ascii_lowercase();
        assert!(!KEYWORDS.iter().any(|k| lower.contains(k)));
    }
}
