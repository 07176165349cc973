//! Explain command - explain why a path is in its current state.
//!
//! Filters the persisted bounded log for entries mentioning the given
//! path and prints them oldest-first, with a short suggestion line
//! derived from the most recent entry's wording.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use syncd_audit::AuditLog;
use syncd_core::domain::audit::LogEntry;

use crate::commands::profile::open_store;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct ExplainCommand {
    /// Path (or a distinctive substring of one) to explain
    pub path: String,

    /// How many matching entries to keep, most recent last
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

impl ExplainCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        let store = open_store().await?;
        let log = AuditLog::new(store, syncd_audit::DEFAULT_LOG_CAPACITY);

        info!(path = %self.path, "explaining path history");

        let matches = matching_entries(&log, &self.path, self.limit).await?;

        if matches!(format, OutputFormat::Json) {
            let entries: Vec<_> = matches
                .iter()
                .map(|e| {
                    serde_json::json!({
                        "when": e.when().to_rfc3339(),
                        "kind": e.kind().to_string(),
                        "message": e.message(),
                    })
                })
                .collect();
            formatter.print_json(&serde_json::json!({
                "path": self.path,
                "suggestions": suggestions(&matches),
                "history": entries,
            }));
            return Ok(());
        }

        if matches.is_empty() {
            formatter.info(&format!("no audit history mentions '{}'", self.path));
            formatter.info(
                "the path may have never been synced, or predates the log's retention window",
            );
            return Ok(());
        }

        formatter.success(&format!("history for: {}", self.path));
        formatter.info("");
        for entry in &matches {
            formatter.info(&format!(
                "  {} [{}] {}",
                entry.when().format("%Y-%m-%d %H:%M:%S"),
                entry.kind(),
                entry.message()
            ));
        }

        let hints = suggestions(&matches);
        if !hints.is_empty() {
            formatter.info("");
            formatter.info("Suggestions:");
            for hint in &hints {
                formatter.info(&format!("  - {hint}"));
            }
        }

        Ok(())
    }
}

/// Pages through the log looking for entries whose message contains
/// `needle`, returning up to `limit` of the most recent matches in
/// chronological order.
async fn matching_entries(log: &AuditLog, needle: &str, limit: usize) -> Result<Vec<LogEntry>> {
    const PAGE: usize = 200;
    let mut found = Vec::new();
    let mut offset = 0;
    loop {
        let page = log.page(offset, PAGE).await.context("reading audit log")?;
        if page.is_empty() {
            break;
        }
        let advanced = page.len();
        found.extend(page.into_iter().filter(|e| e.message().contains(needle)));
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

fn suggestions(entries: &[LogEntry]) -> Vec<String> {
    let Some(last) = entries.last() else {
        return Vec::new();
    };
    let message = last.message().to_ascii_lowercase();
    let mut out = Vec::new();
    if message.contains("failed permanently") {
        out.push("the last attempt failed permanently; check credentials and path permissions, then retry a manual sync".to_string());
    }
    if message.contains("renamed aside") || message.contains("conflict") {
        out.push(
            "a conflicting edit was detected; look for a renamed-aside copy next to the original"
                .to_string(),
        );
    }
    if out.is_empty() {
        out.push("no anomalies detected in recent history".to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncd_core::domain::audit::LogKind;

    #[test]
    fn suggestions_flag_permanent_failures() {
        let entries = vec![LogEntry::new(
            LogKind::Remote,
            "profile docs: /docs/a.txt failed permanently: permanent I/O error: 403",
        )];
        let hints = suggestions(&entries);
        assert!(hints.iter().any(|h| h.contains("failed permanently")));
    }

    #[test]
    fn suggestions_default_when_nothing_stands_out() {
        let entries = vec![LogEntry::new(LogKind::Both, "profile docs converged")];
        let hints = suggestions(&entries);
        assert_eq!(
            hints,
            vec!["no anomalies detected in recent history".to_string()]
        );
    }
}
