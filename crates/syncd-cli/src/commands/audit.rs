//! Audit command - page through the persisted bounded log.
//!
//! Provides `syncd audit`, which lists recent log entries newest-last,
//! optionally filtered by a relative or absolute `--since` cutoff and a
//! `--kind` (local/remote/both).

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use clap::Args;
use tracing::info;

use syncd_audit::AuditLog;
use syncd_core::domain::audit::{LogEntry, LogKind};

use crate::commands::profile::open_store;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct AuditCommand {
    /// Only show entries at or after this time: a relative duration like
    /// "1h", "30m", "2d", "1w", or an absolute date/datetime.
    #[arg(long)]
    pub since: Option<String>,

    /// Maximum number of entries to show
    #[arg(long, default_value_t = 50)]
    pub limit: usize,

    /// Only show entries of this kind: local, remote, or both
    #[arg(long)]
    pub kind: Option<String>,
}

impl AuditCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        let store = open_store().await?;
        let log = AuditLog::new(store, syncd_audit::DEFAULT_LOG_CAPACITY);

        let since = self
            .since
            .as_deref()
            .map(parse_since)
            .transpose()
            .context("invalid --since value")?;
        let kind_filter = self.kind.as_deref().map(parse_kind).transpose()?;

        info!(?since, limit = self.limit, "reading audit log");

        let entries = read_matching(&log, since, kind_filter, self.limit).await?;

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
            formatter.info("no matching audit entries");
            return Ok(());
        }

        formatter.success(&format!(
            "{} audit entr{}",
            entries.len(),
            if entries.len() == 1 { "y" } else { "ies" }
        ));
        formatter.info("");
        for entry in &entries {
            formatter.info(&format!(
                "  {} [{:<6}] {}",
                entry.when().format("%Y-%m-%d %H:%M:%S"),
                entry.kind(),
                truncate_string(entry.message(), 100),
            ));
        }

        Ok(())
    }
}

async fn read_matching(
    log: &AuditLog,
    since: Option<DateTime<Utc>>,
    kind: Option<LogKind>,
    limit: usize,
) -> Result<Vec<LogEntry>> {
    const PAGE: usize = 200;
    let mut kept = Vec::new();
    let mut offset = 0;
    loop {
        let page = log.page(offset, PAGE).await.context("reading audit log")?;
        if page.is_empty() {
            break;
        }
        let advanced = page.len();
        kept.extend(page.into_iter().filter(|e| {
            let after_cutoff = match since {
                Some(s) => e.when() >= s,
                None => true,
            };
            let right_kind = match kind {
                Some(k) => e.kind() == k,
                None => true,
            };
            after_cutoff && right_kind
        }));
        offset += advanced;
        if advanced < PAGE {
            break;
        }
    }
    if kept.len() > limit {
        kept.drain(0..kept.len() - limit);
    }
    Ok(kept)
}

fn parse_kind(s: &str) -> Result<LogKind> {
    match s.to_ascii_lowercase().as_str() {
        "local" => Ok(LogKind::Local),
        "remote" => Ok(LogKind::Remote),
        "both" => Ok(LogKind::Both),
        other => anyhow::bail!("unknown kind '{other}', expected local|remote|both"),
    }
}

/// Parses `--since` as either a relative duration ("1h", "30m", "2d",
/// "1w") or an absolute date (`2024-01-15`) / datetime
/// (`2024-01-15 14:30:00`).
fn parse_since(s: &str) -> Result<DateTime<Utc>> {
    if let Some(duration) = parse_relative_duration(s) {
        return Ok(Utc::now() - duration);
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let dt = date
            .and_hms_opt(0, 0, 0)
            .context("invalid date components")?;
        return Ok(Utc.from_utc_datetime(&dt));
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&dt));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    anyhow::bail!("could not parse '{s}' as a relative duration or a date/datetime")
}

/// Parses a relative duration like "1h", "30m", "2d", "1w". Returns
/// `None` if `s` doesn't match the `<number><unit>` shape at all (so the
/// caller can fall through to absolute-date parsing).
fn parse_relative_duration(s: &str) -> Option<chrono::Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let unit = s.chars().last()?;
    let (number_part, multiplier) = match unit {
        's' => (&s[..s.len() - 1], 1i64),
        'm' => (&s[..s.len() - 1], 60),
        'h' => (&s[..s.len() - 1], 3600),
        'd' => (&s[..s.len() - 1], 86_400),
        'w' => (&s[..s.len() - 1], 604_800),
        _ => return None,
    };
    let amount: i64 = number_part.parse().ok()?;
    Some(chrono::Duration::seconds(amount * multiplier))
}

/// Truncates `s` to at most `max_len` characters, appending "..." if it
/// was cut.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
