//! Profile commands - manage the sync profile registry.
//!
//! Provides the `syncd profile` CLI subcommands: add a local/remote root
//! pair, list the registry, enable/disable a profile without deleting
//! it, and remove one outright.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use syncd_core::domain::profile::{ConflictPolicy, Direction, ProfileRecord};
use syncd_core::ports::StateStore;
use syncd_store::{DatabasePool, SqliteStore};

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Register a new local/remote sync pair
    Add {
        /// Human-readable name
        #[arg(long)]
        name: String,
        /// Absolute local directory
        #[arg(long)]
        local: PathBuf,
        /// Remote directory, e.g. /docs
        #[arg(long)]
        remote: String,
        /// BOTH, PUSH, or PULL
        #[arg(long, default_value = "both")]
        direction: String,
        /// OVERWRITE or RENAME
        #[arg(long, default_value = "rename")]
        conflict_policy: String,
        /// Conflict window, seconds
        #[arg(long, default_value_t = 30)]
        conflict_window_secs: u64,
        /// Ignore pattern (regex), may be repeated
        #[arg(long = "ignore")]
        ignore: Vec<String>,
    },
    /// List registered profiles
    List,
    /// Remove a profile from the registry
    Remove {
        /// Profile id, as printed by `profile list`
        id: String,
    },
    /// Mark a profile active
    Enable {
        id: String,
    },
    /// Mark a profile inactive without removing it
    Disable {
        id: String,
    },
}

impl ProfileCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        match self {
            ProfileCommand::Add {
                name,
                local,
                remote,
                direction,
                conflict_policy,
                conflict_window_secs,
                ignore,
            } => {
                self.execute_add(
                    name,
                    local,
                    remote,
                    direction,
                    conflict_policy,
                    *conflict_window_secs,
                    ignore,
                    format,
                )
                .await
            }
            ProfileCommand::List => self.execute_list(format).await,
            ProfileCommand::Remove { id } => self.execute_remove(id, format).await,
            ProfileCommand::Enable { id } => self.execute_set_active(id, true, format).await,
            ProfileCommand::Disable { id } => self.execute_set_active(id, false, format).await,
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_add(
        &self,
        name: &str,
        local: &PathBuf,
        remote: &str,
        direction: &str,
        conflict_policy: &str,
        conflict_window_secs: u64,
        ignore: &[String],
        format: OutputFormat,
    ) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let store = open_store().await?;

        let direction = parse_direction(direction)?;
        let conflict_policy = parse_conflict_policy(conflict_policy)?;

        let local_abs = if local.is_absolute() {
            local.clone()
        } else {
            std::env::current_dir()
                .context("failed to resolve current directory")?
                .join(local)
        };

        let record = ProfileRecord {
            name: name.to_string(),
            direction,
            conflict_policy,
            conflict_window_secs,
            ignore: ignore.to_vec(),
            local_path: local_abs.display().to_string(),
            remote_path: remote.to_string(),
            active: true,
        };

        let profile = record
            .clone()
            .into_profile()
            .context("profile failed validation")?;
        let id = profile.id();

        store
            .save_profile(&id, &record)
            .await
            .context("failed to save profile")?;

        info!(id = %id, "profile added");

        if matches!(format, OutputFormat::Json) {
            formatter.print_json(&serde_json::json!({"id": id, "name": name}));
        } else {
            formatter.success(&format!("profile '{name}' added: {id}"));
        }
        Ok(())
    }

    async fn execute_list(&self, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let store = open_store().await?;
        let profiles = store
            .load_all_profiles()
            .await
            .context("failed to load profiles")?;

        if matches!(format, OutputFormat::Json) {
            let json: Vec<_> = profiles
                .iter()
                .map(|(id, r)| {
                    serde_json::json!({
                        "id": id,
                        "name": r.name,
                        "direction": r.direction,
                        "conflictPolicy": r.conflict_policy,
                        "local": r.local_path,
                        "remote": r.remote_path,
                        "active": r.active,
                    })
                })
                .collect();
            formatter.print_json(&serde_json::json!({"profiles": json}));
            return Ok(());
        }

        if profiles.is_empty() {
            formatter.info("no profiles registered");
            return Ok(());
        }

        for (id, r) in &profiles {
            formatter.info(&format!(
                "{} [{}] {} -> {} ({:?}, {:?})",
                if r.active { "*" } else { " " },
                r.name,
                r.local_path,
                r.remote_path,
                r.direction,
                r.conflict_policy,
            ));
            formatter.info(&format!("    id: {id}"));
        }
        Ok(())
    }

    async fn execute_remove(&self, id: &str, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let store = open_store().await?;
        store
            .delete_profile(id)
            .await
            .context("failed to delete profile")?;
        if matches!(format, OutputFormat::Json) {
            formatter.print_json(&serde_json::json!({"id": id, "removed": true}));
        } else {
            formatter.success(&format!("profile {id} removed"));
        }
        Ok(())
    }

    async fn execute_set_active(&self, id: &str, active: bool, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let store = open_store().await?;
        let mut record = store
            .load_profile(id)
            .await
            .context("no such profile")?;
        record.active = active;
        store
            .save_profile(id, &record)
            .await
            .context("failed to save profile")?;

        if matches!(format, OutputFormat::Json) {
            formatter.print_json(&serde_json::json!({"id": id, "active": active}));
        } else {
            formatter.success(&format!(
                "profile {id} {}",
                if active { "enabled" } else { "disabled" }
            ));
        }
        Ok(())
    }
}

fn parse_direction(s: &str) -> Result<Direction> {
    match s.to_ascii_lowercase().as_str() {
        "both" => Ok(Direction::Both),
        "push" => Ok(Direction::Push),
        "pull" => Ok(Direction::Pull),
        other => anyhow::bail!("unknown direction '{other}', expected both|push|pull"),
    }
}

fn parse_conflict_policy(s: &str) -> Result<ConflictPolicy> {
    match s.to_ascii_lowercase().as_str() {
        "overwrite" => Ok(ConflictPolicy::Overwrite),
        "rename" => Ok(ConflictPolicy::Rename),
        other => anyhow::bail!("unknown conflict policy '{other}', expected overwrite|rename"),
    }
}

/// Opens the same sqlite-backed store the daemon writes to.
pub(crate) async fn open_store() -> Result<Arc<dyn StateStore>> {
    let db_path = dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("syncd")
        .join("state.db");
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).context("creating state directory")?;
    }
    let pool = DatabasePool::new(&db_path)
        .await
        .context("failed to open state store")?;
    Ok(Arc::new(SqliteStore::new(pool.pool().clone())))
}
