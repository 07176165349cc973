//! Config command - inspect and edit persisted daemon settings.
//!
//! Operates on the same `settings.json` the daemon reads at startup
//! (spec §6 "Configuration"): `show` prints it, `set` edits one
//! dot-notation key in place, `validate` parses it without writing
//! anything back.

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use tracing::info;

use syncd_core::config::Settings;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the current settings
    Show,
    /// Set a single setting, e.g. `remotePollingSeconds=60`
    Set {
        /// Dot-notation key (matches the JSON field name)
        key: String,
        value: String,
    },
    /// Parse the settings file and report whether it's valid
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show => Self::execute_show(format),
            ConfigCommand::Set { key, value } => Self::execute_set(key, value, format),
            ConfigCommand::Validate => Self::execute_validate(format),
        }
    }

    fn execute_show(format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let path = Settings::default_path();
        let settings = Settings::load_or_default(&path);

        if matches!(format, OutputFormat::Json) {
            formatter.print_json(&serde_json::to_value(&settings)?);
            return Ok(());
        }

        formatter.success(&format!("settings ({})", path.display()));
        formatter.info(&format!("  port: {}", settings.port));
        formatter.info(&format!("  remotePollingSeconds: {}", settings.remote_polling_seconds));
        formatter.info(&format!("  httpTimeoutSeconds: {}", settings.http_timeout_seconds));
        formatter.info(&format!("  logCapacity: {}", settings.log_capacity));
        formatter.info(&format!("  skipTray: {}", settings.skip_tray));
        formatter.info(&format!("  remoteBaseUrl: {}", settings.remote_base_url));
        formatter.info(&format!("  remoteUsername: {}", settings.remote_username));
        formatter.info(&format!(
            "  remoteToken: {}",
            if settings.remote_token.is_empty() { "(unset)" } else { "(set)" }
        ));
        Ok(())
    }

    fn execute_set(key: &str, value: &str, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let path = Settings::default_path();
        let mut settings = Settings::load_or_default(&path);

        apply_setting(&mut settings, key, value)?;
        settings.save(&path).context("failed to write settings file")?;
        info!(key, value, "updated setting");

        if matches!(format, OutputFormat::Json) {
            formatter.print_json(&serde_json::json!({"key": key, "value": value}));
        } else {
            formatter.success(&format!("{key} = {value}"));
        }
        Ok(())
    }

    fn execute_validate(format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let path = Settings::default_path();

        if !path.exists() {
            if matches!(format, OutputFormat::Json) {
                formatter.print_json(&serde_json::json!({"valid": true, "note": "no settings file, defaults apply"}));
            } else {
                formatter.info("no settings file present; the daemon will use defaults");
            }
            return Ok(());
        }

        match Settings::load(&path) {
            Ok(_) => {
                if matches!(format, OutputFormat::Json) {
                    formatter.print_json(&serde_json::json!({"valid": true}));
                } else {
                    formatter.success("settings file is valid");
                }
            }
            Err(e) => {
                if matches!(format, OutputFormat::Json) {
                    formatter.print_json(&serde_json::json!({"valid": false, "error": e.to_string()}));
                } else {
                    formatter.error(&format!("settings file is invalid: {e}"));
                }
            }
        }
        Ok(())
    }
}

/// Applies one dot-notation `key=value` edit to `settings` in place.
fn apply_setting(settings: &mut Settings, key: &str, value: &str) -> Result<()> {
    match key {
        "port" => settings.port = value.parse().context("port must be a u16")?,
        "remotePollingSeconds" => {
            settings.remote_polling_seconds = value
                .parse()
                .context("remotePollingSeconds must be a non-negative integer")?
        }
        "httpTimeoutSeconds" => {
            settings.http_timeout_seconds = value
                .parse()
                .context("httpTimeoutSeconds must be a non-negative integer")?
        }
        "logCapacity" => {
            settings.log_capacity = value
                .parse()
                .context("logCapacity must be a non-negative integer")?
        }
        "skipTray" => settings.skip_tray = value.parse().context("skipTray must be true or false")?,
        "remoteBaseUrl" => settings.remote_base_url = value.to_string(),
        "remoteUsername" => settings.remote_username = value.to_string(),
        "remoteToken" => settings.remote_token = value.to_string(),
        other => bail!("unknown setting '{other}'"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sets_known_integer_field() {
        let mut s = Settings::default();
        apply_setting(&mut s, "remotePollingSeconds", "60").unwrap();
        assert_eq!(s.remote_polling_seconds, 60);
    }

    #[test]
    fn sets_known_bool_field() {
        let mut s = Settings::default();
        apply_setting(&mut s, "skipTray", "true").unwrap();
        assert!(s.skip_tray);
    }

    #[test]
    fn sets_known_string_field() {
        let mut s = Settings::default();
        apply_setting(&mut s, "remoteBaseUrl", "https://files.example.com").unwrap();
        assert_eq!(s.remote_base_url, "https://files.example.com");
    }

    #[test]
    fn rejects_unknown_key() {
        let mut s = Settings::default();
        assert!(apply_setting(&mut s, "bogusKey", "1").is_err());
    }

    #[test]
    fn rejects_malformed_integer() {
        let mut s = Settings::default();
        assert!(apply_setting(&mut s, "port", "not-a-number").is_err());
    }
}
