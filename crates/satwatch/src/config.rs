// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashSet;
use std::path::PathBuf;

use clap::Parser;

use crate::report::Gateway;

/// Satellite-gateway monitoring daemon with a Telegram operator surface.
#[derive(Debug, Parser)]
#[command(name = "satwatch", version, about)]
pub struct Config {
    /// Telegram bot token.
    #[arg(long, env = "TELEGRAM_BELLA_TOKEN", hide_env_values = true)]
    pub telegram_token: String,

    /// Chat ID that receives alert notifications.
    #[arg(long, env = "TELEGRAM_BELLA_GROUP_ID", allow_hyphen_values = true)]
    pub telegram_chat_id: String,

    /// Comma-separated numeric user IDs allowed to run admin commands.
    #[arg(long, env = "AUTHORIZED_TELEGRAM_IDS")]
    pub authorized_telegram_ids: String,

    /// Cron expression applied to every registered checker.
    #[arg(long, env = "CRON_SCHEDULE")]
    pub cron_schedule: String,

    /// PRTG server base URL.
    #[arg(long, env = "PRTG_URL")]
    pub prtg_url: String,

    /// PRTG API token.
    #[arg(long, env = "PRTG_API_TOKEN", hide_env_values = true)]
    pub prtg_api_token: String,

    /// IPTX sensor IDs, one per gateway.
    #[arg(long, env = "IPTX_JYP")]
    pub iptx_jyp: String,
    #[arg(long, env = "IPTX_MNK")]
    pub iptx_mnk: String,
    #[arg(long, env = "IPTX_TMK")]
    pub iptx_tmk: String,

    /// NIF sensor IDs, one per gateway.
    #[arg(long, env = "NIF_JYP")]
    pub nif_jyp: String,
    #[arg(long, env = "NIF_MNK")]
    pub nif_mnk: String,
    #[arg(long, env = "NIF_TMK")]
    pub nif_tmk: String,

    /// Gateway API base URLs per site.
    #[arg(long, env = "G1G_URL")]
    pub g1g_url: String,
    #[arg(long, env = "G1K_URL")]
    pub g1k_url: String,
    #[arg(long, env = "G1L_URL")]
    pub g1l_url: String,

    /// Gateway API credentials.
    #[arg(long, env = "API_EMAIL")]
    pub api_email: String,
    #[arg(long, env = "API_PASSWORD", hide_env_values = true)]
    pub api_password: String,

    /// Directory holding the JSON log and the persisted alert state.
    #[arg(long, env = "SATWATCH_LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,

    /// Discard a malformed state file instead of refusing to start.
    #[arg(long, env = "STATE_RESET_ON_CORRUPT")]
    pub state_reset_on_corrupt: bool,
}

impl Config {
    /// Reject empty values in required settings after parsing. clap ensures
    /// presence; an exported-but-empty variable must be equally fatal.
    pub fn validate(&self) -> anyhow::Result<()> {
        let required: [(&str, &str); 16] = [
            ("TELEGRAM_BELLA_TOKEN", &self.telegram_token),
            ("TELEGRAM_BELLA_GROUP_ID", &self.telegram_chat_id),
            ("AUTHORIZED_TELEGRAM_IDS", &self.authorized_telegram_ids),
            ("CRON_SCHEDULE", &self.cron_schedule),
            ("PRTG_URL", &self.prtg_url),
            ("PRTG_API_TOKEN", &self.prtg_api_token),
            ("IPTX_JYP", &self.iptx_jyp),
            ("IPTX_MNK", &self.iptx_mnk),
            ("IPTX_TMK", &self.iptx_tmk),
            ("NIF_JYP", &self.nif_jyp),
            ("NIF_MNK", &self.nif_mnk),
            ("NIF_TMK", &self.nif_tmk),
            ("G1G_URL", &self.g1g_url),
            ("G1K_URL", &self.g1k_url),
            ("G1L_URL", &self.g1l_url),
            ("API_EMAIL", &self.api_email),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                anyhow::bail!("{name} must be set and non-empty");
            }
        }
        Ok(())
    }

    /// Parsed admin allow-list; malformed entries are skipped.
    pub fn authorized_ids(&self) -> HashSet<i64> {
        self.authorized_telegram_ids
            .split(',')
            .filter_map(|id| id.trim().parse::<i64>().ok())
            .collect()
    }

    pub fn nif_sensor(&self, gateway: Gateway) -> &str {
        match gateway {
            Gateway::Jayapura => &self.nif_jyp,
            Gateway::Manokwari => &self.nif_mnk,
            Gateway::Timika => &self.nif_tmk,
        }
    }

    pub fn iptx_sensor(&self, gateway: Gateway) -> &str {
        match gateway {
            Gateway::Jayapura => &self.iptx_jyp,
            Gateway::Manokwari => &self.iptx_mnk,
            Gateway::Timika => &self.iptx_tmk,
        }
    }

    pub fn state_file(&self) -> PathBuf {
        self.log_dir.join("active_alerts.json")
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join("satwatch.log")
    }
}

/// Connection settings for one configured database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub host: String,
    pub port: String,
    pub user: String,
    pub pass: String,
    pub name: String,
}

/// The two per-gateway database families: DB-ONE (modem tables) and
/// DB-FIVE (satnet & terminal KPI). A family member is configured iff its
/// `_USERNAME` variable is non-empty.
#[derive(Debug, Default)]
pub struct DbFamilies {
    one: [Option<DbConfig>; 3],
    five: [Option<DbConfig>; 3],
}

impl DbFamilies {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::with_lookup(|name| std::env::var(name).ok())
    }

    /// Inner constructor taking a lookup function for testability.
    fn with_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut families = Self::default();
        for gateway in Gateway::ALL {
            let idx = gateway as usize;
            families.one[idx] = db_config(&format!("DB_ONE_{}", gateway.code()), &get)?;
            families.five[idx] = db_config(&format!("DB_FIVE_{}", gateway.code()), &get)?;
        }
        Ok(families)
    }

    pub fn one(&self, gateway: Gateway) -> Option<&DbConfig> {
        self.one[gateway as usize].as_ref()
    }

    pub fn five(&self, gateway: Gateway) -> Option<&DbConfig> {
        self.five[gateway as usize].as_ref()
    }
}

fn db_config(
    prefix: &str,
    get: &impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Option<DbConfig>> {
    let user = get(&format!("{prefix}_USERNAME")).unwrap_or_default();
    if user.is_empty() {
        return Ok(None);
    }
    let require = |suffix: &str| -> anyhow::Result<String> {
        let name = format!("{prefix}_{suffix}");
        match get(&name) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => anyhow::bail!("{name} must be set and non-empty"),
        }
    };
    Ok(Some(DbConfig {
        host: require("HOST")?,
        port: require("PORT")?,
        user,
        pass: get(&format!("{prefix}_PASS")).unwrap_or_default(),
        name: require("NAME")?,
    }))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
