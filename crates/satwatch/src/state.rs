// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent registry of currently-open alerts.
//!
//! The in-memory map is authoritative; every mutation mirrors the whole map
//! to a single JSON document so open alerts survive restarts. Writes go
//! through a temp file and an atomic rename. A write failure is logged and
//! swallowed — losing the mirror must never take the monitor down.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::report::PrtgDownAlert;

/// One open alert, keyed in the store by `{kind}_{gateway}_{name}`.
///
/// Serializes as `{ "type": ..., "details": ..., "gateway": ... }` — the
/// on-disk shape older deployments already wrote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveAlert {
    #[serde(flatten)]
    pub details: AlertDetails,
    pub gateway: String,
}

/// Per-kind detail payload, tagged by the alert kind.
///
/// An entry whose tag is not recognized on reload is dropped with a warning
/// rather than failing startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details", rename_all = "snake_case")]
pub enum AlertDetails {
    Satnet(SatnetState),
    Modulator(ModemState),
    Demodulator(ModemState),
    Prtg(PrtgDownAlert),
}

/// Detail payload for a degraded satnet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatnetState {
    pub name: String,
    pub fwd_kbps: f64,
    pub rtn_kbps: f64,
    /// Stored as `YYYY-MM-DDTHH:MM:SS` WIB wall time; absent when the
    /// queried window had no healthy sample.
    #[serde(default)]
    pub start_issue: Option<String>,
}

/// Detail payload for a down modulator/demodulator. Field names keep the
/// capitalized keys historical state files were written with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModemState {
    #[serde(rename = "DeviceName")]
    pub device_name: String,
    #[serde(rename = "AlarmState")]
    pub alarm_state: String,
    /// DOWN-onset wall time, `YYYY-MM-DDTHH:MM:SS` in WIB.
    #[serde(rename = "UpdatedAt")]
    pub updated_at: String,
}

/// Mutex-guarded alert map mirrored to a JSON file.
pub struct StateStore {
    path: PathBuf,
    alerts: Mutex<HashMap<String, ActiveAlert>>,
}

impl StateStore {
    /// Load the store from `path`.
    ///
    /// Missing or empty file → empty map. A file that is not a JSON object
    /// is a fatal configuration error unless `reset_on_corrupt` is set, in
    /// which case the store logs and starts empty.
    pub fn load(path: impl Into<PathBuf>, reset_on_corrupt: bool) -> anyhow::Result<Self> {
        let path = path.into();
        let alerts = match Self::read_map(&path) {
            Ok(map) => map,
            Err(e) if reset_on_corrupt => {
                warn!(file = %path.display(), err = %e, "state file unreadable, starting empty");
                HashMap::new()
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("malformed state file {} (pass --state-reset-on-corrupt to discard)", path.display())
                });
            }
        };
        Ok(Self { path, alerts: Mutex::new(alerts) })
    }

    fn read_map(path: &Path) -> anyhow::Result<HashMap<String, ActiveAlert>> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e).context("read state file"),
        };
        if raw.trim().is_empty() {
            return Ok(HashMap::new());
        }
        let doc: HashMap<String, serde_json::Value> =
            serde_json::from_str(&raw).context("parse state file")?;
        let mut map = HashMap::with_capacity(doc.len());
        for (key, value) in doc {
            match serde_json::from_value::<ActiveAlert>(value) {
                Ok(alert) => {
                    map.insert(key, alert);
                }
                Err(e) => {
                    warn!(key, err = %e, "dropping state entry with unrecognized shape");
                }
            }
        }
        Ok(map)
    }

    /// Independent copy of the current map; callers iterate without the lock.
    pub fn snapshot(&self) -> HashMap<String, ActiveAlert> {
        self.lock().clone()
    }

    pub fn get(&self, key: &str) -> Option<ActiveAlert> {
        self.lock().get(key).cloned()
    }

    /// Idempotent insert/overwrite. Persists the whole map.
    pub fn put(&self, key: impl Into<String>, alert: ActiveAlert) {
        let mut alerts = self.lock();
        alerts.insert(key.into(), alert);
        self.persist(&alerts);
    }

    /// No-op if absent; persists only when a removal occurred.
    pub fn remove(&self, key: &str) {
        let mut alerts = self.lock();
        if alerts.remove(key).is_some() {
            self.persist(&alerts);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, ActiveAlert>> {
        match self.alerts.lock() {
            Ok(guard) => guard,
            // A poisoned lock means a panicking writer; the map itself is
            // still structurally sound, so keep serving it.
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Mirror the map to disk; failures are logged, never propagated.
    fn persist(&self, alerts: &HashMap<String, ActiveAlert>) {
        if let Err(e) = self.write_file(alerts) {
            error!(file = %self.path.display(), err = %e, "failed to persist alert state");
        }
    }

    fn write_file(&self, alerts: &HashMap<String, ActiveAlert>) -> anyhow::Result<()> {
        let parent = self.path.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent).context("create state directory")?;
        let json = serde_json::to_string_pretty(alerts).context("encode state")?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent).context("create temp state file")?;
        tmp.write_all(json.as_bytes()).context("write temp state file")?;
        tmp.persist(&self.path).context("replace state file")?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
