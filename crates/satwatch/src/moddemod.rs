// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Modulator/demodulator health evaluation against the DB-ONE modem store.
//!
//! `status = 0` marks a faulted device; soft-deleted rows are ignored. The
//! two device kinds are evaluated independently each tick so a failure in
//! one table never hides transitions in the other.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDateTime;
use sqlx::postgres::PgPool;
use tracing::{error, info, warn};

use crate::notify::EventSink;
use crate::report::{DeviceKind, Gateway, ModemDownAlert, ModemUpAlert};
use crate::state::{ActiveAlert, AlertDetails, ModemState, StateStore};
use crate::wib;

/// One faulted device row.
#[derive(Debug, Clone, PartialEq)]
pub struct ModemRow {
    pub device_name: String,
    pub alarm_state: String,
    pub updated_at: NaiveDateTime,
}

/// Typed reads from DB-ONE.
pub trait ModemSource: Send + Sync {
    fn down_devices(
        &self,
        kind: DeviceKind,
    ) -> impl Future<Output = anyhow::Result<Vec<ModemRow>>> + Send;
}

pub struct PgModemSource {
    pool: PgPool,
}

impl PgModemSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct DeviceRow {
    device_name: String,
    alarm_state: String,
    updated_at: NaiveDateTime,
}

impl ModemSource for PgModemSource {
    async fn down_devices(&self, kind: DeviceKind) -> anyhow::Result<Vec<ModemRow>> {
        let sql = match kind {
            DeviceKind::Modulator => {
                r#"
                SELECT device_name, alarm_state, updated_at
                FROM modulators
                WHERE status = 0 AND deleted_at IS NULL
                "#
            }
            DeviceKind::Demodulator => {
                r#"
                SELECT device_name, alarm_state, updated_at
                FROM demodulators
                WHERE status = 0 AND deleted_at IS NULL
                "#
            }
        };
        let rows: Vec<DeviceRow> = sqlx::query_as(sql).fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|r| ModemRow {
                device_name: r.device_name,
                alarm_state: r.alarm_state,
                updated_at: r.updated_at,
            })
            .collect())
    }
}

/// Per-gateway modulator/demodulator checker.
pub struct ModemChecker<S, K> {
    source: S,
    sink: K,
    state: Arc<StateStore>,
    gateway: Gateway,
}

fn key_prefix(kind: DeviceKind, gateway: Gateway) -> String {
    format!("{}_{}_", kind.as_str(), gateway.friendly())
}

impl<S: ModemSource, K: EventSink> ModemChecker<S, K> {
    pub fn new(source: S, sink: K, state: Arc<StateStore>, gateway: Gateway) -> Self {
        Self { source, sink, state, gateway }
    }

    /// One scheduled invocation: both device kinds, independently.
    pub async fn run(&self) {
        for kind in [DeviceKind::Modulator, DeviceKind::Demodulator] {
            if let Err(e) = self.check_kind(kind).await {
                error!(
                    gateway = self.gateway.friendly(),
                    kind = kind.as_str(),
                    err = %e,
                    "modem check aborted"
                );
            }
        }
    }

    async fn check_kind(&self, kind: DeviceKind) -> anyhow::Result<()> {
        let down = self.source.down_devices(kind).await?;

        let gateway = self.gateway.friendly();
        let prefix = key_prefix(kind, self.gateway);
        let prior = self.state.snapshot();

        if !down.is_empty() {
            info!(gateway, kind = kind.as_str(), count = down.len(), "down devices detected");
            let alerts: Vec<ModemDownAlert> = down
                .iter()
                .map(|row| ModemDownAlert {
                    gateway: gateway.to_owned(),
                    device_name: row.device_name.clone(),
                    alarm_state: row.alarm_state.clone(),
                    start_time: row.updated_at,
                })
                .collect();
            if let Err(e) = self.sink.modem_down(&alerts, kind).await {
                error!(gateway, kind = kind.as_str(), err = %e, "failed to send modem down report");
            }
        }

        for row in &down {
            let key = format!("{prefix}{}", row.device_name);
            if !prior.contains_key(&key) {
                self.state.put(
                    key,
                    ActiveAlert {
                        details: modem_details(kind, row),
                        gateway: gateway.to_owned(),
                    },
                );
            }
        }

        let down_names: HashSet<&str> = down.iter().map(|r| r.device_name.as_str()).collect();
        let recovered = self.collect_recoveries(&prior, &prefix, &down_names);
        if !recovered.is_empty() {
            info!(gateway, kind = kind.as_str(), count = recovered.len(), "devices recovered");
            if let Err(e) = self.sink.modem_up(&recovered, kind).await {
                error!(gateway, kind = kind.as_str(), err = %e, "failed to send modem recovery report");
            }
        }
        Ok(())
    }

    fn collect_recoveries(
        &self,
        prior: &HashMap<String, ActiveAlert>,
        prefix: &str,
        down_names: &HashSet<&str>,
    ) -> Vec<ModemUpAlert> {
        let now = wib::now_wib();
        let mut recovered = Vec::new();
        for (key, alert) in prior {
            let Some(device_name) = key.strip_prefix(prefix) else {
                continue;
            };
            if down_names.contains(device_name) {
                continue;
            }
            let stored_onset = match &alert.details {
                AlertDetails::Modulator(m) | AlertDetails::Demodulator(m) => {
                    Some(m.updated_at.as_str())
                }
                _ => None,
            };
            let time_down = stored_onset.and_then(wib::parse_wib_timestamp).unwrap_or_else(|| {
                warn!(key, "stored UpdatedAt missing or unparseable, using now");
                now
            });
            recovered.push(ModemUpAlert {
                gateway: self.gateway.friendly().to_owned(),
                device_name: device_name.to_owned(),
                recovery_time: now,
                time_down,
            });
            self.state.remove(key);
        }
        recovered
    }
}

fn modem_details(kind: DeviceKind, row: &ModemRow) -> AlertDetails {
    let state = ModemState {
        device_name: row.device_name.clone(),
        alarm_state: row.alarm_state.clone(),
        updated_at: row.updated_at.format(wib::STORED_LAYOUT).to_string(),
    };
    match kind {
        DeviceKind::Modulator => AlertDetails::Modulator(state),
        DeviceKind::Demodulator => AlertDetails::Demodulator(state),
    }
}

#[cfg(test)]
#[path = "moddemod_tests.rs"]
mod tests;
