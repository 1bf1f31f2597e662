// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Satnet health evaluation against the DB-FIVE KPI store.
//!
//! A satnet is reportable-DOWN when its forward throughput is below the
//! threshold AND enough terminals sit behind it (the blast-radius gate).
//! The checker re-emits a down report every tick while the down set is
//! non-empty; state mutations and recovery reports happen once per
//! transition.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDateTime;
use sqlx::postgres::PgPool;
use tracing::{error, info, warn};

use crate::notify::EventSink;
use crate::report::{Gateway, SatnetDetail, SatnetUpAlert};
use crate::state::{ActiveAlert, AlertDetails, SatnetState, StateStore};
use crate::wib;

/// Forward throughput below this is degraded, in kbps.
pub const THRESHOLD_KBPS: f64 = 1000.0;

/// A degraded satnet is only reportable when more terminals than this are
/// behind it (online + offline).
pub const MIN_AFFECTED_TERMINALS: i64 = 3;

/// Latest sample for one satnet.
#[derive(Debug, Clone, PartialEq)]
pub struct SatnetReading {
    pub name: String,
    pub fwd_kbps: f64,
    pub rtn_kbps: f64,
    pub sample_time: NaiveDateTime,
}

/// Terminal population behind a satnet; absent when the KPI store has no
/// recent samples for it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerminalCount {
    pub online: Option<i64>,
    pub offline: Option<i64>,
}

/// Typed reads from DB-FIVE.
pub trait SatnetSource: Send + Sync {
    /// One row per satnet, latest sample first.
    fn latest_readings(&self) -> impl Future<Output = anyhow::Result<Vec<SatnetReading>>> + Send;

    fn terminal_counts(
        &self,
        satnet: &str,
    ) -> impl Future<Output = anyhow::Result<TerminalCount>> + Send;

    /// Timestamp of the first sub-threshold sample after the most recent
    /// healthy one; `None` when the window has no healthy sample.
    fn first_below_threshold(
        &self,
        satnet: &str,
        threshold_kbps: f64,
    ) -> impl Future<Output = anyhow::Result<Option<NaiveDateTime>>> + Send;
}

pub struct PgSatnetSource {
    pool: PgPool,
}

impl PgSatnetSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ReadingRow {
    satnet_name: String,
    satnet_fwd_throughput: f64,
    satnet_rtn_throughput: f64,
    updated_at: NaiveDateTime,
}

#[derive(sqlx::FromRow)]
struct CountRow {
    online: Option<i64>,
    offline: Option<i64>,
}

impl SatnetSource for PgSatnetSource {
    async fn latest_readings(&self) -> anyhow::Result<Vec<SatnetReading>> {
        let rows: Vec<ReadingRow> = sqlx::query_as(
            r#"
            SELECT DISTINCT ON (satnet_name)
                satnet_name,
                satnet_fwd_throughput,
                satnet_rtn_throughput,
                updated_at
            FROM satnets
            ORDER BY satnet_name, updated_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| SatnetReading {
                name: r.satnet_name,
                fwd_kbps: r.satnet_fwd_throughput,
                rtn_kbps: r.satnet_rtn_throughput,
                sample_time: r.updated_at,
            })
            .collect())
    }

    async fn terminal_counts(&self, satnet: &str) -> anyhow::Result<TerminalCount> {
        let row: Option<CountRow> = sqlx::query_as(
            r#"
            SELECT online, offline
            FROM terminal_kpis
            WHERE satnet_name = $1
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(satnet)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row
            .map(|r| TerminalCount { online: r.online, offline: r.offline })
            .unwrap_or_default())
    }

    async fn first_below_threshold(
        &self,
        satnet: &str,
        threshold_kbps: f64,
    ) -> anyhow::Result<Option<NaiveDateTime>> {
        let row: Option<(Option<NaiveDateTime>,)> = sqlx::query_as(
            r#"
            SELECT MIN(updated_at)
            FROM satnets
            WHERE satnet_name = $1
              AND satnet_fwd_throughput < $2
              AND updated_at > (
                  SELECT MAX(updated_at)
                  FROM satnets
                  WHERE satnet_name = $1
                    AND satnet_fwd_throughput >= $2
              )
            "#,
        )
        .bind(satnet)
        .bind(threshold_kbps)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.and_then(|r| r.0))
    }
}

/// Per-gateway satnet checker.
pub struct SatnetChecker<S, K> {
    source: S,
    sink: K,
    state: Arc<StateStore>,
    gateway: Gateway,
}

fn key_prefix(gateway: Gateway) -> String {
    format!("satnet_{}_", gateway.friendly())
}

impl<S: SatnetSource, K: EventSink> SatnetChecker<S, K> {
    pub fn new(source: S, sink: K, state: Arc<StateStore>, gateway: Gateway) -> Self {
        Self { source, sink, state, gateway }
    }

    /// One scheduled invocation. A DB error aborts the whole tick before
    /// any state mutation.
    pub async fn run(&self) {
        if let Err(e) = self.tick().await {
            error!(gateway = self.gateway.friendly(), err = %e, "satnet check aborted");
        }
    }

    async fn tick(&self) -> anyhow::Result<()> {
        let readings = self.source.latest_readings().await?;

        let mut down = Vec::new();
        for reading in readings {
            if reading.fwd_kbps >= THRESHOLD_KBPS {
                continue;
            }
            let counts = self.source.terminal_counts(&reading.name).await?;
            let affected = counts.online.unwrap_or(0) + counts.offline.unwrap_or(0);
            if affected <= MIN_AFFECTED_TERMINALS {
                continue;
            }
            let start_issue =
                self.source.first_below_threshold(&reading.name, THRESHOLD_KBPS).await?;
            down.push(SatnetDetail {
                name: reading.name,
                fwd_kbps: reading.fwd_kbps,
                rtn_kbps: reading.rtn_kbps,
                sample_time: reading.sample_time,
                online: counts.online,
                offline: counts.offline,
                start_issue,
            });
        }

        let gateway = self.gateway.friendly();
        let prefix = key_prefix(self.gateway);
        let prior = self.state.snapshot();

        if !down.is_empty() {
            info!(gateway, count = down.len(), "degraded satnets detected");
            if let Err(e) = self.sink.satnet_down(gateway, &down).await {
                error!(gateway, err = %e, "failed to send satnet down report");
            }
        }

        for detail in &down {
            let key = format!("{prefix}{}", detail.name);
            if !prior.contains_key(&key) {
                self.state.put(
                    key,
                    ActiveAlert {
                        details: AlertDetails::Satnet(SatnetState {
                            name: detail.name.clone(),
                            fwd_kbps: detail.fwd_kbps,
                            rtn_kbps: detail.rtn_kbps,
                            start_issue: detail
                                .start_issue
                                .map(|ts| ts.format(wib::STORED_LAYOUT).to_string()),
                        }),
                        gateway: gateway.to_owned(),
                    },
                );
            }
        }

        let down_names: HashSet<&str> = down.iter().map(|d| d.name.as_str()).collect();
        let recovered = self.collect_recoveries(&prior, &prefix, &down_names);
        if !recovered.is_empty() {
            info!(gateway, count = recovered.len(), "satnets recovered");
            if let Err(e) = self.sink.satnet_up(gateway, &recovered).await {
                error!(gateway, err = %e, "failed to send satnet recovery report");
            }
        }
        Ok(())
    }

    fn collect_recoveries(
        &self,
        prior: &HashMap<String, ActiveAlert>,
        prefix: &str,
        down_names: &HashSet<&str>,
    ) -> Vec<SatnetUpAlert> {
        let now = wib::now_wib();
        let mut recovered = Vec::new();
        for (key, alert) in prior {
            let Some(name) = key.strip_prefix(prefix) else {
                continue;
            };
            if down_names.contains(name) {
                continue;
            }
            let stored_start = match &alert.details {
                AlertDetails::Satnet(s) => s.start_issue.as_deref(),
                _ => None,
            };
            let time_down = stored_start.and_then(wib::parse_wib_timestamp).unwrap_or_else(|| {
                warn!(key, "stored start_issue missing or unparseable, using now");
                now
            });
            recovered.push(SatnetUpAlert {
                gateway: self.gateway.friendly().to_owned(),
                satnet: name.to_owned(),
                recovery_time: now,
                time_down,
            });
            self.state.remove(key);
        }
        recovered
    }
}

#[cfg(test)]
#[path = "satnet_tests.rs"]
mod tests;
