// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PRTG sensor evaluation for the IP-transit and NIF links.
//!
//! Each checker owns one (sensor type, gateway) pair and reads a single
//! sensor by ID. A sensor is DOWN when PRTG says so or when its normalized
//! throughput drops below the threshold. The down report is re-emitted
//! every tick while down; the state entry and the recovery report are
//! one-per-transition.

use std::future::Future;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::notify::{self, EventSink};
use crate::report::{Gateway, PrtgDownAlert, PrtgUpAlert};
use crate::state::{ActiveAlert, AlertDetails, StateStore};
use crate::wib;

/// Normalized throughput below this is degraded, in kbps.
pub const THRESHOLD_KBPS: f64 = 1000.0;

/// Which PRTG sensor family a checker watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorType {
    Nif,
    Iptx,
}

impl SensorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nif => "NIF",
            Self::Iptx => "IPTX",
        }
    }
}

/// The `sensordata` object from `getsensordetails.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SensorData {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "parentdevicename")]
    pub parent_device_name: String,
    #[serde(default, rename = "lastvalue")]
    pub last_value: String,
    #[serde(default, rename = "statustext")]
    pub status_text: String,
    #[serde(default, rename = "lastcheck")]
    pub last_check: String,
    #[serde(default, rename = "lastmessage")]
    pub last_message: String,
    #[serde(default, rename = "lastup")]
    pub last_up: String,
    #[serde(default, rename = "lastdown")]
    pub last_down: String,
}

#[derive(Debug, Deserialize)]
struct SensorDetailsReply {
    sensordata: SensorData,
}

/// Typed read of one sensor.
pub trait PrtgSource: Send + Sync {
    fn sensor_details(
        &self,
        sensor_id: &str,
    ) -> impl Future<Output = anyhow::Result<SensorData>> + Send;
}

/// HTTP client for the PRTG API.
#[derive(Clone)]
pub struct PrtgClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl PrtgClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self { http, base_url: base_url.into(), api_token: api_token.into() }
    }
}

impl PrtgSource for PrtgClient {
    async fn sensor_details(&self, sensor_id: &str) -> anyhow::Result<SensorData> {
        let url = format!(
            "{}/api/getsensordetails.json?id={}&apitoken={}",
            self.base_url, sensor_id, self.api_token
        );
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("PRTG returned http {status} for sensor {sensor_id}");
        }
        let reply: SensorDetailsReply = resp.json().await?;
        Ok(reply.sensordata)
    }
}

#[allow(clippy::unwrap_used)] // literal pattern
fn number_pattern() -> &'static Regex {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    NUMBER.get_or_init(|| Regex::new(r"[0-9]+(?:\.[0-9]+)?").unwrap())
}

/// Extract the numeric part of a PRTG `lastvalue` string and convert it to
/// kbps using the unit suffix. `None` when there is no numeric part.
pub fn parse_and_convert(value: &str) -> Option<f64> {
    let numeric: f64 = number_pattern().find(value)?.as_str().parse().ok()?;
    let lower = value.to_lowercase();
    let kbps = if lower.contains("mbit/s") {
        numeric * 1000.0
    } else if lower.contains("kbit/s") {
        numeric
    } else if lower.contains("bit/s") {
        numeric / 1000.0
    } else {
        numeric
    };
    Some(kbps)
}

/// Per-(sensor type, gateway) PRTG checker.
pub struct PrtgChecker<S, K> {
    source: S,
    sink: K,
    state: Arc<StateStore>,
    gateway: Gateway,
    sensor_type: SensorType,
    sensor_id: String,
}

fn alert_key(sensor_type: SensorType, gateway: Gateway) -> String {
    format!("prtg_{}_{}", sensor_type.as_str(), gateway.friendly())
}

impl<S: PrtgSource, K: EventSink> PrtgChecker<S, K> {
    pub fn new(
        source: S,
        sink: K,
        state: Arc<StateStore>,
        gateway: Gateway,
        sensor_type: SensorType,
        sensor_id: impl Into<String>,
    ) -> Self {
        Self { source, sink, state, gateway, sensor_type, sensor_id: sensor_id.into() }
    }

    pub async fn run(&self) {
        if let Err(e) = self.tick().await {
            error!(
                gateway = self.gateway.friendly(),
                sensor_type = self.sensor_type.as_str(),
                err = %e,
                "PRTG check aborted"
            );
        }
    }

    async fn tick(&self) -> anyhow::Result<()> {
        let data = self.source.sensor_details(&self.sensor_id).await?;
        let key = alert_key(self.sensor_type, self.gateway);

        let mut alert_value = data.last_value.clone();
        let is_down = if data.status_text.eq_ignore_ascii_case("down") {
            true
        } else {
            match parse_and_convert(&data.last_value) {
                Some(kbps) if kbps < THRESHOLD_KBPS => {
                    alert_value = format!("{kbps:.2} Kbit/s");
                    true
                }
                Some(_) => false,
                None => {
                    warn!(key, value = %data.last_value, "unparseable sensor value, treating as up");
                    false
                }
            }
        };

        let was_down = self.state.get(&key).is_some();
        let location = notify::friendly_gateway_name(self.gateway.friendly());

        if is_down {
            let alert = PrtgDownAlert {
                location: location.clone(),
                sensor_full_name: data.name.clone(),
                device_name: data.parent_device_name.clone(),
                sensor_type: self.sensor_type.as_str().to_owned(),
                value: alert_value,
                status: data.status_text.clone(),
                last_message: data.last_message.clone(),
                last_check: wib::oa_to_wib(&data.last_check),
                last_down: wib::oa_to_wib(&data.last_down),
                last_up: wib::oa_to_wib(&data.last_up),
            };
            if let Err(e) = self.sink.prtg_down(&alert).await {
                error!(key, err = %e, "failed to send PRTG down report");
            }
            if !was_down {
                info!(key, "new PRTG alert recorded");
                self.state.put(
                    key,
                    ActiveAlert {
                        details: AlertDetails::Prtg(alert),
                        gateway: self.gateway.friendly().to_owned(),
                    },
                );
            }
        } else if was_down {
            info!(key, "PRTG sensor recovered");
            let up = PrtgUpAlert {
                location,
                sensor_full_name: data.name.clone(),
                device_name: data.parent_device_name.clone(),
                sensor_type: self.sensor_type.as_str().to_owned(),
                recovery_time: wib::now_wib(),
            };
            if let Err(e) = self.sink.prtg_up(&up).await {
                error!(key, err = %e, "failed to send PRTG recovery report");
            }
            self.state.remove(&key);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "prtg_tests.rs"]
mod tests;
