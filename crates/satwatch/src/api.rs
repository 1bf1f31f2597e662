// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gateway HTTP API: bearer-token auth client and typed endpoint readers.
//!
//! The auth client holds the one process-wide token. Reauth is strictly
//! reactive: a 401 triggers exactly one login and one retry, and any further
//! failure surfaces to the caller. The token mutex is held across the login
//! round-trip so concurrent callers observe at most one in-flight login.

use anyhow::Context;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{info, warn};

pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
    email: String,
    password: String,
    token: tokio::sync::Mutex<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct LoginReply {
    #[serde(default)]
    status: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: LoginData,
}

#[derive(Debug, Default, Deserialize)]
struct LoginData {
    #[serde(default)]
    token: String,
}

enum GetFailure {
    Unauthorized,
    Other(anyhow::Error),
}

impl AuthClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            email: email.into(),
            password: password.into(),
            token: tokio::sync::Mutex::new(None),
        }
    }

    /// POST the login endpoint and replace the stored token.
    pub async fn login(&self) -> anyhow::Result<()> {
        let mut token = self.token.lock().await;
        info!(url = %self.base_url, "logging in to gateway API");
        let url = format!("{}/api/v1/auth/login", self.base_url);
        let body = serde_json::json!({"email": self.email, "password": self.password});
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("send login request")?;
        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("login failed with http {status}: {text}");
        }
        let reply: LoginReply = resp.json().await.context("decode login reply")?;
        if !reply.status || reply.data.token.is_empty() {
            anyhow::bail!("login rejected by API: {}", reply.message);
        }
        *token = Some(reply.data.token);
        info!("gateway API token refreshed");
        Ok(())
    }

    /// Bearer-authenticated GET decoding JSON into `T`.
    ///
    /// A missing token triggers an initial login. On 401 the client logs in
    /// once and retries the request once.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> anyhow::Result<T> {
        if self.token.lock().await.is_none() {
            self.login().await?;
        }
        match self.try_get(url).await {
            Ok(value) => Ok(value),
            Err(GetFailure::Unauthorized) => {
                warn!(url, "gateway API returned 401, refreshing token");
                self.login().await.context("refresh token after 401")?;
                match self.try_get(url).await {
                    Ok(value) => Ok(value),
                    Err(GetFailure::Unauthorized) => {
                        anyhow::bail!("still unauthorized after token refresh: {url}")
                    }
                    Err(GetFailure::Other(e)) => Err(e),
                }
            }
            Err(GetFailure::Other(e)) => Err(e),
        }
    }

    async fn try_get<T: DeserializeOwned>(&self, url: &str) -> Result<T, GetFailure> {
        let token = self
            .token
            .lock()
            .await
            .clone()
            .ok_or_else(|| GetFailure::Other(anyhow::anyhow!("no auth token held")))?;
        let resp = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("GET {url}"))
            .map_err(GetFailure::Other)?;
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(GetFailure::Unauthorized);
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(GetFailure::Other(anyhow::anyhow!("GET {url} returned http {status}: {text}")));
        }
        resp.json::<T>()
            .await
            .with_context(|| format!("decode reply from {url}"))
            .map_err(GetFailure::Other)
    }
}

// --- Endpoint response types -------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusText {
    #[serde(default, rename = "statustext")]
    pub status_text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IpcnStatus {
    #[serde(default)]
    pub ip_transit_main: StatusText,
    #[serde(default, rename = "ip_transit_backup_status")]
    pub ip_transit_backup: StatusText,
    #[serde(default)]
    pub nif_status: StatusText,
    #[serde(default)]
    pub nms_status: StatusText,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IptxTraffic {
    #[serde(default, rename = "hisdata")]
    pub his_data: Vec<TrafficSample>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrafficSample {
    #[serde(default)]
    pub traffic_total_speed: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OnlineUt {
    #[serde(default)]
    pub data: Vec<OnlineUtSample>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OnlineUtSample {
    #[serde(default)]
    pub ut_online_toa: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IpcnSensorStatus {
    #[serde(default)]
    pub device_name: String,
    #[serde(default, rename = "statustext_ping")]
    pub status_text_ping: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceProperties {
    #[serde(default)]
    pub data: Vec<DevicePropertiesEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DevicePropertiesEntry {
    #[serde(default)]
    pub modulator: Vec<NifCounter>,
    #[serde(default)]
    pub demodulator: Vec<NifCounter>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NifCounter {
    #[serde(default)]
    pub nif_type: i64,
    #[serde(default)]
    pub online: i64,
    #[serde(default)]
    pub offline: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CnBeacon {
    #[serde(default)]
    pub data: CnBeaconValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CnBeaconValue {
    #[serde(default)]
    pub value: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BeamStatus {
    #[serde(default)]
    pub data: BeamStatusData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BeamStatusData {
    #[serde(default)]
    pub status_counts: StatusCounts,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusCounts {
    #[serde(default)]
    pub online: i64,
    #[serde(default)]
    pub offline: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntegratedTotals {
    #[serde(default)]
    pub data: IntegratedData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntegratedData {
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub online: i64,
    #[serde(default)]
    pub offline: i64,
}

// --- Endpoint readers --------------------------------------------------------

/// Layout of the TOA range-interval time parameters.
const TOA_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S";

/// Layout of the IPTX traffic `sdate`/`edate` parameters.
const IPTX_LAYOUT: &str = "%Y-%m-%d-%H-%M-%S";

pub async fn ipcn_status(client: &AuthClient, base: &str) -> anyhow::Result<IpcnStatus> {
    client.get_json(&format!("{base}/api/v1/ipcn/status")).await
}

/// Aggregate IP-transit traffic over the last five minutes at 300 s
/// averaging.
pub async fn iptx_traffic(
    client: &AuthClient,
    base: &str,
    gateway: &str,
) -> anyhow::Result<IptxTraffic> {
    let now = crate::wib::now_wib();
    let sdate = (now - chrono::Duration::minutes(5)).format(IPTX_LAYOUT);
    let edate = now.format(IPTX_LAYOUT);
    let url = format!(
        "{base}/api/v1/lnm/prtg-data/iptx-traffic?sdate={sdate}&edate={edate}&avg=300&gateway={gateway}"
    );
    client.get_json(&url).await
}

/// Online-UT time series over the last hour at a 60 s interval.
pub async fn online_ut(client: &AuthClient, base: &str) -> anyhow::Result<OnlineUt> {
    let end = Utc::now();
    let start = end - chrono::Duration::hours(1);
    let url = format!(
        "{base}/api/v1/toa/range-interval?start_date={}&end_date={}&interval=60",
        start.format(TOA_LAYOUT),
        end.format(TOA_LAYOUT)
    );
    client.get_json(&url).await
}

pub async fn ipcn_sensor_status(
    client: &AuthClient,
    base: &str,
    device_name: Option<&str>,
) -> anyhow::Result<Vec<IpcnSensorStatus>> {
    let mut url = format!("{base}/api/v1/ipcn/sensor-status");
    if let Some(device) = device_name {
        url.push_str("?device_name=");
        url.push_str(device);
    }
    client.get_json(&url).await
}

pub async fn device_properties_status(
    client: &AuthClient,
    base: &str,
) -> anyhow::Result<DeviceProperties> {
    client.get_json(&format!("{base}/api/v1/device_properties/status")).await
}

pub async fn cn_beacon(client: &AuthClient, base: &str) -> anyhow::Result<CnBeacon> {
    client.get_json(&format!("{base}/api/v1/lnm/cn_beacon")).await
}

pub async fn beam_terminal_status(client: &AuthClient, base: &str) -> anyhow::Result<BeamStatus> {
    client.get_json(&format!("{base}/api/v1/terminal/beam-terminal-status")).await
}

pub async fn terminal_total_integrated(
    client: &AuthClient,
    base: &str,
) -> anyhow::Result<IntegratedTotals> {
    client.get_json(&format!("{base}/api/v1/terminal/status/total/integrated")).await
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
