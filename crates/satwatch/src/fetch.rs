// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-demand composite snapshot of one gateway.
//!
//! Eight independent reads run in parallel; a failed read is logged and its
//! snapshot field stays `None` so presentation degrades per-field, never
//! per-snapshot. The caller gets the snapshot only after all eight settle.

use tracing::error;

use crate::api::{
    self, AuthClient, BeamStatus, CnBeacon, DeviceProperties, IntegratedTotals, IpcnSensorStatus,
    IpcnStatus, IptxTraffic, OnlineUt,
};
use crate::config::Config;
use crate::report::Gateway;

/// Base URLs used for one gateway's reads.
///
/// Jayapura fronts its own G1G host for IPCN reads; Timika fronts G1L; the
/// shared G1K host serves the rest. Manokwari is entirely on G1K.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayUrls {
    /// Host answering IPCN status/sensor reads for this gateway.
    pub sensor: String,
    /// Shared host answering TOA, device-properties, beacon, and terminal
    /// reads.
    pub shared: String,
}

pub fn gateway_urls(config: &Config, gateway: Gateway) -> GatewayUrls {
    let sensor = match gateway {
        Gateway::Jayapura => config.g1g_url.clone(),
        Gateway::Manokwari => config.g1k_url.clone(),
        Gateway::Timika => config.g1l_url.clone(),
    };
    GatewayUrls { sensor, shared: config.g1k_url.clone() }
}

/// Composite of the eight parallel reads; any field may be absent.
#[derive(Debug, Clone, Default)]
pub struct GatewaySnapshot {
    pub ipcn_status: Option<IpcnStatus>,
    pub iptx_traffic: Option<IptxTraffic>,
    pub online_ut: Option<OnlineUt>,
    pub ipcn_sensors: Option<Vec<IpcnSensorStatus>>,
    pub device_props: Option<DeviceProperties>,
    pub cn_beacon: Option<CnBeacon>,
    pub beam_status: Option<BeamStatus>,
    pub integrated: Option<IntegratedTotals>,
}

fn settle<T>(task: &str, gateway: Gateway, result: anyhow::Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            error!(task, gateway = gateway.title(), err = %e, "gateway API call failed");
            None
        }
    }
}

/// Fetch the full snapshot for one gateway.
pub async fn fetch_gateway_data(
    client: &AuthClient,
    urls: &GatewayUrls,
    gateway: Gateway,
) -> GatewaySnapshot {
    let gw_param = gateway.title().to_lowercase();
    let (
        ipcn_status,
        iptx_traffic,
        online_ut,
        ipcn_sensors,
        device_props,
        cn_beacon,
        beam_status,
        integrated,
    ) = tokio::join!(
        api::ipcn_status(client, &urls.sensor),
        api::iptx_traffic(client, &urls.sensor, &gw_param),
        api::online_ut(client, &urls.shared),
        api::ipcn_sensor_status(client, &urls.sensor, None),
        api::device_properties_status(client, &urls.shared),
        api::cn_beacon(client, &urls.shared),
        api::beam_terminal_status(client, &urls.shared),
        api::terminal_total_integrated(client, &urls.shared),
    );
    GatewaySnapshot {
        ipcn_status: settle("IpcnStatus", gateway, ipcn_status),
        iptx_traffic: settle("IptxTraffic", gateway, iptx_traffic),
        online_ut: settle("OnlineUT", gateway, online_ut),
        ipcn_sensors: settle("IpcnSensorStatus", gateway, ipcn_sensors),
        device_props: settle("DevicePropertiesStatus", gateway, device_props),
        cn_beacon: settle("CnBeacon", gateway, cn_beacon),
        beam_status: settle("BeamTerminalStatus", gateway, beam_status),
        integrated: settle("TerminalStatusTotalIntegrated", gateway, integrated),
    }
}

/// The three reads behind the IP-transit command.
pub async fn fetch_iptx_data(
    client: &AuthClient,
    urls: &GatewayUrls,
    gateway: Gateway,
) -> (Option<IpcnStatus>, Option<IptxTraffic>, Option<OnlineUt>) {
    let gw_param = gateway.title().to_lowercase();
    let (status, traffic, online_ut) = tokio::join!(
        api::ipcn_status(client, &urls.sensor),
        api::iptx_traffic(client, &urls.sensor, &gw_param),
        api::online_ut(client, &urls.shared),
    );
    (
        settle("IpcnStatus", gateway, status),
        settle("IptxTraffic", gateway, traffic),
        settle("OnlineUT", gateway, online_ut),
    )
}

#[cfg(test)]
#[path = "fetch_tests.rs"]
mod tests;
