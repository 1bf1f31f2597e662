// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MarkdownV2 renderers for the bot's query replies.
//!
//! Every section degrades per-field: absent snapshot data renders a
//! "failed to fetch" line and the rest of the report is unaffected.

use chrono::{DateTime, FixedOffset};

use crate::api::{IpcnSensorStatus, IpcnStatus, IptxTraffic, OnlineUt};
use crate::fetch::GatewaySnapshot;
use crate::notify::{escape_markdown, status_glyph};
use crate::report::Gateway;

const FAILED: &str = "failed to fetch";

/// Fixed rendering order for IPCN device categories.
const CATEGORY_ORDER: [&str; 9] = [
    "Core Router",
    "Core Switch",
    "Management Router",
    "Management Switch",
    "Firewall",
    "VPN Gateway",
    "CHR Mikrotik",
    "Sandvine",
    "Server",
];

/// Static device→category mapping per gateway, as provisioned in PRTG.
fn device_mapping(gateway: Gateway) -> &'static [(&'static str, &'static [&'static str])] {
    match gateway {
        Gateway::Jayapura => &[
            ("Core Router", &["IPCN_JYP_G1G-CR2", "IPCN_JYP_G1G-CR1"]),
            ("Core Switch", &["IPCN_JYP_G1G-CSW2", "IPCN_JYP_G1G-CSW1"]),
            (
                "Management Router",
                &["IPCN_JYP_G1G-MR2", "IPCN_JYP_G1G-MR1", "IPCN_JYP_G1G-MR3", "IPCN_JYP_G1G-MR4"],
            ),
            ("Management Switch", &["IPCN_JYP_G1G-MSW"]),
            ("Firewall", &["IPCN_JYP_G1G-NGFW2", "IPCN_JYP_G1G-NGFW1", "IPCN_JYP_G1G-NGFW3"]),
            ("CHR Mikrotik", &["IPCN_JYP_G1G-CICI2", "IPCN_JYP_G1G-CICI1"]),
            ("Server", &["IPCN_JYP_G1G-SRV01", "IPCN_JYP_G1G-SRV02"]),
        ],
        Gateway::Manokwari => &[
            ("Core Router", &["IPCN_MNK_CR2-G1K", "IPCN_MNK_CR1-G1K"]),
            ("Core Switch", &["IPCN_MNK_CSW-G1K"]),
            ("Management Router", &["IPCN_MNK_MR1-G1K", "IPCN_MNK_MR2-G1K"]),
            ("Management Switch", &["IPCN_MNK_MSW-G1K"]),
            ("Firewall", &["IPCN_MNK_NGFW1-G1K", "IPCN_MNK_NGFW2-G1K"]),
            ("Sandvine", &["IPCN_MNK_DPI-G1K"]),
        ],
        Gateway::Timika => &[
            ("Core Router", &["IPCN_TMK_CR2-G1L", "IPCN_TMK_CR1-G1L"]),
            ("Core Switch", &["IPCN_TMK_CSW-G1L"]),
            ("Management Router", &["IPCN_TMK_MR1-G1L", "IPCN_TMK_MR2-G1L"]),
            ("Management Switch", &["IPCN_TMK_MSW-G1L"]),
            ("Firewall", &["IPCN_TMK_NGFW2-G1L", "IPCN_TMK_NGFW1-G1L"]),
            ("Sandvine", &["IPCN_TMK_DPI-G1L"]),
            ("Server", &["IPCN_TMK_SRV2-G1L"]),
        ],
    }
}

/// Group the reported sensors into this gateway's categories, preserving
/// the fixed category order. Unknown devices are ignored.
fn categorize<'a>(
    sensors: &'a [IpcnSensorStatus],
    gateway: Gateway,
) -> Vec<(&'static str, Vec<&'a IpcnSensorStatus>)> {
    let mapping = device_mapping(gateway);
    CATEGORY_ORDER
        .iter()
        .filter_map(|&category| {
            let devices = mapping.iter().find(|(name, _)| *name == category)?.1;
            let members: Vec<&IpcnSensorStatus> = sensors
                .iter()
                .filter(|s| devices.contains(&s.device_name.trim()))
                .collect();
            if members.is_empty() {
                None
            } else {
                Some((category, members))
            }
        })
        .collect()
}

fn connector(index: usize, len: usize) -> char {
    if index + 1 == len {
        '└'
    } else if index == 0 && len > 1 {
        '┌'
    } else {
        '├'
    }
}

pub fn gateway_header(gateway: Gateway, now: DateTime<FixedOffset>) -> String {
    format!(
        "📡 *Gateway {} Status Report*\n`      ({})`\n",
        escape_markdown(gateway.title()),
        now.format("%d %b %Y %H:%M:%S WIB")
    )
}

fn system_status(snapshot: &GatewaySnapshot) -> String {
    let mut out = String::from("\n🔧 *System Status*\n");
    match &snapshot.ipcn_status {
        Some(status) => {
            out.push_str(&format!(
                "`     ┌─ IP Transit : Main {} || Backup {}`\n",
                status_glyph(&status.ip_transit_main.status_text),
                status_glyph(&status.ip_transit_backup.status_text),
            ));
            out.push_str(&format!(
                "`     ├─ Dataplane  : {}`\n",
                status_glyph(&status.nif_status.status_text)
            ));
            out.push_str(&format!(
                "`     └─ NMS        : {}`\n",
                status_glyph(&status.nms_status.status_text)
            ));
        }
        None => out.push_str(&format!("`     └─ {FAILED}`\n")),
    }
    out
}

fn traffic_info(snapshot: &GatewaySnapshot) -> String {
    let mut out = String::from("\n📊 *Traffic Info*\n");
    match snapshot.iptx_traffic.as_ref().and_then(|t| t.his_data.first()) {
        Some(sample) => out.push_str(&format!(
            "`     ┌─ IPTX Aggregate Traffic : {:.2} Mbps`\n",
            sample.traffic_total_speed
        )),
        None => out.push_str(&format!("`     ┌─ IPTX Aggregate Traffic : {FAILED}`\n")),
    }
    match snapshot.online_ut.as_ref().and_then(|u| u.data.last()) {
        Some(sample) => out.push_str(&format!(
            "`     └─ Online UT              : {}`\n",
            sample.ut_online_toa
        )),
        None => out.push_str(&format!("`     └─ Online UT              : {FAILED}`\n")),
    }
    out
}

/// Per-device IPCN listing, used by single-gateway summaries.
fn ipcn_device_details(snapshot: &GatewaySnapshot, gateway: Gateway) -> String {
    let mut out = String::from("\n⚙️ *IPCN Device Status*\n");
    let Some(sensors) = &snapshot.ipcn_sensors else {
        out.push_str(&format!("`     └─ {FAILED}`\n"));
        return out;
    };
    let categories = categorize(sensors, gateway);
    if categories.is_empty() {
        out.push_str("`     └─ no IPCN devices reported`\n");
        return out;
    }
    for (category, devices) in categories {
        out.push_str(&format!("*{}:*\n", escape_markdown(category)));
        for (i, device) in devices.iter().enumerate() {
            out.push_str(&format!(
                "`     {}─ {} : {}`\n",
                connector(i, devices.len()),
                device.device_name.trim(),
                status_glyph(&device.status_text_ping),
            ));
        }
    }
    out
}

/// Up/down counts per IPCN category, used by the all-gateways report.
fn ipcn_device_summary(snapshot: &GatewaySnapshot, gateway: Gateway) -> String {
    let mut out = String::from("\n⚙️ *IPCN Device Status*\n");
    let Some(sensors) = &snapshot.ipcn_sensors else {
        out.push_str(&format!("`     └─ {FAILED}`\n"));
        return out;
    };
    let categories = categorize(sensors, gateway);
    if categories.is_empty() {
        out.push_str("`     └─ no IPCN devices reported`\n");
        return out;
    }
    for (category, devices) in categories {
        let up = devices
            .iter()
            .filter(|d| d.status_text_ping.eq_ignore_ascii_case("up"))
            .count();
        let down = devices.len() - up;
        out.push_str(&format!("*{}:*\n", escape_markdown(category)));
        out.push_str(&format!("`     ┌─ Up   : {up}`\n"));
        out.push_str(&format!("`     └─ Down : {down}`\n"));
    }
    out
}

fn mod_demod(snapshot: &GatewaySnapshot) -> String {
    let mut out = String::from("\n📶 *Modulator*\n");
    let props = snapshot.device_props.as_ref().and_then(|p| p.data.first());
    let Some(props) = props else {
        out.push_str(&format!("`     └─ {FAILED}`\n"));
        out.push_str("\n📡 *Demodulator*\n");
        out.push_str(&format!("`     └─ {FAILED}`\n"));
        return out;
    };
    for (i, counter) in props.modulator.iter().enumerate() {
        out.push_str(&format!(
            "`     {}─ nIF{} : {} 🟩 || {} 🟥`\n",
            connector(i, props.modulator.len()),
            counter.nif_type,
            counter.online,
            counter.offline,
        ));
    }
    out.push_str("\n📡 *Demodulator*\n");
    for (i, counter) in props.demodulator.iter().enumerate() {
        out.push_str(&format!(
            "`     {}─ nIF{} : {} 🟩 || {} 🟥`\n",
            connector(i, props.demodulator.len()),
            counter.nif_type,
            counter.online,
            counter.offline,
        ));
    }
    out
}

fn sat_beam_info(snapshot: &GatewaySnapshot) -> String {
    let mut out = String::from("\n🛰️ *Satellite & Beam Info*\n");
    match &snapshot.cn_beacon {
        Some(beacon) => out.push_str(&format!(
            "`     ┌─ CN Beacon     : {:.2}`\n",
            beacon.data.value
        )),
        None => out.push_str(&format!("`     ┌─ CN Beacon     : {FAILED}`\n")),
    }
    match &snapshot.beam_status {
        Some(beam) => {
            let counts = &beam.data.status_counts;
            out.push_str(&format!(
                "`     ├─ Beam Status   : {} 🟩 || {} 🟥`\n",
                counts.online, counts.offline
            ));
            out.push_str(&format!(
                "`     └─ Satnet Status : {} 🟩 || {} 🟥`\n",
                counts.online, counts.offline
            ));
        }
        None => {
            out.push_str(&format!("`     ├─ Beam Status   : {FAILED}`\n"));
            out.push_str(&format!("`     └─ Satnet Status : {FAILED}`\n"));
        }
    }
    out
}

fn integrated_status(snapshot: &GatewaySnapshot) -> String {
    let mut out = String::from("\n🤖 *Integrated Device Status*\n");
    match &snapshot.integrated {
        Some(integrated) => {
            out.push_str(&format!("`     ┌─ Total   : {}`\n", integrated.data.total));
            out.push_str(&format!("`     ├─ Online  : {}`\n", integrated.data.online));
            out.push_str(&format!("`     └─ Offline : {}`\n", integrated.data.offline));
        }
        None => out.push_str(&format!("`     └─ {FAILED}`\n")),
    }
    out
}

fn snapshot_is_empty(snapshot: &GatewaySnapshot) -> bool {
    snapshot.ipcn_status.is_none()
        && snapshot.iptx_traffic.is_none()
        && snapshot.online_ut.is_none()
        && snapshot.ipcn_sensors.is_none()
        && snapshot.device_props.is_none()
        && snapshot.cn_beacon.is_none()
        && snapshot.beam_status.is_none()
        && snapshot.integrated.is_none()
}

/// Full single-gateway report with per-device IPCN detail.
pub fn gateway_summary(
    gateway: Gateway,
    snapshot: &GatewaySnapshot,
    now: DateTime<FixedOffset>,
) -> String {
    let mut out = gateway_header(gateway, now);
    out.push_str(&system_status(snapshot));
    out.push_str(&traffic_info(snapshot));
    out.push_str(&ipcn_device_details(snapshot, gateway));
    out.push_str(&mod_demod(snapshot));
    out.push_str(&sat_beam_info(snapshot));
    out.push_str(&integrated_status(snapshot));
    out
}

/// Combined report for every gateway, with summarized IPCN counts.
pub fn all_gateways_summary(
    snapshots: &[(Gateway, GatewaySnapshot)],
    now: DateTime<FixedOffset>,
) -> String {
    let mut out = String::new();
    for (i, (gateway, snapshot)) in snapshots.iter().enumerate() {
        if snapshot_is_empty(snapshot) {
            out.push_str(&format!(
                "*Gateway {}*\n_{}_\n",
                escape_markdown(gateway.title()),
                escape_markdown(FAILED)
            ));
        } else {
            out.push_str(&gateway_header(*gateway, now));
            out.push_str(&system_status(snapshot));
            out.push_str(&traffic_info(snapshot));
            out.push_str(&ipcn_device_summary(snapshot, *gateway));
            out.push_str(&mod_demod(snapshot));
            out.push_str(&sat_beam_info(snapshot));
            out.push_str(&integrated_status(snapshot));
        }
        if i + 1 < snapshots.len() {
            out.push_str(&format!("\n{}\n\n", escape_markdown("====================")));
        }
    }
    out
}

/// IP-transit report: overall status, main/backup, traffic, online UT.
pub fn iptx_info(
    gateway: Gateway,
    status: Option<&IpcnStatus>,
    traffic: Option<&IptxTraffic>,
    online_ut: Option<&OnlineUt>,
    now: DateTime<FixedOffset>,
) -> String {
    let mut out = format!(
        "📡 *IP Transit Gateway {}*\n`      ({})`\n\n",
        escape_markdown(gateway.title()),
        now.format("%d %b %Y %H:%M:%S WIB")
    );
    match status {
        Some(status) => {
            let main_up = status.ip_transit_main.status_text.eq_ignore_ascii_case("up");
            let backup_up = status.ip_transit_backup.status_text.eq_ignore_ascii_case("up");
            let overall = if main_up || backup_up { "Up" } else { "Down" };
            out.push_str(&format!("`   ┌─ Overall Status      : {}`\n", status_glyph(overall)));
            out.push_str(&format!(
                "`   ├─ IP Transit Main     : {}`\n",
                status_glyph(&status.ip_transit_main.status_text)
            ));
            out.push_str(&format!(
                "`   ├─ IP Transit Backup   : {}`\n",
                status_glyph(&status.ip_transit_backup.status_text)
            ));
        }
        None => out.push_str(&format!("`   ┌─ Status              : {FAILED}`\n")),
    }
    match traffic.and_then(|t| t.his_data.first()) {
        Some(sample) => out.push_str(&format!(
            "`   ├─ Current IPTX Traffic: {:.2} Mbps`\n",
            sample.traffic_total_speed
        )),
        None => out.push_str(&format!("`   ├─ Current IPTX Traffic: {FAILED}`\n")),
    }
    match online_ut.and_then(|u| u.data.last()) {
        Some(sample) => out.push_str(&format!(
            "`   └─ Current Online UT   : {}`\n",
            sample.ut_online_toa
        )),
        None => out.push_str(&format!("`   └─ Current Online UT   : {FAILED}`\n")),
    }
    out
}

/// Log excerpt wrapped in a pre block under a bold title. Inside a pre
/// block only backslash and backtick are reserved.
pub fn log_message(title: &str, content: &str) -> String {
    let escaped = content.replace('\\', "\\\\").replace('`', "\\`");
    format!("*{}*\n```\n{}\n```", escape_markdown(title), escaped)
}

pub fn myid_message(user_id: i64) -> String {
    format!("Your Telegram ID is: `{user_id}`")
}

pub const ACCESS_DENIED: &str = "❌ *Access denied\\!* You are not allowed to use this command\\.";

pub const UNKNOWN_COMMAND: &str =
    "Unknown command\\. Send /help to list the available commands\\.";

/// Help text matching the menus pushed via `setMyCommands`.
pub fn help_message(is_admin: bool) -> String {
    let mut out = String::from("*Available commands*\n");
    out.push_str("/start \\- start interacting with the bot\n");
    out.push_str("/help \\- show this message\n");
    out.push_str("/myid \\- show your Telegram ID\n");
    if is_admin {
        out.push_str("/satria1\\_gateway\\_all \\- status summary of every gateway\n");
        out.push_str("/satria1\\_gateway\\_jyp \\- Gateway Jayapura summary\n");
        out.push_str("/satria1\\_gateway\\_mnk \\- Gateway Manokwari summary\n");
        out.push_str("/satria1\\_gateway\\_tmk \\- Gateway Timika summary\n");
        out.push_str("/satria1\\_iptx\\_jyp \\- IP transit info, Jayapura\n");
        out.push_str("/satria1\\_iptx\\_mnk \\- IP transit info, Manokwari\n");
        out.push_str("/satria1\\_iptx\\_tmk \\- IP transit info, Timika\n");
        out.push_str("/log\\_error \\- recent error log lines\n");
        out.push_str("/log\\_notif \\- recent notification log lines\n");
        out.push_str("/log\\_alerts\\_active \\- currently open alerts\n");
        out.push_str("/log\\_all \\- recent raw log lines\n");
    }
    out
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
