// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Alert formatting and delivery.
//!
//! Checkers talk to a narrow [`EventSink`] capability — one method per event
//! kind — so the evaluation logic never depends on a concrete notifier and
//! tests can record events instead of sending them. [`TelegramNotifier`]
//! renders each event with the template builders below and posts exactly one
//! platform message per logical event: no batching, no retry; a delivery
//! error is surfaced to the caller, which logs it.

use std::future::Future;

use chrono::{DateTime, FixedOffset};
use tracing::info;

use crate::report::{
    DeviceKind, ModemDownAlert, ModemUpAlert, PrtgDownAlert, PrtgUpAlert, SatnetDetail,
    SatnetUpAlert,
};
use crate::telegram::TelegramClient;
use crate::wib;

/// One async method per event kind. Implementations post one message per
/// call and surface delivery errors.
pub trait EventSink: Send + Sync {
    fn satnet_down(
        &self,
        gateway: &str,
        down: &[SatnetDetail],
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn satnet_up(
        &self,
        gateway: &str,
        recovered: &[SatnetUpAlert],
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn modem_down(
        &self,
        alerts: &[ModemDownAlert],
        kind: DeviceKind,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn modem_up(
        &self,
        alerts: &[ModemUpAlert],
        kind: DeviceKind,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn prtg_down(&self, alert: &PrtgDownAlert) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn prtg_up(&self, alert: &PrtgUpAlert) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Posts rendered events to the configured alert chat.
#[derive(Clone)]
pub struct TelegramNotifier {
    client: TelegramClient,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(client: TelegramClient, chat_id: impl Into<String>) -> Self {
        Self { client, chat_id: chat_id.into() }
    }

    async fn send(&self, text: &str) -> anyhow::Result<()> {
        self.client.send_message(&self.chat_id, text).await
    }
}

impl EventSink for TelegramNotifier {
    async fn satnet_down(&self, gateway: &str, down: &[SatnetDetail]) -> anyhow::Result<()> {
        self.send(&satnet_down_message(gateway, down, wib::now_wib())).await?;
        info!(gateway, count = down.len(), "satnet down report sent");
        Ok(())
    }

    async fn satnet_up(&self, gateway: &str, recovered: &[SatnetUpAlert]) -> anyhow::Result<()> {
        self.send(&satnet_up_message(gateway, recovered, wib::now_wib())).await?;
        info!(gateway, count = recovered.len(), "satnet recovery report sent");
        Ok(())
    }

    async fn modem_down(&self, alerts: &[ModemDownAlert], kind: DeviceKind) -> anyhow::Result<()> {
        self.send(&modem_down_message(alerts, kind, wib::now_wib())).await?;
        info!(kind = kind.as_str(), count = alerts.len(), "modem down report sent");
        Ok(())
    }

    async fn modem_up(&self, alerts: &[ModemUpAlert], kind: DeviceKind) -> anyhow::Result<()> {
        self.send(&modem_up_message(alerts, kind, wib::now_wib())).await?;
        info!(kind = kind.as_str(), count = alerts.len(), "modem recovery report sent");
        Ok(())
    }

    async fn prtg_down(&self, alert: &PrtgDownAlert) -> anyhow::Result<()> {
        self.send(&prtg_down_message(alert)).await?;
        info!(sensor = %alert.sensor_full_name, location = %alert.location, "PRTG down report sent");
        Ok(())
    }

    async fn prtg_up(&self, alert: &PrtgUpAlert) -> anyhow::Result<()> {
        self.send(&prtg_up_message(alert)).await?;
        info!(sensor = %alert.sensor_full_name, location = %alert.location, "PRTG recovery report sent");
        Ok(())
    }
}

/// Characters Telegram's MarkdownV2 dialect reserves outside code spans.
const RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Escape free text for MarkdownV2. Escape once, at format time.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if RESERVED.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Sanitize text placed inside a backtick code span, where backslash and
/// backtick are the only reserved characters.
fn code_text(text: &str) -> String {
    text.replace(['`', '\\'], "'")
}

/// Map anything containing a site code to the full gateway name.
pub fn friendly_gateway_name(raw: &str) -> String {
    let upper = raw.to_uppercase();
    if upper.contains("JYP") {
        "JAYAPURA".to_owned()
    } else if upper.contains("MNK") {
        "MANOKWARI".to_owned()
    } else if upper.contains("TMK") {
        "TIMIKA".to_owned()
    } else {
        raw.to_owned()
    }
}

/// Severity glyph for a modem alarm state; unknown states pass through.
pub fn alarm_state_glyph(state: &str) -> String {
    match state.to_lowercase().as_str() {
        "minor" => "🟡 minor".to_owned(),
        "major" => "🟠 major".to_owned(),
        "critical" => "🔴 critical".to_owned(),
        "timeout" => "⚫ timeout".to_owned(),
        _ => state.to_owned(),
    }
}

/// Up/down glyph for sensor status text; anything else passes through.
pub fn status_glyph(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "up" => "🟩".to_owned(),
        "down" => "🟥".to_owned(),
        _ => status.to_owned(),
    }
}

const SEPARATOR: &str = "────────────────────────────────";

fn header(title: &str, event: &str, gateway: &str, now: Option<DateTime<FixedOffset>>) -> String {
    let mut out = String::new();
    out.push_str(title);
    out.push('\n');
    out.push_str(&format!("*EVENT:* {}\n", escape_markdown(event)));
    out.push_str(&format!("*GATEWAY:* {}\n", escape_markdown(gateway)));
    if let Some(now) = now {
        out.push_str(&format!("🕒 {}\n", escape_markdown(&wib::format_wib(now))));
    }
    out.push_str(SEPARATOR);
    out.push('\n');
    out
}

fn counts_cell(online: Option<i64>, offline: Option<i64>) -> String {
    match (online, offline) {
        (None, None) => "-".to_owned(),
        (online, offline) => {
            format!("{} 🟩 || {} 🟥", online.unwrap_or(0), offline.unwrap_or(0))
        }
    }
}

/// Down report listing every currently-degraded satnet on one gateway.
pub fn satnet_down_message(
    gateway: &str,
    down: &[SatnetDetail],
    now: DateTime<FixedOffset>,
) -> String {
    let mut out = header("🚨 *CRITICAL ALERT* 🚨", "SATNET DOWN", gateway, Some(now));
    for satnet in down {
        let start_issue = match satnet.start_issue {
            Some(ts) => wib::format_naive(ts),
            None => "N/A".to_owned(),
        };
        out.push_str(&format!("🔻 *{}*\n", escape_markdown(&satnet.name)));
        out.push_str(&format!("`┌─ Fwd         : {:.2} kbps (LOW)`\n", satnet.fwd_kbps));
        out.push_str(&format!("`├─ Rtn         : {:.2} kbps`\n", satnet.rtn_kbps));
        out.push_str(&format!(
            "`├─ Terminals   : {}`\n",
            code_text(&counts_cell(satnet.online, satnet.offline))
        ));
        out.push_str(&format!(
            "`├─ Sample      : {}`\n",
            code_text(&wib::format_naive(satnet.sample_time))
        ));
        out.push_str(&format!("`└─ Start Issue : {}`\n\n", code_text(&start_issue)));
    }
    out.trim_end().to_owned()
}

/// Recovery report aggregating every satnet that left the down set.
pub fn satnet_up_message(
    gateway: &str,
    recovered: &[SatnetUpAlert],
    now: DateTime<FixedOffset>,
) -> String {
    let mut out = header("✅ *RECOVERY* ✅", "SATNET UP", gateway, Some(now));
    for alert in recovered {
        let duration = wib::format_duration_since(alert.time_down);
        out.push_str(&format!("🔹 *{}*\n", escape_markdown(&alert.satnet)));
        out.push_str(&format!(
            "`┌─ Down Since : {}`\n",
            code_text(&wib::format_wib(alert.time_down))
        ));
        out.push_str(&format!(
            "`├─ Recovered  : {}`\n",
            code_text(&wib::format_wib(alert.recovery_time))
        ));
        out.push_str(&format!("`└─ Duration   : {}`\n\n", code_text(&duration)));
    }
    out.trim_end().to_owned()
}

pub fn modem_down_message(
    alerts: &[ModemDownAlert],
    kind: DeviceKind,
    now: DateTime<FixedOffset>,
) -> String {
    let gateway = alerts.first().map(|a| a.gateway.as_str()).unwrap_or("-");
    let event = format!("{} DOWN", kind.label());
    let mut out = header("🚨 *CRITICAL ALERT* 🚨", &event, gateway, Some(now));
    for alert in alerts {
        out.push_str(&format!("🔻 *{}*\n", escape_markdown(&alert.device_name)));
        out.push_str(&format!(
            "`┌─ Alarm : {}`\n",
            code_text(&alarm_state_glyph(&alert.alarm_state))
        ));
        out.push_str(&format!(
            "`└─ Since : {}`\n\n",
            code_text(&wib::format_naive(alert.start_time))
        ));
    }
    out.trim_end().to_owned()
}

pub fn modem_up_message(
    alerts: &[ModemUpAlert],
    kind: DeviceKind,
    now: DateTime<FixedOffset>,
) -> String {
    let gateway = alerts.first().map(|a| a.gateway.as_str()).unwrap_or("-");
    let event = format!("{} UP", kind.label());
    let mut out = header("✅ *RECOVERY* ✅", &event, gateway, Some(now));
    for alert in alerts {
        let duration = wib::format_duration_since(alert.time_down);
        out.push_str(&format!("🔹 *{}*\n", escape_markdown(&alert.device_name)));
        out.push_str(&format!(
            "`┌─ Down Since : {}`\n",
            code_text(&wib::format_wib(alert.time_down))
        ));
        out.push_str(&format!(
            "`├─ Recovered  : {}`\n",
            code_text(&wib::format_wib(alert.recovery_time))
        ));
        out.push_str(&format!("`└─ Duration   : {}`\n\n", code_text(&duration)));
    }
    out.trim_end().to_owned()
}

/// Single-sensor PRTG down report.
pub fn prtg_down_message(alert: &PrtgDownAlert) -> String {
    let event = format!("{} SENSOR DOWN", alert.sensor_type);
    let mut out = header("🚨 *CRITICAL ALERT* 🚨", &event, &alert.location, None);
    out.push_str(&format!("🔻 *{}*\n", escape_markdown(&alert.sensor_full_name)));
    out.push_str(&format!("`┌─ Device     : {}`\n", code_text(&alert.device_name)));
    out.push_str(&format!("`├─ Value      : {}`\n", code_text(&alert.value)));
    out.push_str(&format!("`├─ Status     : {}`\n", code_text(&status_glyph(&alert.status))));
    out.push_str(&format!("`├─ Message    : {}`\n", code_text(&alert.last_message)));
    out.push_str(&format!("`├─ Last Check : {}`\n", code_text(&alert.last_check)));
    out.push_str(&format!("`├─ Last Up    : {}`\n", code_text(&alert.last_up)));
    out.push_str(&format!("`└─ Last Down  : {}`", code_text(&alert.last_down)));
    out
}

/// Single-sensor PRTG recovery report.
pub fn prtg_up_message(alert: &PrtgUpAlert) -> String {
    let event = format!("{} SENSOR UP", alert.sensor_type);
    let mut out = header("✅ *RECOVERY* ✅", &event, &alert.location, None);
    out.push_str(&format!("🔹 *{}*\n", escape_markdown(&alert.sensor_full_name)));
    out.push_str(&format!("`┌─ Device    : {}`\n", code_text(&alert.device_name)));
    out.push_str(&format!(
        "`└─ Recovered : {}`",
        code_text(&wib::format_wib(alert.recovery_time))
    ));
    out
}

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
