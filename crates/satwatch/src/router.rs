// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bot command routing.
//!
//! One long-poll loop consumes the update stream; every command message is
//! dispatched on a fresh task. Admin commands from unauthorized users get a
//! fixed denial; unknown commands are answered for admins and ignored for
//! everyone else. Replies above Telegram's length limit are uploaded as
//! documents instead of inline text.

use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::api::AuthClient;
use crate::config::Config;
use crate::fetch::{self, GatewaySnapshot};
use crate::notify::escape_markdown;
use crate::render;
use crate::report::Gateway;
use crate::state::StateStore;
use crate::telegram::{self, CommandSpec, Message, TelegramClient};
use crate::wib;

const PUBLIC_MENU: [CommandSpec; 3] = [
    CommandSpec { command: "start", description: "Start interacting with the bot" },
    CommandSpec { command: "help", description: "Show the help message" },
    CommandSpec { command: "myid", description: "Show your Telegram ID" },
];

const ADMIN_MENU: [CommandSpec; 13] = [
    CommandSpec { command: "help", description: "Show the help message" },
    CommandSpec { command: "myid", description: "Show your Telegram ID" },
    CommandSpec { command: "satria1_gateway_all", description: "Status summary of every gateway" },
    CommandSpec { command: "satria1_gateway_jyp", description: "Gateway Jayapura summary" },
    CommandSpec { command: "satria1_gateway_mnk", description: "Gateway Manokwari summary" },
    CommandSpec { command: "satria1_gateway_tmk", description: "Gateway Timika summary" },
    CommandSpec { command: "satria1_iptx_jyp", description: "IP transit info, Jayapura" },
    CommandSpec { command: "satria1_iptx_mnk", description: "IP transit info, Manokwari" },
    CommandSpec { command: "satria1_iptx_tmk", description: "IP transit info, Timika" },
    CommandSpec { command: "log_error", description: "Recent error log lines" },
    CommandSpec { command: "log_notif", description: "Recent notification log lines" },
    CommandSpec { command: "log_alerts_active", description: "Currently open alerts" },
    CommandSpec { command: "log_all", description: "Recent raw log lines" },
];

const ADMIN_COMMANDS: [&str; 11] = [
    "satria1_gateway_all",
    "satria1_gateway_jyp",
    "satria1_gateway_mnk",
    "satria1_gateway_tmk",
    "satria1_iptx_jyp",
    "satria1_iptx_mnk",
    "satria1_iptx_tmk",
    "log_error",
    "log_notif",
    "log_alerts_active",
    "log_all",
];

const MAX_LOG_LINES: usize = 20;
const MAX_FILTERED_LINES: usize = 15;
const POLL_SECS: u64 = 50;

/// Extract the command name from a message: leading `/`, optional
/// `@botname` suffix, arguments ignored.
pub fn parse_command(text: &str) -> Option<&str> {
    let first = text.trim().split_whitespace().next()?;
    let stripped = first.strip_prefix('/')?;
    let command = stripped.split('@').next().unwrap_or(stripped);
    if command.is_empty() {
        None
    } else {
        Some(command)
    }
}

pub fn is_admin_command(command: &str) -> bool {
    ADMIN_COMMANDS.contains(&command)
}

/// True when the rendered reply exceeds Telegram's message limit and must
/// be delivered as a document.
pub fn needs_document(rendered: &str) -> bool {
    telegram::message_len(rendered) > telegram::MAX_MESSAGE_LEN
}

pub struct Router {
    tg: TelegramClient,
    auth: Arc<AuthClient>,
    state: Arc<StateStore>,
    config: Arc<Config>,
    authorized: HashSet<i64>,
}

impl Router {
    pub fn new(
        tg: TelegramClient,
        auth: Arc<AuthClient>,
        state: Arc<StateStore>,
        config: Arc<Config>,
    ) -> Self {
        let authorized = config.authorized_ids();
        Self { tg, auth, state, config, authorized }
    }

    /// Long-poll loop. Exits when `shutdown` is cancelled.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        info!("bot poller starting");
        let mut offset = 0i64;
        loop {
            let updates = tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.tg.get_updates(offset, POLL_SECS) => result,
            };
            match updates {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        let Some(message) = update.message else {
                            continue;
                        };
                        let router = Arc::clone(&self);
                        tokio::spawn(async move {
                            router.handle_message(message).await;
                        });
                    }
                }
                Err(e) => {
                    warn!(err = %e, "update poll failed, backing off");
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(std::time::Duration::from_secs(5)) => {}
                    }
                }
            }
        }
        info!("bot poller stopped");
    }

    /// Route one incoming message. Non-commands are ignored.
    pub async fn handle_message(&self, message: Message) {
        let Some(text) = message.text.as_deref() else {
            return;
        };
        let Some(command) = parse_command(text) else {
            return;
        };
        let Some(user) = message.from.as_ref() else {
            return;
        };
        let chat_id = message.chat.id.to_string();
        let is_admin = self.authorized.contains(&user.id);
        info!(command, user_id = user.id, username = ?user.username, "command received");

        if is_admin_command(command) && !is_admin {
            self.send(&chat_id, render::ACCESS_DENIED).await;
            return;
        }

        match command {
            "start" | "help" => {
                self.push_menu(message.chat.id, is_admin).await;
                self.send(&chat_id, &render::help_message(is_admin)).await;
            }
            "myid" => {
                self.send(&chat_id, &render::myid_message(user.id)).await;
            }
            "satria1_gateway_jyp" => self.gateway_summary(&chat_id, Gateway::Jayapura).await,
            "satria1_gateway_mnk" => self.gateway_summary(&chat_id, Gateway::Manokwari).await,
            "satria1_gateway_tmk" => self.gateway_summary(&chat_id, Gateway::Timika).await,
            "satria1_gateway_all" => self.gateway_all(&chat_id).await,
            "satria1_iptx_jyp" => self.iptx_info(&chat_id, Gateway::Jayapura).await,
            "satria1_iptx_mnk" => self.iptx_info(&chat_id, Gateway::Manokwari).await,
            "satria1_iptx_tmk" => self.iptx_info(&chat_id, Gateway::Timika).await,
            "log_error" | "log_notif" | "log_alerts_active" | "log_all" => {
                self.logs(&chat_id, command).await;
            }
            _ => {
                if is_admin {
                    self.send(&chat_id, render::UNKNOWN_COMMAND).await;
                }
            }
        }
    }

    /// Scope the command menu to the invoking chat.
    async fn push_menu(&self, chat_id: i64, is_admin: bool) {
        let menu: &[CommandSpec] = if is_admin { &ADMIN_MENU } else { &PUBLIC_MENU };
        if let Err(e) = self.tg.set_chat_commands(chat_id, menu).await {
            warn!(chat_id, err = %e, "failed to push command menu");
        }
    }

    async fn send(&self, chat_id: &str, text: &str) {
        if let Err(e) = self.tg.send_message(chat_id, text).await {
            warn!(chat_id, err = %e, "failed to send reply");
        }
    }

    /// Inline text when it fits, document upload when it does not. The
    /// temp file is removed when the guard drops at handler exit.
    async fn deliver(&self, chat_id: &str, title: &str, file_name: &str, raw: &str, rendered: &str) {
        if !needs_document(rendered) {
            self.send(chat_id, rendered).await;
            return;
        }
        info!(title, len = telegram::message_len(rendered), "reply too long, sending as document");
        let tmp = match write_temp(raw) {
            Ok(tmp) => tmp,
            Err(e) => {
                error!(err = %e, "failed to stage document");
                self.send(chat_id, &escape_markdown("Failed to prepare the log file.")).await;
                return;
            }
        };
        let caption = format!("Here is the {title}");
        if let Err(e) = self.tg.send_document(chat_id, tmp.path(), file_name, &caption).await {
            warn!(chat_id, err = %e, "failed to send document");
        }
    }

    async fn gateway_summary(&self, chat_id: &str, gateway: Gateway) {
        self.ack(chat_id, &format!("Fetching data for Gateway {}, please wait...", gateway.title()))
            .await;
        let urls = fetch::gateway_urls(&self.config, gateway);
        let snapshot = fetch::fetch_gateway_data(&self.auth, &urls, gateway).await;
        let rendered = render::gateway_summary(gateway, &snapshot, wib::now_wib());
        let file_name = format!("gateway_{}.txt", gateway.code().to_lowercase());
        self.deliver(chat_id, "gateway status report", &file_name, &rendered, &rendered).await;
    }

    async fn gateway_all(&self, chat_id: &str) {
        self.ack(chat_id, "Fetching data for all gateways, this may take a moment...").await;
        let fetch_one = |gateway: Gateway| {
            let urls = fetch::gateway_urls(&self.config, gateway);
            async move {
                (gateway, fetch::fetch_gateway_data(&self.auth, &urls, gateway).await)
            }
        };
        let (jyp, mnk, tmk) = tokio::join!(
            fetch_one(Gateway::Jayapura),
            fetch_one(Gateway::Manokwari),
            fetch_one(Gateway::Timika),
        );
        let snapshots: Vec<(Gateway, GatewaySnapshot)> = vec![jyp, mnk, tmk];
        let rendered = render::all_gateways_summary(&snapshots, wib::now_wib());
        self.deliver(chat_id, "all-gateways status report", "gateway_all.txt", &rendered, &rendered)
            .await;
    }

    async fn iptx_info(&self, chat_id: &str, gateway: Gateway) {
        self.ack(chat_id, &format!("Fetching IP transit data for Gateway {}...", gateway.title()))
            .await;
        let urls = fetch::gateway_urls(&self.config, gateway);
        let (status, traffic, online_ut) = fetch::fetch_iptx_data(&self.auth, &urls, gateway).await;
        let rendered = render::iptx_info(
            gateway,
            status.as_ref(),
            traffic.as_ref(),
            online_ut.as_ref(),
            wib::now_wib(),
        );
        self.send(chat_id, &rendered).await;
    }

    async fn logs(&self, chat_id: &str, command: &str) {
        let (title, file_name, raw) = match command {
            "log_error" => (
                "recent error log",
                "log_error.txt",
                self.read_log_lines(MAX_FILTERED_LINES, &["ERROR"]),
            ),
            "log_notif" => (
                "recent notification log",
                "log_notif.txt",
                self.read_log_lines(MAX_FILTERED_LINES, &["notify"]),
            ),
            "log_all" => ("recent raw log", "log_all.txt", self.read_log_lines(MAX_LOG_LINES, &[])),
            _ => ("active alerts", "active_alerts.json", self.read_active_alerts()),
        };
        let rendered = render::log_message(title, &raw);
        self.deliver(chat_id, title, file_name, &raw, &rendered).await;
    }

    async fn ack(&self, chat_id: &str, text: &str) {
        self.send(chat_id, &escape_markdown(text)).await;
    }

    /// Last `max` log lines, keeping only lines containing any filter.
    fn read_log_lines(&self, max: usize, filters: &[&str]) -> String {
        let path = self.config.log_file();
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                error!(path = %path.display(), err = %e, "failed to read log file");
                return "Error: cannot read the log file.".to_owned();
            }
        };
        let matching: Vec<&str> = raw
            .lines()
            .filter(|line| filters.is_empty() || filters.iter().any(|f| line.contains(f)))
            .collect();
        let start = matching.len().saturating_sub(max);
        matching[start..].join("\n")
    }

    fn read_active_alerts(&self) -> String {
        let path = self.config.state_file();
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                error!(path = %path.display(), err = %e, "failed to read alert state file");
                return "Error: cannot read the alert state file.".to_owned();
            }
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "{}" || trimmed == "[]" {
            return "No active alerts.".to_owned();
        }
        match serde_json::from_str::<serde_json::Value>(trimmed)
            .and_then(|v| serde_json::to_string_pretty(&v))
        {
            Ok(pretty) => pretty,
            Err(_) => raw,
        }
    }
}

fn write_temp(content: &str) -> anyhow::Result<tempfile::NamedTempFile> {
    let mut tmp = tempfile::NamedTempFile::new()?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    Ok(tmp)
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
