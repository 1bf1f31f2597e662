// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal typed client for the Telegram Bot API.
//!
//! Covers exactly the calls the monitor needs: `sendMessage` (MarkdownV2),
//! `sendDocument` (multipart upload), `getUpdates` (long poll), and
//! `setMyCommands` with a per-chat scope. Errors carry the API description
//! when one is returned.

use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Telegram's hard limit on message length, in UTF-16 code units.
pub const MAX_MESSAGE_LEN: usize = 4096;

#[derive(Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base: String,
}

/// Standard Bot API envelope.
#[derive(Debug, Deserialize)]
struct ApiReply<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

/// One long-poll update. Non-message updates deserialize with
/// `message: None` and are skipped by the router.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

/// A command menu entry for `setMyCommands`.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub command: &'static str,
    pub description: &'static str,
}

impl TelegramClient {
    pub fn new(http: reqwest::Client, token: &str) -> Self {
        Self::with_base_url(http, format!("https://api.telegram.org/bot{token}"))
    }

    /// Point the client at an alternate API host (tests).
    pub fn with_base_url(http: reqwest::Client, base: impl Into<String>) -> Self {
        Self { http, base: base.into() }
    }

    /// Send a MarkdownV2 message. One call, one platform message; no retry.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> anyhow::Result<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "MarkdownV2",
        });
        let resp = self
            .http
            .post(format!("{}/sendMessage", self.base))
            .json(&body)
            .send()
            .await
            .context("send telegram message")?;
        Self::decode::<serde_json::Value>(resp).await.map(|_| ())
    }

    /// Upload a file as a document with a plain-text caption.
    pub async fn send_document(
        &self,
        chat_id: &str,
        path: &Path,
        file_name: &str,
        caption: &str,
    ) -> anyhow::Result<()> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("read document {}", path.display()))?;
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_owned())
            .mime_str("text/plain")
            .context("document mime type")?;
        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_owned())
            .text("caption", caption.to_owned())
            .part("document", part);
        let resp = self
            .http
            .post(format!("{}/sendDocument", self.base))
            .multipart(form)
            .send()
            .await
            .context("send telegram document")?;
        Self::decode::<serde_json::Value>(resp).await.map(|_| ())
    }

    /// Long-poll for updates after `offset`. The per-request timeout is
    /// padded past the poll window so the client timeout never wins.
    pub async fn get_updates(&self, offset: i64, poll_secs: u64) -> anyhow::Result<Vec<Update>> {
        let resp = self
            .http
            .get(format!("{}/getUpdates", self.base))
            .query(&[("offset", offset.to_string()), ("timeout", poll_secs.to_string())])
            .timeout(std::time::Duration::from_secs(poll_secs + 15))
            .send()
            .await
            .context("poll telegram updates")?;
        Self::decode(resp).await
    }

    /// Replace the command menu for one chat.
    pub async fn set_chat_commands(
        &self,
        chat_id: i64,
        commands: &[CommandSpec],
    ) -> anyhow::Result<()> {
        let commands: Vec<serde_json::Value> = commands
            .iter()
            .map(|c| serde_json::json!({"command": c.command, "description": c.description}))
            .collect();
        let body = serde_json::json!({
            "commands": commands,
            "scope": {"type": "chat", "chat_id": chat_id},
        });
        let resp = self
            .http
            .post(format!("{}/setMyCommands", self.base))
            .json(&body)
            .send()
            .await
            .context("set telegram commands")?;
        Self::decode::<serde_json::Value>(resp).await.map(|_| ())
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> anyhow::Result<T> {
        let status = resp.status();
        let reply: ApiReply<T> = resp
            .json()
            .await
            .with_context(|| format!("decode telegram reply (http {status})"))?;
        if !reply.ok {
            let description = reply.description.unwrap_or_else(|| "no description".to_owned());
            anyhow::bail!("telegram API error (http {status}): {description}");
        }
        reply.result.ok_or_else(|| anyhow::anyhow!("telegram reply missing result"))
    }
}

/// Message length in the units Telegram counts: UTF-16 code units.
pub fn message_len(text: &str) -> usize {
    text.encode_utf16().count()
}

#[cfg(test)]
#[path = "telegram_tests.rs"]
mod tests;
