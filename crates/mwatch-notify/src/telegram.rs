//! Telegram Bot API client.
//!
//! Covers the three calls the watcher needs: `sendMessage` (HTML),
//! `sendDocument` (multipart upload) and long-poll `getUpdates`.

use crate::error::{NotifyError, NotifyResult};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Generic Bot API response envelope.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

/// One `getUpdates` item. Only plain messages are used.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IncomingMessage {
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Bot API client bound to one default chat.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    client: Client,
    api_base: String,
    chat_id: String,
}

impl TelegramClient {
    pub fn new(bot_token: &str, chat_id: impl Into<String>, timeout: Duration) -> NotifyResult<Self> {
        Self::with_api_base(DEFAULT_API_BASE, bot_token, chat_id, timeout)
    }

    /// Point at a different API host (local Bot API server, tests).
    pub fn with_api_base(
        api_base: &str,
        bot_token: &str,
        chat_id: impl Into<String>,
        timeout: Duration,
    ) -> NotifyResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: format!("{}/bot{}", api_base.trim_end_matches('/'), bot_token),
            chat_id: chat_id.into(),
        })
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.api_base, method)
    }

    async fn read_response<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> NotifyResult<Option<T>> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| NotifyError::HttpClient(format!("Failed to read response: {e}")))?;

        let parsed: ApiResponse<T> = serde_json::from_str(&body).map_err(|_| NotifyError::Api {
            status: status.as_u16(),
            description: body.chars().take(200).collect(),
        })?;

        if !parsed.ok || !status.is_success() {
            return Err(NotifyError::Api {
                status: status.as_u16(),
                description: parsed.description.unwrap_or_default(),
            });
        }
        Ok(parsed.result)
    }

    /// Send an HTML message to the default chat.
    pub async fn send_message(&self, text: &str) -> NotifyResult<()> {
        self.send_message_to(&self.chat_id, text).await
    }

    /// Send an HTML message to `chat_id`.
    pub async fn send_message_to(&self, chat_id: &str, text: &str) -> NotifyResult<()> {
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&json!({
                "chat_id": chat_id,
                "text": text,
                "parse_mode": "HTML",
                "disable_web_page_preview": true,
            }))
            .send()
            .await
            .map_err(|e| NotifyError::HttpClient(format!("sendMessage failed: {e}")))?;

        Self::read_response::<serde_json::Value>(response).await?;
        debug!(chat_id, len = text.len(), "Message sent");
        Ok(())
    }

    /// Upload `content` as a file named `file_name`.
    pub async fn send_document(
        &self,
        chat_id: &str,
        file_name: &str,
        content: Vec<u8>,
        caption: &str,
    ) -> NotifyResult<()> {
        let part = Part::bytes(content)
            .file_name(file_name.to_string())
            .mime_str("application/octet-stream")
            .map_err(|e| NotifyError::HttpClient(format!("Invalid mime type: {e}")))?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("document", part);

        let response = self
            .client
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| NotifyError::HttpClient(format!("sendDocument failed: {e}")))?;

        Self::read_response::<serde_json::Value>(response).await?;
        debug!(chat_id, file_name, "Document sent");
        Ok(())
    }

    /// Long-poll for updates with `update_id >= offset`.
    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> NotifyResult<Vec<Update>> {
        let mut query = vec![("timeout", timeout_secs.to_string())];
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }

        let response = self
            .client
            .get(self.method_url("getUpdates"))
            .query(&query)
            .send()
            .await
            .map_err(|e| NotifyError::HttpClient(format!("getUpdates failed: {e}")))?;

        Ok(Self::read_response::<Vec<Update>>(response)
            .await?
            .unwrap_or_default())
    }
}
