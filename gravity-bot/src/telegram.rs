//! Telegram Bot API adapter.
//!
//! Covers the calls the relay needs: sending messages (formatted first,
//! plain fallback), the typing indicator, inline keyboards, callback
//! acknowledgement and file retrieval.

use async_trait::async_trait;
use serde_json::json;

use gravity_common::{Error, Result};
use gravity_core::mode::Mode;

/// Bot API seam used by the handler. The production implementation is
/// `TelegramChannel`; tests substitute a recording fake.
#[async_trait]
pub trait BotApi: Send + Sync {
    /// Send one message. A formatted send that Telegram rejects for broken
    /// markup is retried once without formatting; only a failed fallback
    /// surfaces as `Error::Delivery`.
    async fn send_message(&self, chat_id: i64, text: &str, formatted: bool) -> Result<()>;

    /// Best-effort "typing" indicator; failures are logged, never returned.
    async fn send_chat_action(&self, chat_id: i64, action: &str);

    /// Acknowledge an inline-button press so the client stops its spinner.
    async fn answer_callback_query(&self, callback_id: &str);

    /// Send the mode-selection inline keyboard.
    async fn send_mode_keyboard(&self, chat_id: i64, text: &str) -> Result<()>;

    /// Resolve a file reference to raw bytes plus a MIME type.
    async fn download_file(&self, file_id: &str) -> Result<(Vec<u8>, String)>;
}

const API_BASE: &str = "https://api.telegram.org";

/// Telegram channel over the Bot API HTTP surface.
pub struct TelegramChannel {
    bot_token: String,
    base_url: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self::with_base_url(bot_token, API_BASE)
    }

    /// Create with a custom API base URL (test servers).
    pub fn with_base_url(bot_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.base_url, self.bot_token)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.base_url, self.bot_token, file_path)
    }

    async fn send_plain(&self, chat_id: i64, text: &str) -> Result<()> {
        let body = json!({ "chat_id": chat_id, "text": text });
        let resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|err| Error::Delivery(err.to_string()))?;

        if resp.status().is_success() {
            return Ok(());
        }
        let err = resp.text().await.unwrap_or_default();
        Err(Error::Delivery(format!("sendMessage failed: {err}")))
    }

    /// Build the inline keyboard payload for mode selection, two buttons
    /// per row.
    fn mode_keyboard() -> serde_json::Value {
        let rows: Vec<Vec<serde_json::Value>> = Mode::ALL
            .chunks(2)
            .map(|pair| {
                pair.iter()
                    .map(|mode| {
                        json!({ "text": mode.label(), "callback_data": mode.as_str() })
                    })
                    .collect()
            })
            .collect();
        json!({ "inline_keyboard": rows })
    }

    fn mime_from_path(file_path: &str) -> &'static str {
        let ext = file_path.rsplit('.').next().unwrap_or("").to_lowercase();
        match ext.as_str() {
            "png" => "image/png",
            "webp" => "image/webp",
            "gif" => "image/gif",
            // Telegram photos are re-encoded as JPEG
            _ => "image/jpeg",
        }
    }
}

#[async_trait]
impl BotApi for TelegramChannel {
    async fn send_message(&self, chat_id: i64, text: &str, formatted: bool) -> Result<()> {
        if !formatted {
            return self.send_plain(chat_id, text).await;
        }

        let body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown"
        });

        let resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|err| Error::Delivery(err.to_string()))?;

        if resp.status().is_success() {
            return Ok(());
        }

        let status = resp.status();
        let error_text = resp.text().await.unwrap_or_default();

        // Telegram answers 400 when the markup after splitting is broken
        // ("Bad Request: can't parse entities"); resend the same fragment
        // unformatted rather than losing it
        if status.as_u16() == 400 {
            tracing::warn!("formatted send rejected, retrying unformatted: {error_text}");
            return self.send_plain(chat_id, text).await;
        }

        Err(Error::Delivery(format!("sendMessage failed: {error_text}")))
    }

    async fn send_chat_action(&self, chat_id: i64, action: &str) {
        let body = json!({ "chat_id": chat_id, "action": action });
        match self
            .client
            .post(self.api_url("sendChatAction"))
            .json(&body)
            .send()
            .await
        {
            Ok(resp) if !resp.status().is_success() => {
                tracing::debug!("sendChatAction failed: {}", resp.status());
            }
            Err(err) => tracing::debug!("sendChatAction failed: {err}"),
            _ => {}
        }
    }

    async fn answer_callback_query(&self, callback_id: &str) {
        let body = json!({ "callback_query_id": callback_id });
        match self
            .client
            .post(self.api_url("answerCallbackQuery"))
            .json(&body)
            .send()
            .await
        {
            Ok(resp) if !resp.status().is_success() => {
                tracing::debug!("answerCallbackQuery failed: {}", resp.status());
            }
            Err(err) => tracing::debug!("answerCallbackQuery failed: {err}"),
            _ => {}
        }
    }

    async fn send_mode_keyboard(&self, chat_id: i64, text: &str) -> Result<()> {
        let body = json!({
            "chat_id": chat_id,
            "text": text,
            "reply_markup": Self::mode_keyboard()
        });

        let resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|err| Error::Telegram(err.to_string()))?;

        if resp.status().is_success() {
            return Ok(());
        }
        let err = resp.text().await.unwrap_or_default();
        Err(Error::Telegram(format!("keyboard send failed: {err}")))
    }

    async fn download_file(&self, file_id: &str) -> Result<(Vec<u8>, String)> {
        // Step 1: resolve the file path via getFile
        let body = json!({ "file_id": file_id });
        let resp = self
            .client
            .post(self.api_url("getFile"))
            .json(&body)
            .send()
            .await
            .map_err(|err| Error::Telegram(err.to_string()))?;

        if !resp.status().is_success() {
            let err = resp.text().await.unwrap_or_default();
            return Err(Error::Telegram(format!("getFile failed: {err}")));
        }

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|err| Error::Telegram(err.to_string()))?;
        let file_path = data
            .get("result")
            .and_then(|r| r.get("file_path"))
            .and_then(|p| p.as_str())
            .ok_or_else(|| Error::Telegram("missing file_path in getFile response".into()))?;

        let mime = Self::mime_from_path(file_path).to_string();

        // Step 2: download the bytes
        let file_resp = self
            .client
            .get(self.file_url(file_path))
            .send()
            .await
            .map_err(|err| Error::Telegram(err.to_string()))?;

        if !file_resp.status().is_success() {
            return Err(Error::Telegram(format!(
                "file download failed: {}",
                file_resp.status()
            )));
        }

        let bytes = file_resp
            .bytes()
            .await
            .map_err(|err| Error::Telegram(err.to_string()))?;
        Ok((bytes.to_vec(), mime))
    }
}
