//! Telegram Bot API adapter.
//!
//! Telegram posts one `Update` object per webhook call. When the webhook was
//! registered with a secret token, every delivery carries it in the
//! `X-Telegram-Bot-Api-Secret-Token` header.
//!
//! Replies are sent with `sendPhoto`, passing the image URL and threading the
//! reply onto the original message.

use std::time::Duration;

use async_trait::async_trait;
use http::{HeaderMap, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::signature::constant_time_eq;
use super::{InboundEvent, Platform, PlatformKind};
use crate::error::{PlatformError, ReplyError};

/// Production API origin.
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Header carrying the webhook secret token.
pub const TELEGRAM_SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

// =============================================================================
// Update Payload
// =============================================================================

#[derive(Debug, Deserialize)]
struct Update {
    #[allow(dead_code)]
    update_id: i64,

    #[serde(default)]
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    message_id: i64,
    chat: Chat,

    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,

    #[serde(default)]
    description: Option<String>,

    #[serde(default)]
    error_code: Option<u16>,
}

impl Update {
    fn into_events(self) -> Vec<InboundEvent> {
        let Some(message) = self.message else {
            return vec![InboundEvent::other(
                PlatformKind::Telegram,
                "",
                None,
                "update",
            )];
        };

        let chat_id = message.chat.id.to_string();
        let reply_token = Some(message.message_id.to_string());

        let event = match message.text {
            Some(text) => InboundEvent::text(PlatformKind::Telegram, chat_id, reply_token, text),
            None => InboundEvent::other(PlatformKind::Telegram, chat_id, reply_token, "message"),
        };
        vec![event]
    }
}

// =============================================================================
// Telegram Platform
// =============================================================================

/// Telegram Bot API client and webhook parser.
#[derive(Clone)]
pub struct TelegramPlatform {
    bot_token: String,
    secret_token: Option<String>,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramPlatform {
    /// Create a client for the production API.
    ///
    /// When `secret_token` is set, deliveries without a matching
    /// `X-Telegram-Bot-Api-Secret-Token` header are rejected.
    pub fn new(
        bot_token: impl Into<String>,
        secret_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ReplyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            bot_token: bot_token.into(),
            secret_token: secret_token.filter(|s| !s.is_empty()),
            api_base: DEFAULT_TELEGRAM_API_BASE.to_string(),
            client,
        })
    }

    /// Point the client at a different API origin.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    /// Register `webhook_url` with Telegram, including the secret token.
    ///
    /// # Errors
    ///
    /// Returns [`ReplyError`] if the API call fails or is rejected.
    pub async fn register_webhook(&self, webhook_url: &str) -> Result<(), ReplyError> {
        let mut payload = json!({ "url": webhook_url });
        if let Some(ref secret) = self.secret_token {
            payload["secret_token"] = json!(secret);
        }

        self.call("setWebhook", &payload).await?;
        info!(url = %webhook_url, "Registered Telegram webhook");
        Ok(())
    }

    async fn call(&self, method: &str, payload: &serde_json::Value) -> Result<(), ReplyError> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        let parsed: Option<ApiResponse> = serde_json::from_str(&body).ok();
        match parsed {
            Some(api) if api.ok && status.is_success() => Ok(()),
            Some(api) => Err(ReplyError::Rejected {
                status: api.error_code.unwrap_or(status.as_u16()),
                body: api.description.unwrap_or(body),
            }),
            None => Err(ReplyError::Rejected {
                status: status.as_u16(),
                body,
            }),
        }
    }
}

impl std::fmt::Debug for TelegramPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The bot token is a credential; keep it out of logs.
        f.debug_struct("TelegramPlatform")
            .field("api_base", &self.api_base)
            .field("secret_token", &self.secret_token.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Platform for TelegramPlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Telegram
    }

    fn parse(&self, body: &[u8], headers: &HeaderMap) -> Result<Vec<InboundEvent>, PlatformError> {
        if let Some(ref expected) = self.secret_token {
            let provided = headers
                .get(TELEGRAM_SECRET_HEADER)
                .map(|v| v.as_bytes())
                .ok_or(PlatformError::InvalidSignature)?;
            if !constant_time_eq(provided, expected.as_bytes()) {
                return Err(PlatformError::InvalidSignature);
            }
        }

        let update: Update = serde_json::from_slice(body)
            .map_err(|e| PlatformError::MalformedPayload(e.to_string()))?;

        Ok(update.into_events())
    }

    async fn reply(
        &self,
        chat_id: &str,
        reply_token: Option<&str>,
        image_url: &str,
    ) -> Result<(), ReplyError> {
        let chat = match chat_id.parse::<i64>() {
            Ok(id) => json!(id),
            Err(_) => json!(chat_id),
        };

        let mut payload = json!({ "chat_id": chat, "photo": image_url });
        if let Some(message_id) = reply_token.and_then(|t| t.parse::<i64>().ok()) {
            payload["reply_to_message_id"] = json!(message_id);
        }

        self.call("sendPhoto", &payload).await?;
        debug!(chat_id = %chat_id, "Telegram photo sent");
        Ok(())
    }

    fn invalid_signature_status(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }
}

// =============================================================================
// Tests
// =============================================================================
