//! LINE Messaging API adapter.
//!
//! # Webhook
//!
//! Deliveries carry an `X-Line-Signature` header and a JSON body:
//!
//! ```json
//! {
//!   "destination": "U...",
//!   "events": [{
//!     "type": "message",
//!     "replyToken": "nHuyWiB7yP5Zw52FIkcQobQuGDXCTA",
//!     "source": { "type": "user", "userId": "U4af4980629..." },
//!     "message": { "type": "text", "id": "325708", "text": "hello" }
//!   }]
//! }
//! ```
//!
//! # Reply
//!
//! `POST /v2/bot/message/reply` with an image message whose original and
//! preview URLs both point at the generated image.

use std::time::Duration;

use async_trait::async_trait;
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::signature::BodySigner;
use super::{InboundEvent, Platform, PlatformKind};
use crate::error::{PlatformError, ReplyError};

/// Production API origin.
pub const DEFAULT_LINE_API_BASE: &str = "https://api.line.me";

/// Header carrying the body signature.
pub const LINE_SIGNATURE_HEADER: &str = "x-line-signature";

const REPLY_PATH: &str = "/v2/bot/message/reply";

// =============================================================================
// Webhook Payload
// =============================================================================

#[derive(Debug, Deserialize)]
struct WebhookBody {
    #[serde(default)]
    events: Vec<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookEvent {
    #[serde(rename = "type")]
    kind: String,

    #[serde(default)]
    reply_token: Option<String>,

    #[serde(default)]
    source: Option<EventSource>,

    #[serde(default)]
    message: Option<EventMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventSource {
    #[serde(default)]
    user_id: Option<String>,

    #[serde(default)]
    group_id: Option<String>,

    #[serde(default)]
    room_id: Option<String>,
}

impl EventSource {
    /// Groups and rooms take precedence over the sending user.
    fn chat_id(&self) -> Option<&str> {
        self.group_id
            .as_deref()
            .or(self.room_id.as_deref())
            .or(self.user_id.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct EventMessage {
    #[serde(rename = "type")]
    kind: String,

    #[serde(default)]
    text: Option<String>,
}

impl WebhookEvent {
    fn into_inbound(self) -> InboundEvent {
        let WebhookEvent {
            kind,
            reply_token,
            source,
            message,
        } = self;

        let chat_id = source
            .as_ref()
            .and_then(EventSource::chat_id)
            .unwrap_or_default()
            .to_string();

        if kind != "message" {
            return InboundEvent::other(PlatformKind::Line, chat_id, reply_token, kind);
        }

        match message {
            Some(EventMessage {
                kind: message_kind,
                text: Some(text),
            }) if message_kind == "text" => {
                InboundEvent::text(PlatformKind::Line, chat_id, reply_token, text)
            }
            Some(message) => InboundEvent::other(
                PlatformKind::Line,
                chat_id,
                reply_token,
                format!("message:{}", message.kind),
            ),
            None => InboundEvent::other(PlatformKind::Line, chat_id, reply_token, kind),
        }
    }
}

// =============================================================================
// Reply Payload
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: [ImageMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    original_content_url: &'a str,
    preview_image_url: &'a str,
}

// =============================================================================
// LINE Platform
// =============================================================================

/// LINE Messaging API client and webhook parser.
#[derive(Clone)]
pub struct LinePlatform {
    signer: BodySigner,
    access_token: String,
    api_base: String,
    client: reqwest::Client,
}

impl LinePlatform {
    /// Create a client for the production API.
    ///
    /// # Errors
    ///
    /// Returns [`ReplyError::Http`] if the HTTP client cannot be built.
    pub fn new(
        channel_secret: impl AsRef<[u8]>,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ReplyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            signer: BodySigner::new(channel_secret),
            access_token: access_token.into(),
            api_base: DEFAULT_LINE_API_BASE.to_string(),
            client,
        })
    }

    /// Point the client at a different API origin.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// API origin in use.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }
}

impl std::fmt::Debug for LinePlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinePlatform")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Platform for LinePlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Line
    }

    fn parse(&self, body: &[u8], headers: &HeaderMap) -> Result<Vec<InboundEvent>, PlatformError> {
        let signature = headers
            .get(LINE_SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(PlatformError::InvalidSignature)?;
        self.signer.verify(body, signature)?;

        let payload: WebhookBody = serde_json::from_slice(body)
            .map_err(|e| PlatformError::MalformedPayload(e.to_string()))?;

        Ok(payload
            .events
            .into_iter()
            .map(WebhookEvent::into_inbound)
            .collect())
    }

    async fn reply(
        &self,
        _chat_id: &str,
        reply_token: Option<&str>,
        image_url: &str,
    ) -> Result<(), ReplyError> {
        let reply_token = reply_token.ok_or(ReplyError::MissingReplyToken)?;

        let request = ReplyRequest {
            reply_token,
            messages: [ImageMessage {
                kind: "image",
                original_content_url: image_url,
                preview_image_url: image_url,
            }],
        };

        let response = self
            .client
            .post(format!("{}{}", self.api_base, REPLY_PATH))
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let request_id = response
            .headers()
            .get("x-line-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReplyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(request_id = ?request_id, "LINE reply sent");
        Ok(())
    }

    fn invalid_signature_status(&self) -> StatusCode {
        StatusCode::OK
    }
}

// =============================================================================
// Tests
// =============================================================================
