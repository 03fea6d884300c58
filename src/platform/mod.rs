//! Chat platform adapters.
//!
//! Every platform turns a raw webhook delivery into zero or more
//! [`InboundEvent`]s and knows how to send an image URL back to a chat.
//! The dispatcher only talks to the [`Platform`] trait, so adding a platform
//! never touches the renderer or the store.
//!
//! ```text
//!   raw body + headers ──► Platform::parse ──► Vec<InboundEvent>
//!                                                   │
//!                              EventKind::Text ─────┤──── EventKind::Other
//!                                    │                        (ignored)
//!                                    ▼
//!                           ImagePipeline::generate
//!                                    │
//!                                    ▼
//!                    Platform::reply(chat_id, reply_token, url)
//! ```

mod line;
mod signature;
mod telegram;

use std::fmt;

use async_trait::async_trait;
use http::{HeaderMap, StatusCode};

use crate::error::{PlatformError, ReplyError};

pub use line::{LinePlatform, DEFAULT_LINE_API_BASE, LINE_SIGNATURE_HEADER};
pub use signature::{constant_time_eq, BodySigner};
pub use telegram::{TelegramPlatform, DEFAULT_TELEGRAM_API_BASE, TELEGRAM_SECRET_HEADER};

/// Supported chat platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformKind {
    Line,
    Telegram,
}

impl PlatformKind {
    /// Lowercase name used in logs and routes.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformKind::Line => "line",
            PlatformKind::Telegram => "telegram",
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an inbound event carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A plain text message
    Text { text: String },

    /// Anything else (stickers, joins, follows, ...), named by the platform
    Other { kind: String },
}

/// One incoming chat message, independent of the originating platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Platform the event came from
    pub platform: PlatformKind,

    /// Chat (user, group or room) to reply to
    pub chat_id: String,

    /// Token or message id used to thread the reply, if the platform has one
    pub reply_token: Option<String>,

    /// Event payload
    pub kind: EventKind,
}

impl InboundEvent {
    /// Create a text event.
    pub fn text(
        platform: PlatformKind,
        chat_id: impl Into<String>,
        reply_token: Option<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            chat_id: chat_id.into(),
            reply_token,
            kind: EventKind::Text { text: text.into() },
        }
    }

    /// Create a non-text event.
    pub fn other(
        platform: PlatformKind,
        chat_id: impl Into<String>,
        reply_token: Option<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            chat_id: chat_id.into(),
            reply_token,
            kind: EventKind::Other { kind: kind.into() },
        }
    }
}

/// A chat platform the dispatcher can receive from and reply to.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Which platform this is.
    fn kind(&self) -> PlatformKind;

    /// Verify and parse a raw webhook delivery.
    ///
    /// Must return [`PlatformError::InvalidSignature`] when the delivery
    /// cannot be authenticated, before looking at the body.
    fn parse(&self, body: &[u8], headers: &HeaderMap) -> Result<Vec<InboundEvent>, PlatformError>;

    /// Send an image URL back to a chat.
    async fn reply(
        &self,
        chat_id: &str,
        reply_token: Option<&str>,
        image_url: &str,
    ) -> Result<(), ReplyError>;

    /// HTTP status to answer with when the signature does not verify.
    fn invalid_signature_status(&self) -> StatusCode;
}
