//! Platform-agnostic inbound message dispatch.
//!
//! The [`Dispatcher`] takes one raw webhook delivery, lets the platform
//! verify and parse it, runs every text event through the
//! [`ImagePipeline`], and replies with the image URL.
//!
//! Each delivery is handled on its own with no state carried between calls.
//! Within a delivery, events are processed in payload order and each event
//! runs render, encode, store and reply strictly in sequence. The first
//! failure stops the delivery; images already stored stay cached.

use std::sync::Arc;
use std::time::Duration;

use http::HeaderMap;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{DispatchError, PipelineError, PlatformError};
use crate::pipeline::ImagePipeline;
use crate::platform::{EventKind, Platform};

/// Counts for one handled delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    /// Events found in the payload
    pub events: usize,

    /// Text events rendered and replied to
    pub replied: usize,

    /// Non-text events skipped
    pub ignored: usize,
}

/// Routes inbound events through the image pipeline.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    pipeline: Arc<ImagePipeline>,
    deadline: Option<Duration>,
}

impl Dispatcher {
    /// Create a dispatcher without a deadline.
    pub fn new(pipeline: Arc<ImagePipeline>) -> Self {
        Self {
            pipeline,
            deadline: None,
        }
    }

    /// Abort a delivery that takes longer than `deadline`.
    ///
    /// Cancellation never leaves a partial file at a digest path.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// The pipeline used for text events.
    pub fn pipeline(&self) -> &Arc<ImagePipeline> {
        &self.pipeline
    }

    /// Handle one webhook delivery.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::InvalidSignature`] if the platform rejects the
    ///   delivery; the pipeline is not invoked
    /// - [`DispatchError::Parse`] for malformed payloads
    /// - [`DispatchError::Pipeline`] / [`DispatchError::Reply`] for the first
    ///   event that fails
    /// - [`DispatchError::Timeout`] if the deadline expires
    pub async fn dispatch(
        &self,
        platform: &dyn Platform,
        body: &[u8],
        headers: &HeaderMap,
    ) -> Result<DispatchSummary, DispatchError> {
        let result = match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.handle(platform, body, headers))
                .await
                .unwrap_or(Err(DispatchError::Timeout {
                    millis: deadline.as_millis() as u64,
                })),
            None => self.handle(platform, body, headers).await,
        };

        match &result {
            Ok(summary) => debug!(
                platform = %platform.kind(),
                events = summary.events,
                replied = summary.replied,
                ignored = summary.ignored,
                "Dispatched delivery"
            ),
            Err(DispatchError::InvalidSignature { .. }) => {
                warn!(platform = %platform.kind(), "Rejected delivery with invalid signature")
            }
            Err(DispatchError::Pipeline(PipelineError::InvalidInput { reason })) => {
                warn!(platform = %platform.kind(), "Rejected message: {}", reason)
            }
            Err(e) => error!(platform = %platform.kind(), "Dispatch failed: {}", e),
        }

        result
    }

    async fn handle(
        &self,
        platform: &dyn Platform,
        body: &[u8],
        headers: &HeaderMap,
    ) -> Result<DispatchSummary, DispatchError> {
        let name = platform.kind().as_str();

        let events = platform.parse(body, headers).map_err(|e| match e {
            PlatformError::InvalidSignature => DispatchError::InvalidSignature {
                platform: name,
                status: platform.invalid_signature_status().as_u16(),
            },
            PlatformError::MalformedPayload(message) => DispatchError::Parse {
                platform: name,
                message,
            },
        })?;

        let mut summary = DispatchSummary {
            events: events.len(),
            ..DispatchSummary::default()
        };

        for event in events {
            let text = match event.kind {
                EventKind::Text { text } => text,
                EventKind::Other { kind } => {
                    debug!(platform = name, kind = %kind, "Ignoring non-text event");
                    summary.ignored += 1;
                    continue;
                }
            };

            let image = self.pipeline.generate(&text).await?;

            platform
                .reply(&event.chat_id, event.reply_token.as_deref(), &image.url)
                .await
                .map_err(|source| DispatchError::Reply {
                    platform: name,
                    source,
                })?;

            info!(
                platform = name,
                chat_id = %event.chat_id,
                digest = %image.digest,
                cache_hit = image.cache_hit,
                "Replied with image"
            );
            summary.replied += 1;
        }

        Ok(summary)
    }
}
