use thiserror::Error;

/// Errors raised while loading the font face at startup.
///
/// These are fatal: the server cannot render anything without a font.
#[derive(Debug, Clone, Error)]
pub enum FontError {
    /// The font file could not be read
    #[error("Failed to read font file {path}: {message}")]
    Read { path: String, message: String },

    /// The font data is not a usable TrueType/OpenType font
    #[error("Failed to parse font {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    /// Font size must be a positive, finite number of pixels
    #[error("Invalid font size: {0}")]
    InvalidSize(f32),
}

/// Errors that can occur while rasterizing text onto a canvas
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// Canvas has a zero dimension
    #[error("Canvas must not be empty (got {width}x{height})")]
    EmptyCanvas { width: u32, height: u32 },
}

/// Errors from the JPEG encoder
#[derive(Debug, Clone, Error)]
#[error("Failed to encode image: {message}")]
pub struct EncodeError {
    pub message: String,
}

/// I/O errors from the content-addressed store
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// The storage root could not be created or is not a directory
    #[error("Storage root {path} is unusable: {message}")]
    Root { path: String, message: String },

    /// Reading, writing or renaming a cache file failed
    #[error("Storage I/O error on {path}: {message}")]
    Io { path: String, message: String },
}

impl StorageError {
    pub(crate) fn io(path: &std::path::Path, err: &std::io::Error) -> Self {
        StorageError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

/// Errors returned by the image pipeline, tagged by the stage that failed
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// The message text was empty
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Rasterization failed
    #[error("Render stage failed: {0}")]
    Render(#[from] RenderError),

    /// JPEG encoding failed
    #[error("Encode stage failed: {0}")]
    Encode(#[from] EncodeError),

    /// Persisting the image failed
    #[error("Storage stage failed: {0}")]
    Storage(#[from] StorageError),

    /// The blocking render task panicked or was cancelled
    #[error("Render task failed: {message}")]
    Task { message: String },
}

/// Errors raised while verifying or parsing an inbound platform payload
#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    /// The request signature or secret token did not verify
    #[error("Invalid signature")]
    InvalidSignature,

    /// The payload is not what the platform documents
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

/// Errors delivering a reply back to a chat platform
#[derive(Debug, Clone, Error)]
pub enum ReplyError {
    /// Transport-level failure talking to the platform API
    #[error("HTTP error: {0}")]
    Http(String),

    /// The platform API answered with an error
    #[error("Platform rejected reply ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// The platform needs a reply token but the event had none
    #[error("Event has no reply token")]
    MissingReplyToken,
}

impl From<reqwest::Error> for ReplyError {
    /// The request URL is dropped; Telegram embeds the bot token in it.
    fn from(err: reqwest::Error) -> Self {
        ReplyError::Http(err.without_url().to_string())
    }
}

/// Errors from dispatching one inbound webhook delivery
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// Signature verification failed; nothing was processed
    #[error("Invalid signature from {platform}")]
    InvalidSignature {
        platform: &'static str,
        status: u16,
    },

    /// The payload could not be parsed
    #[error("Failed to parse {platform} payload: {message}")]
    Parse {
        platform: &'static str,
        message: String,
    },

    /// Generating the image failed
    #[error("Failed to generate image: {0}")]
    Pipeline(#[from] PipelineError),

    /// The image was generated and cached but the reply failed
    #[error("Failed to reply via {platform}: {source}")]
    Reply {
        platform: &'static str,
        source: ReplyError,
    },

    /// The delivery did not finish before its deadline
    #[error("Dispatch timed out after {millis}ms")]
    Timeout { millis: u64 },
}
