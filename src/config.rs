//! Configuration management for textshot.
//!
//! Configuration comes from command-line arguments via clap, with environment
//! variable fallbacks using the deployment's variable names:
//!
//! - `HOST` - Server bind address (default: 0.0.0.0)
//! - `PORT` - Server port (default: 8080)
//! - `APP_URL` - Public base URL images are served under (required)
//! - `STORAGE_ROOT` - Directory holding generated images (default: public/images)
//! - `FONT_PATH` - TrueType/OpenType font file (default: fonts/Sarabun-Regular.ttf)
//! - `FONT_SIZE` - Font size in pixels (default: 12)
//! - `LINE_CHANNEL_SECRET`, `LINE_CHANNEL_ACCESS_TOKEN` - LINE credentials
//! - `TELEGRAM_BOT_TOKEN`, `TELEGRAM_SECRET_TOKEN` - Telegram credentials
//! - `REQUEST_TIMEOUT` - Per-webhook deadline in seconds (default: 30)
//! - `CACHE_MAX_AGE` - HTTP cache max-age for images (default: one year)
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use textshot::config::{Cli, Command};
//!
//! match Cli::parse().into_command() {
//!     Command::Serve(config) => println!("Listening on {}", config.bind_address()),
//!     Command::Render(config) => println!("Rendering {:?}", config.text),
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::platform::{DEFAULT_LINE_API_BASE, DEFAULT_TELEGRAM_API_BASE};
use crate::render::DEFAULT_FONT_SIZE;
use crate::server::DEFAULT_CACHE_MAX_AGE;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default image storage directory.
pub const DEFAULT_STORAGE_ROOT: &str = "public/images";

/// Default font file.
pub const DEFAULT_FONT_PATH: &str = "fonts/Sarabun-Regular.ttf";

/// Default per-webhook deadline in seconds.
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 30;

// =============================================================================
// CLI Arguments
// =============================================================================

/// textshot - Renders chat messages into images and replies with their URL.
#[derive(Parser, Debug, Clone)]
#[command(name = "textshot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Consume the CLI and return the selected command.
    pub fn into_command(self) -> Command {
        self.command
    }
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the webhook server.
    Serve(ServeConfig),

    /// Render one message to the image store and print its URL.
    Render(RenderConfig),
}

/// Options shared by every command that renders images.
#[derive(Args, Debug, Clone)]
pub struct ImageConfig {
    /// Public base URL the server is reachable at (e.g. https://bot.example.com).
    ///
    /// Image URLs are built as `<base-url>/images/<digest>.jpeg`.
    #[arg(long, env = "APP_URL")]
    pub base_url: String,

    /// Directory holding generated images.
    #[arg(long, default_value = DEFAULT_STORAGE_ROOT, env = "STORAGE_ROOT")]
    pub storage_root: PathBuf,

    /// TrueType/OpenType font used for rendering.
    #[arg(long, default_value = DEFAULT_FONT_PATH, env = "FONT_PATH")]
    pub font_path: PathBuf,

    /// Font size in pixels.
    #[arg(long, default_value_t = DEFAULT_FONT_SIZE, env = "FONT_SIZE")]
    pub font_size: f32,
}

impl ImageConfig {
    /// Validate the shared rendering options.
    pub fn validate(&self) -> Result<(), String> {
        let base_url = url::Url::parse(&self.base_url)
            .map_err(|e| format!("Invalid base URL '{}': {}", self.base_url, e))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(format!(
                "Base URL must use http or https, got '{}'. Set --base-url or APP_URL",
                base_url.scheme()
            ));
        }

        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err("font_size must be greater than 0".to_string());
        }

        Ok(())
    }
}

// =============================================================================
// Serve Command
// =============================================================================

/// Configuration for the `serve` command.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PORT")]
    pub port: u16,

    #[command(flatten)]
    pub image: ImageConfig,

    /// Deadline in seconds for handling one webhook delivery.
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT, env = "REQUEST_TIMEOUT")]
    pub request_timeout: u64,

    /// HTTP Cache-Control max-age in seconds for served images.
    #[arg(long, default_value_t = DEFAULT_CACHE_MAX_AGE, env = "CACHE_MAX_AGE")]
    pub cache_max_age: u32,

    // =========================================================================
    // LINE Configuration
    // =========================================================================
    /// LINE channel secret used to verify webhook signatures.
    #[arg(long, env = "LINE_CHANNEL_SECRET", hide_env_values = true)]
    pub line_channel_secret: Option<String>,

    /// LINE channel access token used for replies.
    #[arg(long, env = "LINE_CHANNEL_ACCESS_TOKEN", hide_env_values = true)]
    pub line_channel_access_token: Option<String>,

    /// LINE Messaging API origin.
    #[arg(long, default_value = DEFAULT_LINE_API_BASE)]
    pub line_api_base: String,

    // =========================================================================
    // Telegram Configuration
    // =========================================================================
    /// Telegram bot token.
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub telegram_bot_token: Option<String>,

    /// Secret token Telegram must echo on every webhook delivery.
    #[arg(long, env = "TELEGRAM_SECRET_TOKEN", hide_env_values = true)]
    pub telegram_secret_token: Option<String>,

    /// Telegram Bot API origin.
    #[arg(long, default_value = DEFAULT_TELEGRAM_API_BASE)]
    pub telegram_api_base: String,

    /// Register the webhook with Telegram on startup.
    #[arg(long, default_value_t = false)]
    pub telegram_register_webhook: bool,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.image.validate()?;

        // LINE needs both halves: the secret to verify, the token to reply
        match (&self.line_channel_secret, &self.line_channel_access_token) {
            (Some(_), None) => {
                return Err(
                    "LINE channel secret is set but no access token. \
                     Set --line-channel-access-token or LINE_CHANNEL_ACCESS_TOKEN"
                        .to_string(),
                );
            }
            (None, Some(_)) => {
                return Err(
                    "LINE access token is set but no channel secret. \
                     Set --line-channel-secret or LINE_CHANNEL_SECRET"
                        .to_string(),
                );
            }
            _ => {}
        }

        if !self.line_enabled() && !self.telegram_enabled() {
            return Err(
                "No chat platform configured. Set LINE_CHANNEL_SECRET and \
                 LINE_CHANNEL_ACCESS_TOKEN, or TELEGRAM_BOT_TOKEN"
                    .to_string(),
            );
        }

        if self.telegram_register_webhook && !self.telegram_enabled() {
            return Err(
                "--telegram-register-webhook requires TELEGRAM_BOT_TOKEN".to_string(),
            );
        }

        if self.request_timeout == 0 {
            return Err("request_timeout must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Per-webhook deadline.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Whether both LINE credentials are present and non-empty.
    pub fn line_enabled(&self) -> bool {
        non_empty(&self.line_channel_secret) && non_empty(&self.line_channel_access_token)
    }

    /// Whether a Telegram bot token is present and non-empty.
    pub fn telegram_enabled(&self) -> bool {
        non_empty(&self.telegram_bot_token)
    }

    /// URL Telegram should deliver updates to.
    pub fn telegram_webhook_url(&self) -> String {
        format!(
            "{}/platforms/telegram/callback",
            self.image.base_url.trim_end_matches('/')
        )
    }
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

// =============================================================================
// Render Command
// =============================================================================

/// Output format for the `render` command.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderOutputFormat {
    /// Print the image URL only
    #[default]
    Text,

    /// Print URL, digest, cache status and file path as JSON
    Json,
}

/// Configuration for the `render` command.
#[derive(Args, Debug, Clone)]
pub struct RenderConfig {
    /// Message text to render.
    pub text: String,

    #[command(flatten)]
    pub image: ImageConfig,

    /// Output format.
    #[arg(long, value_enum, default_value_t = RenderOutputFormat::Text)]
    pub format: RenderOutputFormat,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl RenderConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        self.image.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
