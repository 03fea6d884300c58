//! textshot - Renders chat messages into images and replies with their URL.
//!
//! This binary starts the webhook server or renders a single message.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use textshot::{
    config::{Cli, Command, ImageConfig, RenderConfig, RenderOutputFormat, ServeConfig},
    dispatch::Dispatcher,
    pipeline::ImagePipeline,
    platform::{LinePlatform, TelegramPlatform},
    render::{FontFace, Renderer},
    server::{create_router, Platforms, RouterConfig},
    store::ContentStore,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Render(config) => run_render(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("textshot v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Base URL: {}", config.image.base_url);
    info!("  Storage root: {}", config.image.storage_root.display());
    info!(
        "  Font: {} @ {}px",
        config.image.font_path.display(),
        config.image.font_size
    );
    info!("  Request timeout: {}s", config.request_timeout);

    let pipeline = match build_pipeline(&config.image).await {
        Ok(pipeline) => Arc::new(pipeline),
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let dispatcher = Arc::new(Dispatcher::new(pipeline).with_deadline(config.request_timeout()));

    let platforms = match build_platforms(&config).await {
        Ok(platforms) => platforms,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let router_config = RouterConfig::new()
        .with_cache_max_age(config.cache_max_age)
        .with_tracing(!config.no_tracing);

    let router = create_router(dispatcher, platforms, router_config);

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    if config.line_enabled() {
        info!("  LINE webhook:     {}/platforms/line/callback", base(&config));
    }
    if config.telegram_enabled() {
        info!("  Telegram webhook: {}", config.telegram_webhook_url());
    }
    info!("  Health check:     curl http://{}/health", addr);
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn base(config: &ServeConfig) -> &str {
    config.image.base_url.trim_end_matches('/')
}

/// Load the font and open the store. Either failing is fatal.
async fn build_pipeline(config: &ImageConfig) -> Result<ImagePipeline, String> {
    let font = FontFace::load(&config.font_path, config.font_size)
        .map_err(|e| format!("Failed to load font: {}", e))?;
    info!("  Loaded font '{}'", font.name());

    let store = ContentStore::open(&config.storage_root)
        .await
        .map_err(|e| format!("Failed to open image store: {}", e))?;

    Ok(ImagePipeline::new(
        Renderer::new(Arc::new(font)),
        Arc::new(store),
        &config.base_url,
    ))
}

/// Build the configured platform clients, registering the Telegram webhook
/// if requested.
async fn build_platforms(config: &ServeConfig) -> Result<Platforms, String> {
    let mut platforms = Platforms::new();
    let timeout = config.request_timeout();

    if let (true, Some(secret), Some(token)) = (
        config.line_enabled(),
        config.line_channel_secret.as_deref(),
        config.line_channel_access_token.as_deref(),
    ) {
        let line = LinePlatform::new(secret, token, timeout)
            .map_err(|e| format!("Failed to create LINE client: {}", e))?
            .with_api_base(&config.line_api_base);
        info!("  LINE: enabled ({})", line.api_base());
        platforms = platforms.with_line(Arc::new(line));
    }

    if let (true, Some(token)) = (config.telegram_enabled(), config.telegram_bot_token.as_deref()) {
        let telegram = TelegramPlatform::new(token, config.telegram_secret_token.clone(), timeout)
            .map_err(|e| format!("Failed to create Telegram client: {}", e))?
            .with_api_base(&config.telegram_api_base);

        if config.telegram_secret_token.as_deref().unwrap_or("").is_empty() {
            warn!("  Telegram: no secret token set; webhook deliveries are not authenticated");
        }

        if config.telegram_register_webhook {
            telegram
                .register_webhook(&config.telegram_webhook_url())
                .await
                .map_err(|e| format!("Failed to register Telegram webhook: {}", e))?;
        }

        info!("  Telegram: enabled");
        platforms = platforms.with_telegram(Arc::new(telegram));
    }

    Ok(platforms)
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "textshot=debug,tower_http=debug"
    } else {
        "textshot=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// =============================================================================
// Render Command
// =============================================================================

async fn run_render(config: RenderConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let pipeline = match build_pipeline(&config.image).await {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let image = match pipeline.generate(&config.text).await {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match config.format {
        RenderOutputFormat::Text => {
            println!("{}", image.url);
        }
        RenderOutputFormat::Json => {
            let path = pipeline.store().path_for(&image.digest);
            let json = serde_json::json!({
                "url": image.url,
                "digest": image.digest.as_str(),
                "cache_hit": image.cache_hit,
                "path": path.display().to_string(),
            });
            match serde_json::to_string_pretty(&json) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    ExitCode::SUCCESS
}
