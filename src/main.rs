use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use duocast::config::{self, ConfigStore};
use duocast::state::AppState;
use duocast::video::{V4l2Backend, XcapBackend};
use duocast::web;

/// Log level for the application
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Verbose,
    Debug,
    Trace,
}

/// duocast command line arguments
#[derive(Parser, Debug)]
#[command(name = "duocast")]
#[command(version, about = "Camera and screen streaming over MJPEG", long_about = None)]
struct CliArgs {
    /// JSON configuration file (defaults are used when missing)
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listen address (overrides config file)
    #[arg(short = 'a', long, value_name = "ADDRESS")]
    address: Option<String>,

    /// HTTP port (overrides config file)
    #[arg(short = 'p', long, value_name = "PORT")]
    port: Option<u16>,

    /// Log level (error, warn, info, verbose, debug, trace)
    #[arg(short = 'l', long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,

    /// Increase verbosity (-v for verbose, -vv for debug, -vvv for trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_level, args.verbose);

    tracing::info!("Starting duocast v{}", env!("CARGO_PKG_VERSION"));

    let config_store = ConfigStore::load(args.config.as_deref()).await?;

    // Apply CLI argument overrides to config (only if explicitly specified)
    let address = args.address;
    let port = args.port;
    if address.is_some() || port.is_some() {
        config_store.update(|config| {
            if let Some(addr) = address {
                config.web.bind_address = addr;
            }
            if let Some(port) = port {
                config.web.http_port = port;
            }
        })?;
    }
    let config = config_store.get();

    let bind_addr = resolve_bind_address(&config.web)?;
    tracing::info!("Server will listen on: http://{}", bind_addr);

    let camera_backend = Arc::new(V4l2Backend::new(config.camera.clone()));
    let screen_backend = Arc::new(XcapBackend);
    let state = AppState::new(config_store, camera_backend, screen_backend);
    if !config.screen.enabled {
        tracing::info!("Screen feed disabled until /start_screen");
    }

    let app = web::create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Starting HTTP server on {}", listener.local_addr()?);

    let shutdown_state = state.clone();
    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        // Producers end first so streaming bodies finish and the server can drain
        shutdown_state.shutdown.cancel();
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
    {
        tracing::error!("HTTP server error: {}", e);
    }

    cleanup(&state).await;
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initialize logging with tracing
fn init_logging(level: LogLevel, verbose_count: u8) {
    // Verbose count overrides log level
    let effective_level = match verbose_count {
        0 => level,
        1 => LogLevel::Verbose,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };

    let filter = match effective_level {
        LogLevel::Error => "duocast=error,tower_http=error",
        LogLevel::Warn => "duocast=warn,tower_http=warn",
        LogLevel::Info => "duocast=info,tower_http=info",
        LogLevel::Verbose => "duocast=debug,tower_http=info",
        LogLevel::Debug => "duocast=debug,tower_http=debug",
        LogLevel::Trace => "duocast=trace,tower_http=debug",
    };

    // Environment variable takes highest priority
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
    {
        eprintln!("failed to initialize tracing: {}", err);
    }
}

fn resolve_bind_address(web: &config::WebConfig) -> anyhow::Result<SocketAddr> {
    let ip: IpAddr = web
        .bind_address
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid bind address: {}", web.bind_address))?;
    Ok(SocketAddr::new(ip, web.http_port))
}

/// Release devices before exit
async fn cleanup(state: &Arc<AppState>) {
    let state = state.clone();
    match tokio::task::spawn_blocking(move || state.shutdown()).await {
        Ok(()) => tracing::info!("Camera released"),
        Err(e) => tracing::warn!("Failed to release camera: {}", e),
    }
}
