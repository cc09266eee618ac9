//! Process entry point: configuration, logging, pool, dispatcher, server,
//! and the shutdown sequence.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tunedeck::auth::TokenCodec;
use tunedeck::config::{AppConfig, LogConfig};
use tunedeck::db::MySqlFactory;
use tunedeck::dispatcher::Dispatcher;
use tunedeck::handlers::{self, AppState};
use tunedeck::pool::Pool;
use tunedeck::runtime_config::RuntimeConfig;
use tunedeck::server::HttpServer;

#[derive(Parser)]
#[command(name = "tunedeck", version, about = "Music playback backend server")]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, env = "TUNEDECK_CONFIG", default_value = "config.json")]
    config: PathBuf,
    /// Override the configured bind port
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(&cli.config)?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let _log_guard = init_logging(&config.log)?;

    RuntimeConfig::from_env().apply(config.server.threads);

    let factory = MySqlFactory::from_config(&config.database);
    let pool = Arc::new(Pool::new(factory, config.database.pool_size));

    let state = Arc::new(AppState {
        pool: Arc::clone(&pool),
        tokens: TokenCodec::new(&config.auth),
        acquire_timeout: config.database.acquire_timeout(),
    });
    let mut dispatcher = Dispatcher::new();
    handlers::register_all(&mut dispatcher, state);

    let routes = dispatcher.route_count();
    let handle = HttpServer::new(Arc::new(dispatcher))
        .start(config.bind_addr())
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;
    info!(
        addr = %handle.local_addr(),
        routes = routes,
        workers = config.server.threads,
        pool_capacity = config.database.pool_size,
        "tunedeck started"
    );

    wait_for_shutdown()?;

    handle.stop();
    pool.shutdown();
    info!("tunedeck stopped");
    Ok(())
}

/// Initialize the tracing subscriber; returns the appender guard that must
/// stay alive for file logging to flush.
fn init_logging(log: &LogConfig) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));

    match &log.path {
        Some(path) => {
            let path = Path::new(path);
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            let file_name = path
                .file_name()
                .context("log path has no file name")?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            Ok(None)
        }
    }
}

/// Block until SIGINT or SIGTERM arrives. The signal-watcher thread only
/// observes the signal; the actual teardown runs on the main thread
/// afterwards.
#[cfg(unix)]
fn wait_for_shutdown() -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    if let Some(signal) = signals.forever().next() {
        info!(signal = signal, "Shutdown signal received");
    }
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown() -> anyhow::Result<()> {
    loop {
        std::thread::park();
    }
}
