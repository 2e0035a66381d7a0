use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use error::AppError;
use mimalloc::MiMalloc;
use thumbcache_engine::{
    CacheConfig, CacheCoordinator, FetcherConfig, HttpFetcher, ImageResizer, TieredStore,
};
use tokio::net::TcpListener;
use tracing::{Level, error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

mod cli;
mod error;
mod routes;
mod utils;

use cli::CliArgs;
use routes::AppState;
use utils::{format_bytes, parse_headers, parse_size};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    let args = CliArgs::parse();

    init_logging(args.verbose, args.quiet)?;

    info!("Thumbcache - resized JPEG thumbnails of remote images");
    info!("==================================================================");

    let memory_cache_size = parse_size(&args.memory_cache_size)?;

    let mut fetcher_builder = FetcherConfig::builder()
        .with_timeout(Duration::from_secs(args.timeout))
        .with_connect_timeout(Duration::from_secs(args.connect_timeout))
        .with_max_redirects(args.max_redirects)
        .with_headers(parse_headers(&args.headers)?)
        .with_system_proxy(!args.no_proxy);
    if let Some(user_agent) = &args.user_agent {
        fetcher_builder = fetcher_builder.with_user_agent(user_agent.clone());
    }
    let fetcher_config = fetcher_builder.build();

    info!(
        "HTTP fetch configuration: overall={}s, connect={}s, max_redirects={}",
        args.timeout, args.connect_timeout, args.max_redirects
    );
    if args.no_proxy {
        info!("System proxy settings are ignored");
    }

    let mut cache_config = CacheConfig {
        max_memory_cache_size: memory_cache_size,
        jpeg_quality: args.jpeg_quality,
        ..CacheConfig::default()
    };
    if let Some(dir) = args.cache_dir {
        cache_config.cache_dir = dir;
    }

    let store = TieredStore::new(&cache_config).await.map_err(|e| {
        AppError::Initialization(format!(
            "cannot prepare cache directory {}: {e}",
            cache_config.cache_dir.display()
        ))
    })?;

    info!("Cache directory: {}", store.file_store().root().display());
    if store.has_memory_tier() {
        info!("Memory cache tier: {}", format_bytes(memory_cache_size));
    } else {
        info!("Memory cache tier disabled");
    }
    info!("Thumbnail JPEG quality: {}", cache_config.jpeg_quality);

    let fetcher = HttpFetcher::new(&fetcher_config)?;
    let resizer = ImageResizer::new(cache_config.jpeg_quality);
    let coordinator = CacheCoordinator::new(Arc::new(store), Arc::new(fetcher), Arc::new(resizer));

    let app = routes::router(AppState { coordinator });

    let listener = TcpListener::bind((args.host.as_str(), args.port))
        .await
        .map_err(|e| {
            AppError::Initialization(format!("cannot bind {}:{}: {e}", args.host, args.port))
        })?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) -> Result<(), AppError> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(verbose).with_ansi(true))
        .with(filter)
        .try_init()
        .map_err(|e| AppError::Initialization(e.to_string()))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, finishing in-flight requests");
}
