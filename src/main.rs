//! spinstats - a self-hosted listening stats server
//!
//! Serves a user's scrobbled top tracks, enriched with catalog artwork and
//! page links, out of a lazily refreshed local cache file.

mod api;
mod config;
mod core;
mod models;
mod plugins;
mod utils;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use crate::api::AppState;
use crate::config::Config;
use crate::core::{SyncEngine, TrackCache};

/// spinstats - self-hosted listening stats
#[derive(Parser, Debug)]
#[command(name = "spinstats")]
#[command(version = "0.1.0")]
#[command(about = "A self-hosted listening stats server for your scrobbled music")]
struct Args {
    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Run one cache sync and exit
    #[arg(long)]
    sync: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::new(log_level);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("spinstats v0.1.0 starting...");

    // fill the environment from .env before reading it
    config::load_env_file();
    let config = Config::from_env();

    // one-shot sync mode: refresh the cache file and exit
    if args.sync {
        let engine = SyncEngine::from_config(&config);
        engine.sync().await?;
        return Ok(());
    }

    start_server(args.host, args.port, config).await
}

async fn start_server(host: String, port: u16, config: Config) -> Result<()> {
    use actix_cors::Cors;
    use actix_web::{middleware, web, App, HttpServer};

    let state = web::Data::new(AppState {
        cache: TrackCache::from_config(&config),
        engine: SyncEngine::from_config(&config),
    });

    info!("Cache file: {}", config.cache_file.display());
    info!(
        "Freshness threshold: {}s{}",
        config.cache_timeout,
        if config.cache_timeout == 0 {
            " (refresh on every read)"
        } else {
            ""
        }
    );

    let addr = format!("{}:{}", host, port);
    info!("Server listening on http://{}", addr);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(api::configure)
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}
