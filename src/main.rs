#![forbid(unsafe_code)]

mod config;
mod options;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use futures_util::FutureExt;
use searchgate_handler::handler::{self, HandlerConfig};
use structopt::StructOpt;
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use warp::Filter;

use config::{Config, CorsConfig};
use options::Options;

// Use Jemalloc only for musl-64 bits platforms
#[cfg(all(target_env = "musl", target_pointer_width = "64"))]
#[global_allocator]
static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn create_cors(cors_config: CorsConfig) -> warp::cors::Builder {
    let origins = cors_config.allow_origins.unwrap_or_default();
    let headers = cors_config.allow_headers.unwrap_or_default();
    let methods = cors_config.allow_methods.unwrap_or_default();

    let cors = warp::cors()
        .allow_headers(headers.iter().map(String::as_str))
        .allow_methods(methods.iter().map(String::as_str))
        .allow_credentials(cors_config.allow_credentials.unwrap_or(false));

    if let Some(true) = cors_config.allow_any_origin {
        cors.allow_any_origin()
    } else {
        cors.allow_origins(origins.iter().map(String::as_str))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let options: Options = Options::from_args();
    init_tracing();

    let mut config = toml::from_str::<Config>(
        &std::fs::read_to_string(&options.config)
            .with_context(|| format!("Failed to load config file '{}'.", options.config))?,
    )
    .with_context(|| format!("Failed to parse config file '{}'.", options.config))?;
    if let Some(bind) = options.bind {
        config.bind = bind;
    }

    let transport = config
        .create_transport()
        .context("Failed to create upstream transport.")?;
    tracing::info!(
        upstream = %config.upstream.url,
        timeout = config.upstream.timeout,
        payload = ?config.payload,
        "Upstream configured."
    );

    let handler_config = HandlerConfig::new(transport)
        .options(config.issue_options())
        .payload_shape(config.payload);

    let search = warp::path::end().and(handler::search_websocket(handler_config));
    let health = warp::path!("health").map(|| warp::reply::json(&"healthy"));

    let bind_addr: SocketAddr = config
        .bind
        .parse()
        .context(format!("Failed to parse bind addr '{}'", config.bind))?;
    if let Some(cors_config) = config.cors {
        let routes = search.or(health).with(create_cors(cors_config));
        let (addr, server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(bind_addr, signal::ctrl_c().map(|_| ()))
            .with_context(|| format!("Failed to bind '{}'.", bind_addr))?;
        tracing::info!(addr = %addr, "Listening");
        server.await;
    } else {
        let routes = search.or(health);
        let (addr, server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(bind_addr, signal::ctrl_c().map(|_| ()))
            .with_context(|| format!("Failed to bind '{}'.", bind_addr))?;
        tracing::info!(addr = %addr, "Listening");
        server.await;
    }
    tracing::info!("Server shutdown");

    Ok(())
}
