//! RestStack Server - a JSON REST API over pluggable document storage.
//!
//! Every URL has the shape `/{resource}/{id}`; resources are created on first
//! write and persisted in the backend selected by `CONNECTION_STRING`.
//!
//! # Usage
//!
//! ```text
//! GATEWAY_LISTEN=0.0.0.0:3000 CONNECTION_STRING=dir:./data reststack-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:3000` | Bind address |
//! | `BASE_PATH` | *(empty)* | URL prefix in front of every resource |
//! | `RESOURCES` | *(empty = any)* | Comma-separated resource allow-list |
//! | `STRIP_NULLS` | `false` | Drop `null` fields from responses |
//! | `ALLOW_DELETE_COLLECTION` | `false` | Enable DELETE on a whole collection |
//! | `ETAGS` | `false` | Enable ETag / conditional requests |
//! | `CONNECTION_STRING` | `memory` | `memory`, `file:<path>`, `dir:<path>`, `postgres://…` |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod gateway;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use reststack_core::broadcast::ChannelBroadcaster;
use reststack_core::config::RestConfig;
use reststack_core::handler::RestStackHandler;
use reststack_core::provider::RestStackProvider;
use reststack_core::storage::Backend;
use reststack_http::service::{RestHttpConfig, RestHttpService};

use crate::gateway::GatewayService;

/// Server version reported in health check responses.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default bind address.
const DEFAULT_LISTEN: &str = "0.0.0.0:3000";

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Build the [`RestHttpConfig`] from the engine [`RestConfig`].
fn build_http_config(config: &RestConfig) -> RestHttpConfig {
    RestHttpConfig {
        base_path: config.base_path.clone(),
    }
}

/// Log every mutation event until the channel closes.
///
/// Stands in for a push transport: anything that wants live updates
/// subscribes the same way.
fn spawn_event_log(broadcaster: &ChannelBroadcaster) {
    let mut events = broadcaster.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => debug!(
                    resource = %event.resource,
                    action = ?event.action,
                    "broadcast",
                ),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "broadcast subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve(listener: TcpListener, service: GatewayService<RestStackHandler>) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    // Wait for in-flight requests to complete.
    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Perform a health check by connecting to the server and requesting the health endpoint.
///
/// Exits with code 0 if the response is 200 OK and reports the server as running,
/// 1 otherwise.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request =
        format!("GET /_reststack/health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.contains("200 OK") && response.contains("\"running\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

/// Read the listen address from the environment.
fn listen_addr() -> String {
    std::env::var("GATEWAY_LISTEN").unwrap_or_else(|_| DEFAULT_LISTEN.to_string())
}

/// Read the log level from the environment.
fn log_level() -> String {
    std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let listen_addr = listen_addr();

    // Handle --health-check flag for Docker HEALTHCHECK.
    if std::env::args().any(|a| a == "--health-check") {
        let addr = listen_addr.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    let log = log_level();
    init_tracing(&log)?;

    let config = RestConfig::from_env();
    config.validate().context("invalid configuration")?;

    let backend = Backend::parse(&config.connection_string)?;
    info!(
        backend = backend.name(),
        base_path = %config.base_path,
        resources = ?config.resources,
        strip_nulls = config.strip_nulls,
        allow_delete_collection = config.allow_delete_collection,
        etags = config.etags,
        "initializing storage",
    );
    let queries = backend
        .open()
        .await
        .with_context(|| format!("failed to open {} storage", backend.name()))?;

    let broadcaster = ChannelBroadcaster::default();
    spawn_event_log(&broadcaster);

    let http_config = build_http_config(&config);
    let provider = RestStackProvider::new(config, queries).with_broadcaster(Arc::new(broadcaster));
    let handler = RestStackHandler::new(Arc::new(provider));
    let rest = RestHttpService::new(Arc::new(handler), http_config);
    let gateway = GatewayService::new(rest, backend.name());

    let addr: SocketAddr = listen_addr
        .parse()
        .with_context(|| format!("invalid bind address: {listen_addr}"))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, version = VERSION, "starting RestStack Server");

    serve(listener, gateway).await
}
