use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::Request;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use server::auth::RevocationStore;
use server::database::{self, SqliteRevocationStore};
use server::handlers::http::build_router;
use server::tower_middle::TimeoutLayer;
use server::{AppState, spawn_revocation_sweep};
use shared::config::load_config;

#[derive(Parser, Debug)]
#[command(version, about = "Bearer-token auth server")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "AUTH_CONFIG", default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("Invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let pool = database::connect(&config.database)
        .await
        .context("Failed to open database")?;
    database::migrate(&pool)
        .await
        .context("Failed to create schema")?;

    let addr: SocketAddr = config
        .server
        .addr()
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.addr()))?;
    let timeout = Duration::from_secs(config.server.request_timeout_secs);
    let sweep_every = Duration::from_secs(config.auth.revocation_sweep_secs);

    let store: Arc<dyn RevocationStore> = Arc::new(SqliteRevocationStore::new(pool.clone()));
    let state = AppState::with_store(config, pool, store.clone())?;
    let router = Arc::new(build_router());

    let sweep = spawn_revocation_sweep(store, sweep_every);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    continue;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        };

        let io = TokioIo::new(stream);
        let router = Arc::clone(&router);
        let state = state.clone();

        let svc = ServiceBuilder::new()
            .layer(TimeoutLayer::new(timeout))
            .service(tower::service_fn(move |req: Request<Incoming>| {
                let router = Arc::clone(&router);
                let state = state.clone();
                async move { Ok::<_, Infallible>(router.route(req, state).await) }
            }));

        tokio::task::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .timer(TokioTimer::new())
                .serve_connection(io, TowerToHyperService::new(svc))
                .await
            {
                error!("Error serving connection from {}: {:?}", peer, err);
            }
        });
    }

    if let Some(handle) = sweep {
        handle.abort();
    }
    info!("Server stopped");

    Ok(())
}
