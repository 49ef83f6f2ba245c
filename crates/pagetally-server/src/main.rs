use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use pagetally_core::config::{AuthMode, Config};
use pagetally_server::state::AppState;

/// `pagetally health`: liveness probe for Docker HEALTHCHECK.
///
/// Calls `GET http://localhost:$PAGETALLY_PORT/health`.
/// Exits 0 if the server responds with HTTP 200, exits 1 otherwise.
fn run_health_check() -> ! {
    let port = std::env::var("PAGETALLY_PORT").unwrap_or_else(|_| "3000".to_string());
    let url = format!("http://localhost:{}/health", port);
    match ureq::get(&url).call() {
        Ok(resp) if resp.status() == 200 => std::process::exit(0),
        _ => std::process::exit(1),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("health") {
        run_health_check();
    }

    // Structured JSON logging. Level controlled via RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pagetally=info".parse()?),
        )
        .json()
        .init();

    let cfg = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    match &cfg.auth_mode {
        AuthMode::Password(_) => info!("Admin API protected by PAGETALLY_ADMIN_PASSWORD"),
        AuthMode::None => info!("Auth disabled (PAGETALLY_ADMIN_PASSWORD unset), /api routes open"),
    }

    let port = cfg.port;
    let state = Arc::new(AppState::from_config(cfg).await?);
    let app = pagetally_server::app::build_app(Arc::clone(&state));

    let addr = format!("0.0.0.0:{}", port);
    info!(port, storage = %state.store.dialect(), "pagetally listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        tokio::signal::ctrl_c().await.ok();
    })
    .await?;

    Ok(())
}
