//! # Voice Recorder Backend
//!
//! Receives short audio recordings from the browser recorder page and keeps
//! each one as a uniquely named `.webm` file.
//!
//! ## Routes:
//! - `POST /upload`: store one recording (multipart field `audio-file`)
//! - `GET /recordings`: list stored recordings, newest first
//! - `POST /run-sim`: run the external simulation program
//! - `GET /health`, `GET /api/v1/health`, `GET /api/v1/metrics`: operations
//! - everything else: the static client bundle from the public directory
//!
//! ## Modules:
//! - **config**: settings from defaults, `config.toml` and the environment
//! - **recordings**: naming, validation and storage of recordings
//! - **handlers**: HTTP endpoints
//! - **state**: shared state (store handle, upload policy, metrics)
//! - **middleware**: request logging and metrics
//! - **error**: error types and their HTTP responses

mod config;
mod error;
mod handlers;
mod health;
mod middleware;
mod recordings;
mod state;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Result;
use crate::config::AppConfig;
use crate::state::AppState;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    init_tracing();

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let app_state = AppState::new(config.clone());
    let bind_addr = config.bind_addr();

    // The store creates the directory again on demand, so a failure here only
    // means uploads report storage errors until it is fixed.
    match app_state.store.ensure_dir().await {
        Ok(()) => info!(path = %app_state.store.dir().display(), "Recordings will be saved to this directory"),
        Err(err) => warn!(error = %err, "Recordings directory is not available yet"),
    }

    let public_dir = config.assets.public_dir.clone();
    if !public_dir.is_dir() {
        warn!(path = %public_dir.display(), "Public directory not found, static assets are disabled");
    }

    info!("Starting HTTP server on http://{}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        let mut app = App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(middleware::MetricsMiddleware)
            .wrap(middleware::RequestLogging)
            .configure(handlers::configure_routes);

        // Registered last: it answers every path the API did not claim.
        if public_dir.is_dir() {
            app = app.service(actix_files::Files::new("/", &public_dir).index_file("index.html"));
        }

        app
    })
    .disable_signals()
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Err(e)) => error!("Server error: {}", e),
                Err(e) => error!("Server task error: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// `RUST_LOG` controls filtering; defaults to debug output for this crate.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voice_recorder_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
