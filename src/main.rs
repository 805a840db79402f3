//! Vitalboard
//!
//! Main entry point for the Vitalboard monitoring backend.

use std::sync::Arc;

use actix::Actor;
use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use vitalboard::{api, config, db, telemetry, websocket, AppState};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = config::load_config().context("failed to load configuration")?;

    let database = db::Database::connect(&config.database.url)
        .await
        .context("failed to connect to database")?;
    database
        .run_migrations()
        .await
        .context("failed to run database migrations")?;
    if config.database.seed_demo {
        db::seed::seed_demo_data(&database).await?;
    }

    let broadcaster = websocket::Broadcaster::default().start();

    let ingestor = telemetry::Ingestor::new(database.clone(), Arc::new(broadcaster.clone()));
    tokio::spawn(telemetry::broker::run(config.telemetry.clone(), ingestor));

    let state = web::Data::new(AppState {
        db: database,
        broadcaster,
        config: config.clone(),
    });

    info!("listening on {}:{}", config.server.host, config.server.port);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(TracingLogger::default())
            // The dashboard frontend is served from another origin.
            .wrap(Cors::permissive())
            .configure(api::configure)
            .route("/ws", web::get().to(websocket::ws_route))
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await?;
    Ok(())
}
