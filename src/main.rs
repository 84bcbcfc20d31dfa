//! Main entry point for the TruthLens backend.
//!
//! Loads configuration, installs structured logging, and serves the HTTP API
//! until the process receives Ctrl-C.

use actix_web::{App, HttpServer, middleware::Logger, web};
use anyhow::Context;
use dotenv::dotenv;
use tracing_actix_web::TracingLogger;
use truthlens_server::{
    AppState, Settings, configure_routes, get_subscriber, init_subscriber,
    telemetry::RequestLoggingMiddleware,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let subscriber = get_subscriber("truthlens".to_string(), "info".to_string(), std::io::stdout);
    init_subscriber(subscriber)?;

    let settings = Settings::from_env()?;
    let address = (settings.host.clone(), settings.port);
    let app_state = AppState::new(settings)?;

    tracing::info!(host = %address.0, port = address.1, "Starting server");

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(TracingLogger::default())
            .wrap(Logger::default())
            .wrap(RequestLoggingMiddleware::new())
            .configure(configure_routes)
    })
    .bind(address.clone())
    .with_context(|| format!("failed to bind {}:{}", address.0, address.1))?
    .run();

    let srv_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Shutdown signal received");
            srv_handle.stop(true).await;
        }
        res = server_task => {
            match res {
                Ok(Err(e)) => tracing::error!(error = %e, "Server stopped with an error"),
                Err(e) => tracing::error!(error = %e, "Server task failed"),
                Ok(Ok(())) => {}
            }
        }
    }

    Ok(())
}
