use actix_web::{web, HttpServer};
use error_stack::{Result, ResultExt};
use thiserror::Error;
use tracing::info;
use tracing_actix_web::TracingLogger;

use crate::{config, http::controllers, App};

#[derive(Debug, Error)]
#[error("Could not start HTTP server")]
pub struct StartServerError;

/// Serves the posts API until the server is told to shut down.
///
/// This has to run inside an actix [`System`](actix_web::rt::System).
#[tracing::instrument(skip_all, name = "server.run")]
pub async fn run(config: config::Server) -> Result<(), StartServerError> {
    info!(?config, "Starting HTTP server...");

    let workers = config.workers.get();
    let address = (config.address, config.port);
    let app = web::Data::new(App::new(config).await.change_context(StartServerError)?);

    let server = HttpServer::new(move || {
        actix_web::App::new()
            .wrap(TracingLogger::default())
            .app_data(app.clone())
            .configure(controllers::configure)
    })
    .workers(workers)
    .bind(address)
    .change_context(StartServerError)
    .attach_printable("could not bind server with address and port")?;

    for addr in server.addrs() {
        info!("HTTP server is listening at http://{addr} with {workers} workers");
    }

    server
        .run()
        .await
        .change_context(StartServerError)
        .attach_printable("could not serve HTTP service")?;

    info!("HTTP server has shut down");
    Ok(())
}
