use actix_web::{web, App, HttpServer};
use actix_web::dev::Server;
use tracing_actix_web::TracingLogger;
use std::net::TcpListener;
use std::sync::Arc;

pub mod auth;
pub mod config;
pub mod db;
mod handlers;
pub mod invitations;
pub mod middleware;
pub mod models;
pub mod notifications;
mod routes;
pub mod telemetry;

use crate::config::jwt::JwtSettings;
use crate::invitations::InvitationLifecycle;
use crate::routes::init_routes;
use crate::telemetry::RedactedRootSpan;

pub fn run(
    listener: TcpListener,
    lifecycle: Arc<InvitationLifecycle>,
    jwt_settings: JwtSettings,
) -> Result<Server, std::io::Error> {
    // web::Data is an Arc under the hood; reuse the one we were given
    let lifecycle = web::Data::from(lifecycle);
    let jwt_settings = web::Data::new(jwt_settings);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::<RedactedRootSpan>::new())
            .app_data(lifecycle.clone())
            .app_data(jwt_settings.clone())
            .configure(init_routes)
    })
    .listen(listener)?
    .run();

    Ok(server)
}
