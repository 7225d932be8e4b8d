use actix_web::dev::Server;
use actix_web::{http, web, App, HttpServer};
use actix_cors::Cors;
use std::net::TcpListener;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

pub mod cache;
pub mod config;
mod handlers;
pub mod models;
mod routes;
pub mod scoring;
pub mod services;
pub mod upstream;

use crate::cache::CacheService;
use crate::routes::init_routes;
use crate::services::{BroadcastService, LiveScoreService};

pub fn run(
    listener: TcpListener,
    cache: CacheService,
    scores: LiveScoreService,
    broadcaster: BroadcastService,
    redis_client: Option<Arc<redis::Client>>,
) -> Result<Server, std::io::Error> {
    // Wrap using web::Data, which boils down to an Arc smart pointer
    let cache_data = web::Data::new(cache);
    let scores_data = web::Data::new(scores);
    let broadcaster_data = web::Data::new(broadcaster);
    let redis_client_data = redis_client.map(web::Data::new);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin("http://localhost:3000")
            .allowed_origin("http://localhost:5173")
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec![
                http::header::ACCEPT,
                http::header::CONTENT_TYPE,
                http::header::UPGRADE,
                http::header::CONNECTION,
            ])
            .max_age(3600);

        let mut app = App::new()
            .wrap(TracingLogger::default())
            .wrap(cors)
            // Get a pointer copy and attach it to the application state
            .app_data(cache_data.clone())
            .app_data(scores_data.clone())
            .app_data(broadcaster_data.clone());
        if let Some(redis) = &redis_client_data {
            app = app.app_data(redis.clone());
        }

        app.configure(init_routes)
    })
    .listen(listener)?
    .run();

    Ok(server)
}
