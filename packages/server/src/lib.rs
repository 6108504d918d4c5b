#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the address map application.
//!
//! Serves the REST API for submitting, listing and deleting addresses, a
//! `GeoJSON` feed of geocoded points, and the field frequency / distance
//! analysis. Entries live in the `DuckDB` file resolved by
//! [`address_map_database::paths::db_path`].

mod handlers;
pub mod interactive;

use std::sync::{Arc, Mutex};

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use address_map_database::Connection;
use address_map_geocoder::libpostal::LibpostalParser;
use address_map_geocoder::nominatim::NominatimGeocoder;
use address_map_geocoder::{AddressParser, Geocoder};

/// Shared application state.
pub struct AppState {
    /// `DuckDB` connection holding the stored entries.
    /// `duckdb::Connection` is `Send` but not `Sync`, so a `Mutex` is needed.
    pub db: Arc<Mutex<Connection>>,
    /// Geocoder for submitted and reference addresses.
    pub geocoder: Arc<dyn Geocoder>,
    /// Address parser for submitted addresses.
    pub parser: Arc<dyn AddressParser>,
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::QueryConfig::default().error_handler(handlers::bad_query))
            .app_data(web::JsonConfig::default().error_handler(handlers::bad_json))
            .route("/health", web::get().to(handlers::health))
            .route("/queries", web::get().to(handlers::list_queries))
            .route("/queries", web::post().to(handlers::submit_query))
            .route("/queries/{id}", web::delete().to(handlers::delete_query))
            .route("/points", web::get().to(handlers::points))
            .route("/analysis", web::get().to(handlers::analysis)),
    );
}

/// Starts the address map API server.
///
/// Opens the `DuckDB` database, builds the Nominatim and libpostal
/// clients from the embedded service registry, and starts the Actix-Web
/// HTTP server on `BIND_ADDR:PORT` (default `127.0.0.1:8080`). This is a
/// regular async function; the caller is responsible for providing the
/// async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the database cannot be opened, a
/// service client cannot be built, or the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    log::info!("Opening database...");
    let conn = address_map_database::open_default().map_err(std::io::Error::other)?;

    let geocoder = NominatimGeocoder::from_registry().map_err(std::io::Error::other)?;
    let parser = LibpostalParser::from_registry().map_err(std::io::Error::other)?;

    let state = web::Data::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        geocoder: Arc::new(geocoder),
        parser: Arc::new(parser),
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
