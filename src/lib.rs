pub mod application;
pub mod config;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};

use handlers::catalog::{self as catalog_handlers, StubState};
use infrastructure::stub_catalog::StubCatalog;

pub use application::order_builder::{BuilderPorts, BuilderSettings, OrderBuilder};
pub use config::BuilderConfig;
pub use domain::errors::DomainError;

/// Routes of the stub catalog API, mounted under `/api`.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/brands", web::get().to(catalog_handlers::list_brands))
            .route("/categories", web::get().to(catalog_handlers::list_categories))
            .route("/products", web::get().to(catalog_handlers::list_products))
            .route("/products/search", web::get().to(catalog_handlers::search_products))
            .route("/products/{id}", web::get().to(catalog_handlers::get_product))
            .route("/customers", web::get().to(catalog_handlers::list_customers))
            .route(
                "/customers/{id}/addresses",
                web::get().to(catalog_handlers::list_addresses),
            )
            .route("/orders", web::post().to(catalog_handlers::create_order)),
    );
}

/// Build and return an actix-web `Server` serving `catalog` on `host:port`.
/// Every request must carry `token` as its bearer token.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    catalog: Arc<StubCatalog>,
    token: String,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let state = web::Data::new(StubState { catalog, token });
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(routes)
    })
    .bind((host.to_string(), port))?
    .run())
}
