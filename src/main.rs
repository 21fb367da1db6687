use std::env;
use std::io;
use std::sync::Arc;

use dotenvy::dotenv;
use order_builder::application::draft_store::DraftStore;
use order_builder::application::preview::LatestPreview;
use order_builder::domain::pricing::format_price;
use order_builder::infrastructure::catalog_client::HttpCatalogClient;
use order_builder::infrastructure::credentials::SessionCredential;
use order_builder::infrastructure::session_storage::FileSessionStorage;
use order_builder::infrastructure::stub_catalog::StubCatalog;
use order_builder::{build_server, BuilderConfig, BuilderPorts, OrderBuilder};

const USAGE: &str = "usage: order_builder <serve-stub [fixture.json] | preview | clear>";

fn other(e: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e.to_string())
}

async fn serve_stub(config: &BuilderConfig, fixture: Option<String>) -> io::Result<()> {
    let catalog = match fixture {
        Some(path) => StubCatalog::from_fixture_file(path).map_err(other)?,
        None => StubCatalog::sample(),
    };
    let token = config.require_token().map_err(other)?.to_string();

    log::info!("Starting stub catalog at http://{}:{}", config.host, config.port);
    build_server(Arc::new(catalog), token, &config.host, config.port)?.await
}

fn drafts(config: &BuilderConfig) -> io::Result<DraftStore> {
    let storage = FileSessionStorage::new(&config.draft_dir, &config.session_id).map_err(other)?;
    Ok(DraftStore::new(Arc::new(storage)))
}

async fn preview(config: &BuilderConfig) -> io::Result<()> {
    let credentials = Arc::new(SessionCredential::new(config.catalog_token.clone()));
    let client = Arc::new(
        HttpCatalogClient::new(&config.catalog_url, credentials, config.http_timeout)
            .map_err(other)?,
    );
    let sink = Arc::new(LatestPreview::new());
    let mut builder = OrderBuilder::new(
        BuilderPorts {
            catalog: client.clone(),
            directory: client.clone(),
            submitter: client,
            drafts: drafts(config)?,
            sink: sink.clone(),
        },
        config.settings.clone(),
    );

    if builder.restore_draft().await.map_err(other)?.is_none() {
        println!("No draft saved for session {}", config.session_id);
        return Ok(());
    }
    builder.flush_preview().await;

    let Some(preview) = sink.latest() else {
        return Ok(());
    };
    for card in &preview.products {
        println!(
            "{:>4} x {} @ {} = {}",
            card.quantity,
            card.product_name,
            format_price(&card.unit_price),
            format_price(&card.line_total)
        );
    }
    for card in &preview.combined {
        println!(
            "{:>4} x [{} / {}] {} items = {}",
            card.quantity,
            card.brand.as_deref().unwrap_or("any brand"),
            card.category.as_deref().unwrap_or("any category"),
            card.total_items,
            format_price(&card.total_price)
        );
    }
    println!("Total: {}", builder.formatted_totals());
    Ok(())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = BuilderConfig::from_env().map_err(other)?;
    let mut args = env::args().skip(1);

    match args.next().as_deref() {
        Some("serve-stub") => serve_stub(&config, args.next()).await,
        Some("preview") => preview(&config).await,
        Some("clear") => {
            drafts(&config)?.clear().map_err(other)?;
            log::info!("Cleared draft for session {}", config.session_id);
            Ok(())
        }
        _ => Err(io::Error::new(io::ErrorKind::InvalidInput, USAGE)),
    }
}
