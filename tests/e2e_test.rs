//! End-to-end test: order builder → HTTP catalog client → stub catalog server.
//!
//! Starts the actix-web stub on a free local port and drives a full order
//! through `HttpCatalogClient`, so every call crosses the wire with its
//! bearer token.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use bigdecimal::BigDecimal;
use order_builder::application::draft_store::DraftStore;
use order_builder::application::order_builder::BarcodeResolution;
use order_builder::application::preview::LatestPreview;
use order_builder::domain::order::OrderProductLine;
use order_builder::infrastructure::catalog_client::HttpCatalogClient;
use order_builder::infrastructure::credentials::SessionCredential;
use order_builder::infrastructure::session_storage::MemorySessionStorage;
use order_builder::infrastructure::stub_catalog::StubCatalog;
use order_builder::{build_server, BuilderPorts, BuilderSettings, DomainError, OrderBuilder};
use reqwest::Client;

const TOKEN: &str = "e2e-token";

fn free_port() -> u16 {
    // Bind to port 0 to let the OS assign a free port, then release it.
    std::net::TcpListener::bind("127.0.0.1:0")
        .expect("bind failed")
        .local_addr()
        .expect("addr failed")
        .port()
}

/// Wait until `url` answers at all, retrying every `interval` for up to
/// `timeout` total. Panics if the service never comes up.
async fn wait_for_http(label: &str, url: &str, timeout: Duration, interval: Duration) {
    let client = Client::builder()
        .timeout(Duration::from_secs(3))
        .build()
        .unwrap();
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if tokio::time::Instant::now() > deadline {
            panic!("{} did not become ready within {:?}", label, timeout);
        }
        // Any HTTP response (even 401) means the server is up.
        if client.get(url).send().await.is_ok() {
            return;
        }
        tokio::time::sleep(interval).await;
    }
}

/// Starts the stub server and returns its base URL plus the catalog behind it.
async fn start_stub() -> (String, Arc<StubCatalog>) {
    let catalog = Arc::new(StubCatalog::sample());
    let port = free_port();
    let server = build_server(catalog.clone(), TOKEN.to_string(), "127.0.0.1", port)
        .expect("Failed to bind the stub catalog");
    tokio::spawn(server);

    let base_url = format!("http://127.0.0.1:{}", port);
    wait_for_http(
        "stub catalog",
        &format!("{}/api/brands", base_url),
        Duration::from_secs(10),
        Duration::from_millis(100),
    )
    .await;
    (base_url, catalog)
}

fn builder(base_url: &str, token: &str) -> (OrderBuilder, Arc<LatestPreview>, DraftStore) {
    let credentials = Arc::new(SessionCredential::new(Some(token.to_string())));
    let client = Arc::new(
        HttpCatalogClient::new(base_url, credentials, Duration::from_secs(5)).unwrap(),
    );
    let sink = Arc::new(LatestPreview::new());
    let drafts = DraftStore::new(Arc::new(MemorySessionStorage::new()));
    let builder = OrderBuilder::new(
        BuilderPorts {
            catalog: client.clone(),
            directory: client.clone(),
            submitter: client,
            drafts: drafts.clone(),
            sink: sink.clone(),
        },
        BuilderSettings {
            debounce: Duration::from_millis(50),
            ..BuilderSettings::default()
        },
    );
    (builder, sink, drafts)
}

#[tokio::test]
async fn builds_previews_and_submits_an_order_over_http() {
    let (base_url, catalog) = start_stub().await;
    let (mut builder, sink, drafts) = builder(&base_url, TOKEN);

    assert_eq!(builder.load_brands().await.unwrap(), ["Acme", "Globex"]);
    assert_eq!(builder.load_customers().await.unwrap().len(), 2);
    let addresses = builder.select_customer(1).await.unwrap();
    assert_eq!(addresses.len(), 2);
    builder.select_address(10).unwrap();

    let locked = builder
        .add_detailed_row_by_barcode("6221003", None, None, 1)
        .await
        .unwrap();
    assert!(matches!(locked, BarcodeResolution::Locked(_)));
    let ambiguous = builder
        .add_detailed_row_by_barcode("7000001", None, None, 1)
        .await
        .unwrap();
    assert!(matches!(ambiguous, BarcodeResolution::Ambiguous(ref m) if m.len() == 2));

    let combined = builder
        .add_combined_row(Some("Acme".to_string()), Some("Soap".to_string()))
        .await
        .unwrap();
    builder.set_combined_quantity(combined, 2).await.unwrap();
    assert_eq!(builder.formatted_totals(), "5 items, EGP 45.00");

    builder.flush_preview().await;
    let preview = sink.latest().expect("a preview should have been rendered");
    assert_eq!(preview.products.len(), 1);
    assert_eq!(preview.products[0].product_name, "Acme Shampoo");
    assert_eq!(preview.combined.len(), 1);
    assert_eq!(preview.totals.total_price, BigDecimal::from_str("45").unwrap());
    assert!(drafts.load().is_some());

    let submitted = builder.submit("ring twice").await.unwrap();

    let orders = catalog.submitted_orders();
    assert_eq!(orders.len(), 1);
    let (order_id, order) = &orders[0];
    assert_eq!(*order_id, submitted.order_id);
    assert_eq!(order.note, "ring twice");
    assert_eq!(
        order.products,
        vec![
            OrderProductLine {
                product_id: 3,
                quantity: 1
            },
            OrderProductLine {
                product_id: 1,
                quantity: 2
            },
            OrderProductLine {
                product_id: 2,
                quantity: 2
            },
        ]
    );
    assert!(builder.registry().is_empty());
    assert_eq!(drafts.load(), None);
}

#[tokio::test]
async fn wrong_token_is_unauthorized() {
    let (base_url, _catalog) = start_stub().await;
    let (mut builder, _sink, _drafts) = builder(&base_url, "not-the-token");

    assert!(matches!(
        builder.load_brands().await,
        Err(DomainError::Unauthorized)
    ));
    assert!(matches!(
        builder.add_combined_row(Some("Acme".to_string()), None).await,
        Err(DomainError::Unauthorized)
    ));
    assert!(builder.registry().is_empty());
}

#[tokio::test]
async fn unknown_product_is_not_found_over_http() {
    let (base_url, _catalog) = start_stub().await;
    let (mut builder, _sink, _drafts) = builder(&base_url, TOKEN);

    let err = builder
        .add_detailed_row_by_id(&"404".into(), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound));
    assert!(builder.registry().is_empty());
}
