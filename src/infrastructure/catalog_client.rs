//! REST client for the catalog, customer and order APIs.
//!
//! Every call is authenticated with the session's bearer token. Calls are
//! never retried; the caller decides how a failure degrades the page.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::domain::errors::DomainError;
use crate::domain::order::{OrderSubmission, SubmittedOrder};
use crate::domain::ports::{CatalogLookup, CredentialSource, CustomerDirectory, OrderSubmitter};
use crate::domain::product::{Address, Customer, Product, ProductId};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Normalise the API base URL:
/// - ensure a scheme is present (https, or http for localhost)
/// - strip trailing slashes
/// - strip a trailing `/api` segment
pub fn normalize_base_url(url: &str) -> String {
    let mut url = url.trim().to_string();

    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    while url.ends_with('/') {
        url.pop();
    }
    if url.ends_with("/api") {
        url.truncate(url.len() - 4);
    }
    while url.ends_with('/') {
        url.pop();
    }

    url
}

fn transport_error(url: &str, err: &reqwest::Error) -> DomainError {
    let message = if err.is_connect() {
        format!("Cannot reach catalog at {url}")
    } else if err.is_timeout() {
        format!("Request to {url} timed out")
    } else if err.is_decode() {
        format!("Unexpected response body from {url}: {err}")
    } else {
        format!("Network error communicating with {url}: {err}")
    };
    DomainError::Transport(message)
}

fn status_error(status: StatusCode, body: String) -> DomainError {
    match status.as_u16() {
        401 | 403 => DomainError::Unauthorized,
        404 => DomainError::NotFound,
        400 | 422 => DomainError::InvalidInput(if body.is_empty() {
            format!("Request rejected (HTTP {status})")
        } else {
            body
        }),
        s if s >= 500 => DomainError::Transport(format!("Catalog server error (HTTP {s})")),
        s => DomainError::Transport(format!("Unexpected response from catalog (HTTP {s})")),
    }
}

pub struct HttpCatalogClient {
    base_url: Url,
    client: Client,
    credentials: Arc<dyn CredentialSource>,
}

impl HttpCatalogClient {
    pub fn new(
        base_url: &str,
        credentials: Arc<dyn CredentialSource>,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let normalized = normalize_base_url(base_url);
        let base_url = Url::parse(&normalized)
            .map_err(|e| DomainError::InvalidInput(format!("Invalid catalog URL {normalized}: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Internal(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            base_url,
            client,
            credentials,
        })
    }

    /// `segments` are appended under `/api`, each percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, DomainError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DomainError::InvalidInput(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, DomainError> {
        let token = self.credentials.bearer_token().ok_or(DomainError::Unauthorized)?;
        let request = request
            .bearer_auth(token)
            .build()
            .map_err(|e| DomainError::InvalidInput(format!("Invalid request: {e}")))?;
        let url = request.url().to_string();

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| transport_error(&url, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("{url} answered HTTP {status}");
            return Err(status_error(status, body));
        }
        response.json().await.map_err(|e| transport_error(&url, &e))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, Option<&str>)],
    ) -> Result<T, DomainError> {
        let query: Vec<(&str, &str)> = query
            .iter()
            .filter_map(|(key, value)| value.map(|v| (*key, v)))
            .collect();
        let request = self.client.get(self.url(segments)?).query(&query);
        self.send(request).await
    }
}

#[async_trait]
impl CatalogLookup for HttpCatalogClient {
    async fn list_brands(&self) -> Result<Vec<String>, DomainError> {
        self.get(&["brands"], &[]).await
    }

    async fn list_categories(&self, brand: Option<&str>) -> Result<Vec<String>, DomainError> {
        self.get(&["categories"], &[("brand", brand)]).await
    }

    async fn list_products(
        &self,
        brand: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<Product>, DomainError> {
        self.get(&["products"], &[("brand", brand), ("category", category)])
            .await
    }

    async fn find_product(&self, id: &ProductId) -> Result<Product, DomainError> {
        self.get(&["products", id.as_str()], &[]).await
    }

    async fn search_by_barcode(
        &self,
        barcode: &str,
        brand: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<Product>, DomainError> {
        self.get(
            &["products", "search"],
            &[
                ("barcode", Some(barcode.trim())),
                ("brand", brand),
                ("category", category),
            ],
        )
        .await
    }
}

#[async_trait]
impl CustomerDirectory for HttpCatalogClient {
    async fn list_customers(&self) -> Result<Vec<Customer>, DomainError> {
        self.get(&["customers"], &[]).await
    }

    async fn list_addresses(&self, customer_id: i64) -> Result<Vec<Address>, DomainError> {
        let customer_id = customer_id.to_string();
        self.get(&["customers", customer_id.as_str(), "addresses"], &[])
            .await
    }
}

#[async_trait]
impl OrderSubmitter for HttpCatalogClient {
    async fn submit(&self, order: OrderSubmission) -> Result<SubmittedOrder, DomainError> {
        let request = self.client.post(self.url(&["orders"])?).json(&order);
        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::credentials::SessionCredential;

    fn client(base: &str) -> HttpCatalogClient {
        HttpCatalogClient::new(
            base,
            Arc::new(SessionCredential::new(Some("t".to_string()))),
            DEFAULT_TIMEOUT,
        )
        .unwrap()
    }

    #[test]
    fn normalizes_base_url() {
        assert_eq!(normalize_base_url("localhost:8080/"), "http://localhost:8080");
        assert_eq!(normalize_base_url("shop.example.com/api/"), "https://shop.example.com");
        assert_eq!(normalize_base_url(" http://10.0.0.5/api "), "http://10.0.0.5");
    }

    #[test]
    fn builds_encoded_api_urls() {
        let client = client("http://localhost:8080/");
        assert_eq!(
            client.url(&["products", "a b"]).unwrap().as_str(),
            "http://localhost:8080/api/products/a%20b"
        );
        assert_eq!(
            client.url(&["customers", "4", "addresses"]).unwrap().as_str(),
            "http://localhost:8080/api/customers/4/addresses"
        );
    }

    #[test]
    fn maps_status_codes() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, String::new()),
            DomainError::Unauthorized
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, String::new()),
            DomainError::Unauthorized
        ));
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, String::new()),
            DomainError::NotFound
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, "no address".to_string()),
            DomainError::InvalidInput(msg) if msg == "no address"
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, String::new()),
            DomainError::Transport(_)
        ));
    }

    #[tokio::test]
    async fn missing_token_short_circuits() {
        let client = HttpCatalogClient::new(
            "http://127.0.0.1:9",
            Arc::new(SessionCredential::default()),
            DEFAULT_TIMEOUT,
        )
        .unwrap();
        assert!(matches!(client.list_brands().await, Err(DomainError::Unauthorized)));
    }
}
