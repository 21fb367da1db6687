use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::Deserialize;

use crate::domain::errors::DomainError;
use crate::domain::order::{OrderSubmission, SubmittedOrder};
use crate::domain::ports::{CatalogLookup, CustomerDirectory, OrderSubmitter};
use crate::domain::product::{Address, Customer, Product, ProductId};

const FIRST_ORDER_ID: i64 = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct StubFixture {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub customers: Vec<Customer>,
    #[serde(default)]
    pub addresses: Vec<Address>,
}

/// In-memory catalog, customer directory and order sink.
///
/// Serves local development through the stub HTTP server and stands in for
/// the remote API in tests.
#[derive(Debug, Default)]
pub struct StubCatalog {
    products: Vec<Product>,
    customers: Vec<Customer>,
    addresses: Vec<Address>,
    orders: Mutex<Vec<(i64, OrderSubmission)>>,
    latency: Option<Duration>,
    categories_unavailable: bool,
}

fn matches_filter(value: &Option<String>, filter: Option<&str>) -> bool {
    match filter {
        Some(wanted) => value.as_deref() == Some(wanted),
        None => true,
    }
}

impl StubCatalog {
    pub fn new(fixture: StubFixture) -> Self {
        Self {
            products: fixture.products,
            customers: fixture.customers,
            addresses: fixture.addresses,
            ..Self::default()
        }
    }

    pub fn from_fixture_file(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DomainError::InvalidInput(format!("Cannot read fixture {}: {e}", path.display()))
        })?;
        let fixture: StubFixture = serde_json::from_str(&raw).map_err(|e| {
            DomainError::InvalidInput(format!("Invalid fixture {}: {e}", path.display()))
        })?;
        Ok(Self::new(fixture))
    }

    /// Two brands, five products, two customers with three addresses.
    pub fn sample() -> Self {
        let product = |id: i64, name: &str, price: &str, codes: (&str, &str, &str)| Product {
            product_id: ProductId::from(id),
            product_name: name.to_string(),
            price: BigDecimal::from_str(price).unwrap_or_default(),
            bar_code: Some(codes.0.to_string()),
            brand: Some(codes.1.to_string()),
            category: Some(codes.2.to_string()),
            image_path: Some(format!("/images/products/{id}.jpg")),
        };
        let address = |address_id: i64, customer_id: i64, label: &str| Address {
            address_id,
            customer_id,
            label: label.to_string(),
        };

        Self::new(StubFixture {
            products: vec![
                product(1, "Acme Soap Bar", "5.00", ("6221001", "Acme", "Soap")),
                product(2, "Acme Liquid Soap", "10.00", ("6221002", "Acme", "Soap")),
                product(3, "Acme Shampoo", "15.00", ("6221003", "Acme", "Shampoo")),
                product(4, "Globex Soap", "7.50", ("7000001", "Globex", "Soap")),
                product(5, "Globex Shampoo", "12.25", ("7000001", "Globex", "Shampoo")),
            ],
            customers: vec![
                Customer {
                    customer_id: 1,
                    name: "Cairo Market".to_string(),
                },
                Customer {
                    customer_id: 2,
                    name: "Delta Stores".to_string(),
                },
            ],
            addresses: vec![
                address(10, 1, "Main branch"),
                address(11, 1, "Warehouse"),
                address(20, 2, "Head office"),
            ],
        })
    }

    /// Delays every call, to exercise in-flight behaviour.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_categories_unavailable(mut self) -> Self {
        self.categories_unavailable = true;
        self
    }

    pub fn submitted_orders(&self) -> Vec<(i64, OrderSubmission)> {
        self.orders
            .lock()
            .map(|orders| orders.clone())
            .unwrap_or_default()
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn filtered<'a>(
        &'a self,
        brand: Option<&'a str>,
        category: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Product> + 'a {
        self.products.iter().filter(move |p| {
            matches_filter(&p.brand, brand) && matches_filter(&p.category, category)
        })
    }
}

#[async_trait]
impl CatalogLookup for StubCatalog {
    async fn list_brands(&self) -> Result<Vec<String>, DomainError> {
        self.delay().await;
        let brands: BTreeSet<String> = self.products.iter().filter_map(|p| p.brand.clone()).collect();
        Ok(brands.into_iter().collect())
    }

    async fn list_categories(&self, brand: Option<&str>) -> Result<Vec<String>, DomainError> {
        self.delay().await;
        if self.categories_unavailable {
            return Err(DomainError::Transport("categories service unavailable".to_string()));
        }
        let categories: BTreeSet<String> = self
            .filtered(brand, None)
            .filter_map(|p| p.category.clone())
            .collect();
        Ok(categories.into_iter().collect())
    }

    async fn list_products(
        &self,
        brand: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<Product>, DomainError> {
        self.delay().await;
        Ok(self.filtered(brand, category).cloned().collect())
    }

    async fn find_product(&self, id: &ProductId) -> Result<Product, DomainError> {
        self.delay().await;
        self.products
            .iter()
            .find(|p| &p.product_id == id)
            .cloned()
            .ok_or(DomainError::NotFound)
    }

    async fn search_by_barcode(
        &self,
        barcode: &str,
        brand: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<Product>, DomainError> {
        self.delay().await;
        let barcode = barcode.trim();
        Ok(self
            .filtered(brand, category)
            .filter(|p| p.bar_code.as_deref() == Some(barcode))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CustomerDirectory for StubCatalog {
    async fn list_customers(&self) -> Result<Vec<Customer>, DomainError> {
        self.delay().await;
        Ok(self.customers.clone())
    }

    async fn list_addresses(&self, customer_id: i64) -> Result<Vec<Address>, DomainError> {
        self.delay().await;
        if !self.customers.iter().any(|c| c.customer_id == customer_id) {
            return Err(DomainError::NotFound);
        }
        Ok(self
            .addresses
            .iter()
            .filter(|a| a.customer_id == customer_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OrderSubmitter for StubCatalog {
    async fn submit(&self, order: OrderSubmission) -> Result<SubmittedOrder, DomainError> {
        self.delay().await;
        if !self
            .addresses
            .iter()
            .any(|a| a.address_id == order.address_id && a.customer_id == order.customer_id)
        {
            return Err(DomainError::InvalidInput(format!(
                "address {} does not belong to customer {}",
                order.address_id, order.customer_id
            )));
        }
        if order.products.is_empty() {
            return Err(DomainError::InvalidInput("order has no products".to_string()));
        }
        for line in &order.products {
            if !self.products.iter().any(|p| p.product_id == ProductId::from(line.product_id)) {
                return Err(DomainError::InvalidInput(format!(
                    "unknown product {}",
                    line.product_id
                )));
            }
        }

        let mut orders = self
            .orders
            .lock()
            .map_err(|_| DomainError::Internal("order log lock poisoned".to_string()))?;
        let order_id = FIRST_ORDER_ID + orders.len() as i64;
        orders.push((order_id, order));
        Ok(SubmittedOrder { order_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_brands_and_scoped_categories() {
        let catalog = StubCatalog::sample();
        assert_eq!(catalog.list_brands().await.unwrap(), vec!["Acme", "Globex"]);
        assert_eq!(
            catalog.list_categories(Some("Acme")).await.unwrap(),
            vec!["Shampoo", "Soap"]
        );
        assert!(catalog.list_categories(Some("Nobody")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn filters_products_by_brand_and_category() {
        let catalog = StubCatalog::sample();
        assert_eq!(catalog.list_products(Some("Acme"), None).await.unwrap().len(), 3);
        assert_eq!(catalog.list_products(None, Some("Soap")).await.unwrap().len(), 3);
        assert_eq!(
            catalog.list_products(Some("Globex"), Some("Soap")).await.unwrap().len(),
            1
        );
        assert_eq!(catalog.list_products(None, None).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn barcode_search_returns_every_match() {
        let catalog = StubCatalog::sample();
        assert_eq!(catalog.search_by_barcode("7000001", None, None).await.unwrap().len(), 2);
        assert_eq!(
            catalog
                .search_by_barcode("7000001", None, Some("Soap"))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn submit_rejects_foreign_address() {
        let catalog = StubCatalog::sample();
        let err = catalog
            .submit(OrderSubmission {
                customer_id: 2,
                address_id: 10,
                note: String::new(),
                products: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
        assert!(catalog.submitted_orders().is_empty());
    }

    #[test]
    fn loads_fixture_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"{"products": [{"product_id": 9, "product_name": "Tea", "price": 3.5}],
                "customers": [{"customer_id": 1, "name": "Shop"}]}"#,
        )
        .unwrap();

        let catalog = StubCatalog::from_fixture_file(&path).unwrap();
        assert_eq!(catalog.products.len(), 1);
        assert_eq!(catalog.customers.len(), 1);
        assert!(catalog.addresses.is_empty());
    }
}
