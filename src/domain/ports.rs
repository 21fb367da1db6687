use async_trait::async_trait;

use super::errors::DomainError;
use super::order::{OrderSubmission, SubmittedOrder};
use super::preview::Preview;
use super::product::{Address, Customer, Product, ProductId};

/// Remote product catalog.
#[async_trait]
pub trait CatalogLookup: Send + Sync + 'static {
    async fn list_brands(&self) -> Result<Vec<String>, DomainError>;

    async fn list_categories(&self, brand: Option<&str>) -> Result<Vec<String>, DomainError>;

    async fn list_products(
        &self,
        brand: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<Product>, DomainError>;

    async fn find_product(&self, id: &ProductId) -> Result<Product, DomainError>;

    /// Every product whose barcode matches. Callers decide what to do with
    /// zero or several matches.
    async fn search_by_barcode(
        &self,
        barcode: &str,
        brand: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<Product>, DomainError>;
}

#[async_trait]
pub trait CustomerDirectory: Send + Sync + 'static {
    async fn list_customers(&self) -> Result<Vec<Customer>, DomainError>;
    async fn list_addresses(&self, customer_id: i64) -> Result<Vec<Address>, DomainError>;
}

#[async_trait]
pub trait OrderSubmitter: Send + Sync + 'static {
    async fn submit(&self, order: OrderSubmission) -> Result<SubmittedOrder, DomainError>;
}

/// Key/value slot scoped to one browsing session.
pub trait SessionStorage: Send + Sync + 'static {
    fn get_item(&self, key: &str) -> Result<Option<String>, DomainError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), DomainError>;
    fn remove_item(&self, key: &str) -> Result<(), DomainError>;
}

/// Supplies the bearer credential of the signed-in user.
pub trait CredentialSource: Send + Sync + 'static {
    fn bearer_token(&self) -> Option<String>;
}

pub trait PreviewSink: Send + Sync + 'static {
    fn render(&self, preview: &Preview);
}
