use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};

use super::draft_store::DraftStore;
use super::preview::{
    DebounceState, PreviewContext, PreviewDebouncer, DEFAULT_DEBOUNCE, DEFAULT_LOOKUP_CONCURRENCY,
};
use super::registry::RowRegistry;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    normalize_filter, CombinedRow, CombinedTotals, DetailedRow, OrderProductLine, OrderSubmission,
    RowId, SubmittedOrder, Totals,
};
use crate::domain::ports::{CatalogLookup, CustomerDirectory, OrderSubmitter, PreviewSink};
use crate::domain::pricing::format_price;
use crate::domain::product::{Address, Customer, Product, ProductId};

pub const DEFAULT_ADDRESS_RESTORE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct BuilderSettings {
    pub debounce: Duration,
    pub lookup_concurrency: usize,
    pub address_restore_timeout: Duration,
    pub currency: String,
}

impl Default for BuilderSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            lookup_concurrency: DEFAULT_LOOKUP_CONCURRENCY,
            address_restore_timeout: DEFAULT_ADDRESS_RESTORE_TIMEOUT,
            currency: "EGP".to_string(),
        }
    }
}

/// Collaborators of the builder.
#[derive(Clone)]
pub struct BuilderPorts {
    pub catalog: Arc<dyn CatalogLookup>,
    pub directory: Arc<dyn CustomerDirectory>,
    pub submitter: Arc<dyn OrderSubmitter>,
    pub drafts: DraftStore,
    pub sink: Arc<dyn PreviewSink>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BarcodeResolution {
    /// Exactly one product matched; a row was added for it.
    Locked(RowId),
    NoMatch,
    /// The user has to pick one of these.
    Ambiguous(Vec<Product>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub detailed_restored: usize,
    pub detailed_skipped: usize,
    pub combined_restored: usize,
    pub customer_restored: bool,
    pub address_restored: bool,
}

/// Degrades a non-critical lookup failure to `fallback`. Authentication
/// failures still abort the caller's flow.
fn degrade<T>(result: Result<T, DomainError>, fallback: T, what: &str) -> Result<T, DomainError> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_auth() => Err(e),
        Err(e) => {
            log::warn!("Loading {what} failed: {e}");
            Ok(fallback)
        }
    }
}

/// Submission lines with repeated products merged, in first-seen order.
#[derive(Debug, Default)]
struct OrderLines {
    lines: Vec<OrderProductLine>,
    positions: HashMap<i64, usize>,
}

impl OrderLines {
    fn add(&mut self, product_id: i64, quantity: i64) -> Result<(), DomainError> {
        match self.positions.get(&product_id) {
            Some(&pos) => {
                let line = &mut self.lines[pos];
                line.quantity = line.quantity.checked_add(quantity).ok_or_else(|| {
                    DomainError::Validation(format!("quantity of product {product_id} is too large"))
                })?;
            }
            None => {
                self.positions.insert(product_id, self.lines.len());
                self.lines.push(OrderProductLine {
                    product_id,
                    quantity,
                });
            }
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn into_vec(self) -> Vec<OrderProductLine> {
        self.lines
    }
}

/// The order being composed in the current session.
///
/// Owns all row state. Every qualifying change recomputes totals on the spot
/// and hands a snapshot to the preview debouncer, which rebuilds the preview
/// and persists the draft once input settles.
pub struct OrderBuilder {
    registry: RowRegistry,
    catalog: Arc<dyn CatalogLookup>,
    directory: Arc<dyn CustomerDirectory>,
    submitter: Arc<dyn OrderSubmitter>,
    drafts: DraftStore,
    debouncer: PreviewDebouncer,
    settings: BuilderSettings,
    brands: Vec<String>,
    customers: Vec<Customer>,
    addresses: Vec<Address>,
}

impl OrderBuilder {
    /// Must be called from within a tokio runtime.
    pub fn new(ports: BuilderPorts, settings: BuilderSettings) -> Self {
        let debouncer = PreviewDebouncer::spawn(
            PreviewContext {
                catalog: ports.catalog.clone(),
                drafts: ports.drafts.clone(),
                sink: ports.sink,
                concurrency: settings.lookup_concurrency,
            },
            settings.debounce,
        );
        Self {
            registry: RowRegistry::new(),
            catalog: ports.catalog,
            directory: ports.directory,
            submitter: ports.submitter,
            drafts: ports.drafts,
            debouncer,
            settings,
            brands: Vec::new(),
            customers: Vec::new(),
            addresses: Vec::new(),
        }
    }

    fn changed(&self) {
        self.debouncer.notify(self.registry.snapshot());
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn registry(&self) -> &RowRegistry {
        &self.registry
    }

    pub fn brands(&self) -> &[String] {
        &self.brands
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    pub fn preview_state(&self) -> DebounceState {
        self.debouncer.state()
    }

    pub fn totals(&self) -> Totals {
        self.registry.totals()
    }

    pub fn formatted_totals(&self) -> String {
        self.totals().display(&self.settings.currency)
    }

    pub fn formatted_price(&self) -> String {
        format!("{} {}", self.settings.currency, format_price(&self.totals().total_price))
    }

    /// Waits for the debouncer to preview and persist every change so far.
    pub async fn flush_preview(&self) {
        self.debouncer.settle().await;
    }

    // ── Lists and selections ─────────────────────────────────────────────────

    pub async fn load_brands(&mut self) -> Result<&[String], DomainError> {
        self.brands = degrade(self.catalog.list_brands().await, Vec::new(), "brands")?;
        Ok(&self.brands)
    }

    pub async fn load_customers(&mut self) -> Result<&[Customer], DomainError> {
        self.customers = degrade(self.directory.list_customers().await, Vec::new(), "customers")?;
        Ok(&self.customers)
    }

    /// Selects a loaded customer and loads their addresses. A previously
    /// selected address that does not belong to them is dropped.
    pub async fn select_customer(&mut self, customer_id: i64) -> Result<&[Address], DomainError> {
        if !self.customers.iter().any(|c| c.customer_id == customer_id) {
            return Err(DomainError::Validation(format!("unknown customer {customer_id}")));
        }
        self.registry.customer_id = Some(customer_id);
        self.addresses = degrade(
            self.directory.list_addresses(customer_id).await,
            Vec::new(),
            "addresses",
        )?;
        if let Some(address_id) = self.registry.address_id {
            if !self.addresses.iter().any(|a| a.address_id == address_id) {
                self.registry.address_id = None;
            }
        }
        self.changed();
        Ok(&self.addresses)
    }

    pub fn select_address(&mut self, address_id: i64) -> Result<(), DomainError> {
        if !self.addresses.iter().any(|a| a.address_id == address_id) {
            return Err(DomainError::Validation(format!("unknown address {address_id}")));
        }
        self.registry.address_id = Some(address_id);
        self.changed();
        Ok(())
    }

    pub fn set_order_date(&mut self, date: NaiveDate) {
        self.registry.order_date = Some(date);
        self.changed();
    }

    // ── Detailed rows ────────────────────────────────────────────────────────

    /// Adds a row locked to `product` at its current price.
    pub fn add_detailed_row(&mut self, product: &Product, quantity: i64) -> Result<RowId, DomainError> {
        let id = self.registry.insert_detailed(DetailedRow {
            product_id: product.product_id.clone(),
            quantity,
            unit_price: product.price.clone(),
        })?;
        self.changed();
        Ok(id)
    }

    pub async fn add_detailed_row_by_id(
        &mut self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<RowId, DomainError> {
        let product = self.catalog.find_product(product_id).await?;
        self.add_detailed_row(&product, quantity)
    }

    /// Only a single match locks a row; the builder never guesses between
    /// several products.
    pub async fn add_detailed_row_by_barcode(
        &mut self,
        barcode: &str,
        brand: Option<&str>,
        category: Option<&str>,
        quantity: i64,
    ) -> Result<BarcodeResolution, DomainError> {
        let mut matches = self
            .catalog
            .search_by_barcode(barcode, brand, category)
            .await?;
        match matches.len() {
            0 => Ok(BarcodeResolution::NoMatch),
            1 => {
                let product = matches.remove(0);
                Ok(BarcodeResolution::Locked(self.add_detailed_row(&product, quantity)?))
            }
            _ => Ok(BarcodeResolution::Ambiguous(matches)),
        }
    }

    pub fn set_detailed_quantity(&mut self, id: RowId, quantity: i64) -> Result<(), DomainError> {
        self.registry.set_detailed_quantity(id, quantity)?;
        self.changed();
        Ok(())
    }

    pub fn remove_row(&mut self, id: RowId) -> Result<(), DomainError> {
        self.registry.remove(id).ok_or(DomainError::UnknownRow(id))?;
        self.changed();
        Ok(())
    }

    // ── Combined rows ────────────────────────────────────────────────────────

    pub async fn add_combined_row(
        &mut self,
        brand: Option<String>,
        category: Option<String>,
    ) -> Result<RowId, DomainError> {
        let id = self.registry.insert_combined(CombinedRow::new(brand, category))?;
        self.changed();
        let loaded = match self.refresh_categories(id).await {
            Ok(()) => self.resolve_combined(id).await,
            Err(e) => Err(e),
        };
        if let Err(e) = loaded {
            // Auth failure: the row never becomes part of the order.
            self.registry.remove(id);
            self.changed();
            return Err(e);
        }
        Ok(id)
    }

    pub async fn set_combined_brand(
        &mut self,
        id: RowId,
        brand: Option<String>,
    ) -> Result<(), DomainError> {
        let row = self.registry.combined_mut(id)?;
        row.brand = normalize_filter(brand);
        row.derived = None;
        self.changed();
        self.refresh_categories(id).await?;
        self.resolve_combined(id).await
    }

    pub async fn set_combined_category(
        &mut self,
        id: RowId,
        category: Option<String>,
    ) -> Result<(), DomainError> {
        let row = self.registry.combined_mut(id)?;
        row.category = normalize_filter(category);
        row.derived = None;
        self.changed();
        self.resolve_combined(id).await
    }

    pub async fn set_combined_quantity(&mut self, id: RowId, quantity: i64) -> Result<(), DomainError> {
        self.registry.set_combined_quantity(id, quantity)?;
        self.changed();
        self.resolve_combined(id).await
    }

    /// Reloads the category choices for the row's brand. A selected category
    /// the brand no longer offers is cleared.
    async fn refresh_categories(&mut self, id: RowId) -> Result<(), DomainError> {
        let brand = self.registry.combined_mut(id)?.brand.clone();
        let loaded = match self.catalog.list_categories(brand.as_deref()).await {
            Ok(categories) => Some(categories),
            Err(e) if e.is_auth() => return Err(e),
            Err(e) => {
                log::warn!("Loading categories for {id} failed: {e}");
                None
            }
        };

        let row = self.registry.combined_mut(id)?;
        match loaded {
            Some(categories) => {
                if let Some(category) = &row.category {
                    if !categories.contains(category) {
                        row.category = None;
                    }
                }
                row.category_options = categories;
            }
            None => row.category_options.clear(),
        }
        Ok(())
    }

    /// Recomputes a combined row's derived totals from the catalog. Totals
    /// stay absent when the lookup fails or matches nothing.
    async fn resolve_combined(&mut self, id: RowId) -> Result<(), DomainError> {
        let row = self.registry.combined_mut(id)?;
        row.derived = None;
        let (brand, category, quantity) = (row.brand.clone(), row.category.clone(), row.quantity);

        let products = match self
            .catalog
            .list_products(brand.as_deref(), category.as_deref())
            .await
        {
            Ok(products) => products,
            Err(e) if e.is_auth() => return Err(e),
            Err(e) => {
                log::error!("Resolving combined row {id} failed: {e}");
                return Ok(());
            }
        };

        if products.is_empty() {
            return Ok(());
        }
        let Some(total_items) = i64::try_from(products.len())
            .ok()
            .and_then(|matches| matches.checked_mul(quantity))
        else {
            log::error!("Combined row {id} matches too many items to count");
            return Ok(());
        };
        let unit_sum: BigDecimal = products.iter().map(|p| p.price.clone()).sum();
        let row = self.registry.combined_mut(id)?;
        row.derived = Some(CombinedTotals {
            total_items,
            total_price: unit_sum * BigDecimal::from(quantity),
        });
        self.changed();
        Ok(())
    }

    // ── Draft lifecycle ──────────────────────────────────────────────────────

    /// Replaces the builder's rows with the session's saved draft.
    ///
    /// Best effort: products the catalog no longer knows are skipped, and the
    /// customer and address are only restored while still resolvable. The
    /// address list gets `address_restore_timeout` to load.
    pub async fn restore_draft(&mut self) -> Result<Option<RestoreReport>, DomainError> {
        let Some(draft) = self.drafts.load() else {
            return Ok(None);
        };
        let mut report = RestoreReport::default();

        self.registry.clear();
        self.addresses.clear();
        self.registry.order_date = draft.order_date;

        if self.customers.is_empty() {
            self.load_customers().await?;
        }
        if let Some(customer_id) = draft.customer_id {
            if self.customers.iter().any(|c| c.customer_id == customer_id) {
                self.registry.customer_id = Some(customer_id);
                report.customer_restored = true;
                report.address_restored = self.restore_address(customer_id, draft.address_id).await?;
            }
        }

        let catalog = self.catalog.as_ref();
        let lookups: Vec<_> = stream::iter(&draft.detailed_rows)
            .map(|row| async move { (row.quantity, catalog.find_product(&row.product_id).await) })
            .buffered(self.settings.lookup_concurrency.max(1))
            .collect()
            .await;
        for (quantity, lookup) in lookups {
            let restored = match lookup {
                Ok(product) => self
                    .registry
                    .insert_detailed(DetailedRow {
                        product_id: product.product_id,
                        quantity,
                        unit_price: product.price,
                    })
                    .is_ok(),
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => {
                    log::warn!("Skipping draft row that no longer resolves: {e}");
                    false
                }
            };
            if restored {
                report.detailed_restored += 1;
            } else {
                report.detailed_skipped += 1;
            }
        }

        for saved in &draft.combined_rows {
            let mut row = CombinedRow::new(saved.brand.clone(), saved.category.clone());
            row.quantity = saved.quantity;
            let Ok(id) = self.registry.insert_combined(row) else {
                log::warn!("Skipping combined draft row with quantity {}", saved.quantity);
                continue;
            };
            self.refresh_categories(id).await?;
            self.resolve_combined(id).await?;
            report.combined_restored += 1;
        }

        self.changed();
        log::info!(
            "Restored order draft: {} detailed ({} skipped), {} combined",
            report.detailed_restored,
            report.detailed_skipped,
            report.combined_restored
        );
        Ok(Some(report))
    }

    async fn restore_address(
        &mut self,
        customer_id: i64,
        address_id: Option<i64>,
    ) -> Result<bool, DomainError> {
        let timeout = self.settings.address_restore_timeout;
        let addresses =
            match tokio::time::timeout(timeout, self.directory.list_addresses(customer_id)).await {
                Ok(result) => degrade(result, Vec::new(), "addresses")?,
                Err(_) => {
                    log::warn!(
                        "Addresses for customer {customer_id} not loaded within {timeout:?}; address not restored"
                    );
                    return Ok(false);
                }
            };
        self.addresses = addresses;

        let found = address_id
            .filter(|wanted| self.addresses.iter().any(|a| a.address_id == *wanted));
        self.registry.address_id = found;
        Ok(found.is_some())
    }

    /// Discards the draft and every in-memory row, leaving a blank builder.
    pub async fn clear_draft(&mut self) {
        self.reset();
        self.debouncer.settle().await;
    }

    fn reset(&mut self) {
        self.registry.clear();
        self.addresses.clear();
        self.debouncer.discard();
    }

    // ── Submission ───────────────────────────────────────────────────────────

    /// Submits the order. Combined rows are re-resolved against the catalog
    /// and expanded to concrete products; repeated products are merged.
    /// Nothing is sent unless customer, address and products are present.
    pub async fn submit(&mut self, note: &str) -> Result<SubmittedOrder, DomainError> {
        let customer_id = self
            .registry
            .customer_id
            .ok_or_else(|| DomainError::Validation("select a customer".to_string()))?;
        let address_id = self
            .registry
            .address_id
            .ok_or_else(|| DomainError::Validation("select an address".to_string()))?;
        if self.registry.is_empty() {
            return Err(DomainError::Validation("add at least one product".to_string()));
        }

        let mut lines = OrderLines::default();
        for (_, row) in self.registry.detailed_rows() {
            lines.add(row.product_id.to_wire()?, row.quantity)?;
        }
        for (_, row) in self.registry.combined_rows() {
            let products = self
                .catalog
                .list_products(row.brand.as_deref(), row.category.as_deref())
                .await?;
            for product in products {
                lines.add(product.product_id.to_wire()?, row.quantity)?;
            }
        }

        if lines.is_empty() {
            return Err(DomainError::Validation(
                "no products matched the order rows".to_string(),
            ));
        }

        let submitted = self
            .submitter
            .submit(OrderSubmission {
                customer_id,
                address_id,
                note: note.trim().to_string(),
                products: lines.into_vec(),
            })
            .await?;
        log::info!("Submitted order {} for customer {customer_id}", submitted.order_id);

        self.reset();
        self.debouncer.settle().await;
        Ok(submitted)
    }
}
