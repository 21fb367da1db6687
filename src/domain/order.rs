use std::fmt;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::product::ProductId;

/// Largest quantity a single row may carry. Keeps every derived count
/// (per-row totals, merged lines, order totals) far inside `i64`.
pub const MAX_QUANTITY: i64 = 1_000_000;

/// Identifier of a row inside the registry, assigned in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An order line bound to one resolved product. The unit price is captured
/// when the row is created and never re-fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailedRow {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CombinedTotals {
    pub total_items: i64,
    pub total_price: BigDecimal,
}

/// "Every product matching brand/category, `quantity` of each."
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedRow {
    pub brand: Option<String>,
    pub category: Option<String>,
    pub quantity: i64,
    /// Absent while inputs are incomplete or a lookup is outstanding.
    pub derived: Option<CombinedTotals>,
    pub category_options: Vec<String>,
}

impl CombinedRow {
    pub fn new(brand: Option<String>, category: Option<String>) -> Self {
        Self {
            brand: normalize_filter(brand),
            category: normalize_filter(category),
            quantity: 1,
            derived: None,
            category_options: Vec::new(),
        }
    }
}

/// Empty and whitespace-only filters mean "no filter".
pub fn normalize_filter(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Totals {
    pub total_items: i64,
    pub total_price: BigDecimal,
}

impl Default for Totals {
    fn default() -> Self {
        Self {
            total_items: 0,
            total_price: BigDecimal::from(0),
        }
    }
}

// ── Persisted draft ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftDetailedRow {
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftCombinedRow {
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub quantity: i64,
}

/// The in-progress order as persisted for the current session. Derived
/// combined totals are deliberately absent; they are recomputed on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    #[serde(default)]
    pub customer_id: Option<i64>,
    #[serde(default)]
    pub address_id: Option<i64>,
    #[serde(default)]
    pub order_date: Option<NaiveDate>,
    #[serde(default)]
    pub detailed_rows: Vec<DraftDetailedRow>,
    #[serde(default)]
    pub combined_rows: Vec<DraftCombinedRow>,
}

/// Point-in-time copy of the builder handed to the preview debouncer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuilderSnapshot {
    pub customer_id: Option<i64>,
    pub address_id: Option<i64>,
    pub order_date: Option<NaiveDate>,
    pub detailed: Vec<(RowId, DetailedRow)>,
    pub combined: Vec<(RowId, CombinedRow)>,
}

impl BuilderSnapshot {
    pub fn to_draft(&self) -> OrderDraft {
        OrderDraft {
            customer_id: self.customer_id,
            address_id: self.address_id,
            order_date: self.order_date,
            detailed_rows: self
                .detailed
                .iter()
                .map(|(_, row)| DraftDetailedRow {
                    product_id: row.product_id.clone(),
                    quantity: row.quantity,
                })
                .collect(),
            combined_rows: self
                .combined
                .iter()
                .map(|(_, row)| DraftCombinedRow {
                    brand: row.brand.clone(),
                    category: row.category.clone(),
                    quantity: row.quantity,
                })
                .collect(),
        }
    }
}

// ── Submission ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderProductLine {
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSubmission {
    pub customer_id: i64,
    pub address_id: i64,
    #[serde(default)]
    pub note: String,
    pub products: Vec<OrderProductLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedOrder {
    #[serde(alias = "orderId", alias = "id")]
    pub order_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_filters_are_treated_as_absent() {
        let row = CombinedRow::new(Some("  ".to_string()), Some(" Soap ".to_string()));
        assert_eq!(row.brand, None);
        assert_eq!(row.category.as_deref(), Some("Soap"));
        assert_eq!(row.quantity, 1);
        assert!(row.derived.is_none());
    }

    #[test]
    fn draft_uses_camel_case_and_omits_derived_totals() {
        let mut combined = CombinedRow::new(Some("Acme".to_string()), None);
        combined.derived = Some(CombinedTotals {
            total_items: 6,
            total_price: BigDecimal::from(60),
        });
        let snapshot = BuilderSnapshot {
            customer_id: Some(3),
            address_id: Some(9),
            order_date: NaiveDate::from_ymd_opt(2024, 5, 1),
            detailed: vec![(
                RowId(1),
                DetailedRow {
                    product_id: ProductId::new("11"),
                    quantity: 2,
                    unit_price: BigDecimal::from(10),
                },
            )],
            combined: vec![(RowId(2), combined)],
        };

        let json = serde_json::to_value(snapshot.to_draft()).unwrap();
        assert_eq!(json["customerId"], 3);
        assert_eq!(json["orderDate"], "2024-05-01");
        assert_eq!(json["detailedRows"][0]["productId"], "11");
        assert_eq!(json["combinedRows"][0]["brand"], "Acme");
        assert!(json["combinedRows"][0].get("totalPrice").is_none());
    }
}
