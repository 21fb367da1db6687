use bigdecimal::BigDecimal;

use super::order::Totals;
use super::product::ProductId;

/// One card per distinct product across all detailed rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductCard {
    pub product_id: ProductId,
    pub product_name: String,
    pub bar_code: Option<String>,
    pub image_path: Option<String>,
    pub unit_price: BigDecimal,
    pub quantity: i64,
    pub line_total: BigDecimal,
}

/// Summary of a combined row whose totals have been resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedCard {
    pub brand: Option<String>,
    pub category: Option<String>,
    pub quantity: i64,
    pub total_items: i64,
    pub total_price: BigDecimal,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preview {
    pub products: Vec<ProductCard>,
    pub combined: Vec<CombinedCard>,
    pub totals: Totals,
}
