use bigdecimal::{BigDecimal, RoundingMode, Zero};

use super::order::{CombinedRow, DetailedRow, Totals};

/// Folds the current rows into order totals.
///
/// Detailed rows count only with a positive quantity and unit price; combined
/// rows only once their derived totals are resolved and positive. The item
/// count saturates rather than overflowing.
pub fn aggregate<'a, D, C>(detailed: D, combined: C) -> Totals
where
    D: IntoIterator<Item = &'a DetailedRow>,
    C: IntoIterator<Item = &'a CombinedRow>,
{
    let zero = BigDecimal::zero();
    let mut totals = Totals::default();

    for row in detailed {
        if row.quantity > 0 && row.unit_price > zero {
            totals.total_items = totals.total_items.saturating_add(row.quantity);
            totals.total_price += &row.unit_price * BigDecimal::from(row.quantity);
        }
    }

    for derived in combined.into_iter().filter_map(|row| row.derived.as_ref()) {
        if derived.total_items > 0 && derived.total_price > zero {
            totals.total_items = totals.total_items.saturating_add(derived.total_items);
            totals.total_price += &derived.total_price;
        }
    }

    totals
}

/// Two fraction digits, half-up, comma-grouped thousands: `1,234.50`.
pub fn format_price(amount: &BigDecimal) -> String {
    let fixed = amount.with_scale_round(2, RoundingMode::HalfUp).to_string();
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{sign}{grouped}.{fraction}")
}

impl Totals {
    pub fn display(&self, currency: &str) -> String {
        format!(
            "{} items, {} {}",
            self.total_items,
            currency,
            format_price(&self.total_price)
        )
    }
}

#[cfg(test)]
mod tests {
    use std::iter;
    use std::str::FromStr;

    use super::*;
    use crate::domain::order::CombinedTotals;
    use crate::domain::product::ProductId;

    fn detailed(id: &str, quantity: i64, price: &str) -> DetailedRow {
        DetailedRow {
            product_id: ProductId::new(id),
            quantity,
            unit_price: BigDecimal::from_str(price).unwrap(),
        }
    }

    fn combined(total_items: i64, total_price: &str) -> CombinedRow {
        let mut row = CombinedRow::new(Some("Acme".to_string()), None);
        row.derived = Some(CombinedTotals {
            total_items,
            total_price: BigDecimal::from_str(total_price).unwrap(),
        });
        row
    }

    #[test]
    fn duplicate_product_rows_are_counted_separately() {
        let rows = [detailed("P1", 2, "10.00"), detailed("P1", 3, "10.00")];
        let totals = aggregate(&rows, iter::empty());
        assert_eq!(totals.total_items, 5);
        assert_eq!(format_price(&totals.total_price), "50.00");
        assert_eq!(totals.display("EGP"), "5 items, EGP 50.00");
    }

    #[test]
    fn skips_rows_without_positive_quantity_or_price() {
        let rows = [
            detailed("P1", 0, "10.00"),
            detailed("P2", 4, "0"),
            detailed("P3", 1, "2.25"),
        ];
        let totals = aggregate(&rows, iter::empty());
        assert_eq!(totals.total_items, 1);
        assert_eq!(totals.total_price, BigDecimal::from_str("2.25").unwrap());
    }

    #[test]
    fn includes_only_resolved_combined_rows() {
        let unresolved = CombinedRow::new(Some("Acme".to_string()), None);
        let rows = [combined(6, "60"), combined(0, "0"), unresolved];
        let totals = aggregate(iter::empty(), &rows);
        assert_eq!(totals.total_items, 6);
        assert_eq!(format_price(&totals.total_price), "60.00");
    }

    #[test]
    fn mixes_detailed_and_combined_rows() {
        let totals = aggregate(&[detailed("P1", 2, "1.5")], &[combined(6, "60")]);
        assert_eq!(totals.total_items, 8);
        assert_eq!(format_price(&totals.total_price), "63.00");
    }

    #[test]
    fn item_count_saturates_instead_of_overflowing() {
        let rows = [detailed("P1", i64::MAX, "1"), detailed("P2", 1, "1")];
        let totals = aggregate(&rows, &[combined(i64::MAX, "1")]);
        assert_eq!(totals.total_items, i64::MAX);
        assert_eq!(
            totals.total_price,
            BigDecimal::from(i64::MAX) + BigDecimal::from(2)
        );
    }

    #[test]
    fn empty_registry_totals_are_zero() {
        let totals = aggregate(iter::empty(), iter::empty());
        assert_eq!(totals, Totals::default());
        assert_eq!(format_price(&totals.total_price), "0.00");
    }

    #[test]
    fn formats_with_grouping_and_rounding() {
        let cases = [
            ("1234567.5", "1,234,567.50"),
            ("999.999", "1,000.00"),
            ("100", "100.00"),
            ("0.005", "0.01"),
            ("-1234.5", "-1,234.50"),
        ];
        for (input, expected) in cases {
            assert_eq!(format_price(&BigDecimal::from_str(input).unwrap()), expected);
        }
    }
}
