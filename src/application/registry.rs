use chrono::NaiveDate;

use crate::domain::errors::DomainError;
use crate::domain::order::{
    BuilderSnapshot, CombinedRow, DetailedRow, RowId, Totals, MAX_QUANTITY,
};
use crate::domain::pricing::aggregate;

/// Which collection a row lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Detailed,
    Combined,
}

/// Session state of the order being built: selections plus the two row
/// collections, each kept in insertion order.
#[derive(Debug, Default)]
pub struct RowRegistry {
    next_id: u64,
    pub customer_id: Option<i64>,
    pub address_id: Option<i64>,
    pub order_date: Option<NaiveDate>,
    detailed: Vec<(RowId, DetailedRow)>,
    combined: Vec<(RowId, CombinedRow)>,
}

fn check_quantity(quantity: i64) -> Result<(), DomainError> {
    if !(1..=MAX_QUANTITY).contains(&quantity) {
        return Err(DomainError::Validation(format!(
            "quantity must be between 1 and {MAX_QUANTITY}, got {quantity}"
        )));
    }
    Ok(())
}

impl RowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> RowId {
        self.next_id += 1;
        RowId(self.next_id)
    }

    pub fn insert_detailed(&mut self, row: DetailedRow) -> Result<RowId, DomainError> {
        check_quantity(row.quantity)?;
        let id = self.allocate();
        self.detailed.push((id, row));
        Ok(id)
    }

    pub fn insert_combined(&mut self, row: CombinedRow) -> Result<RowId, DomainError> {
        check_quantity(row.quantity)?;
        let id = self.allocate();
        self.combined.push((id, row));
        Ok(id)
    }

    pub fn detailed(&self, id: RowId) -> Option<&DetailedRow> {
        self.detailed
            .iter()
            .find_map(|(row_id, row)| (*row_id == id).then_some(row))
    }

    pub fn combined(&self, id: RowId) -> Option<&CombinedRow> {
        self.combined
            .iter()
            .find_map(|(row_id, row)| (*row_id == id).then_some(row))
    }

    pub fn combined_mut(&mut self, id: RowId) -> Result<&mut CombinedRow, DomainError> {
        self.combined
            .iter_mut()
            .find_map(|(row_id, row)| (*row_id == id).then_some(row))
            .ok_or(DomainError::UnknownRow(id))
    }

    pub fn set_detailed_quantity(&mut self, id: RowId, quantity: i64) -> Result<(), DomainError> {
        check_quantity(quantity)?;
        let row = self
            .detailed
            .iter_mut()
            .find_map(|(row_id, row)| (*row_id == id).then_some(row))
            .ok_or(DomainError::UnknownRow(id))?;
        row.quantity = quantity;
        Ok(())
    }

    /// Sets a combined row's quantity and drops its now-stale derived totals.
    pub fn set_combined_quantity(&mut self, id: RowId, quantity: i64) -> Result<(), DomainError> {
        check_quantity(quantity)?;
        let row = self.combined_mut(id)?;
        row.quantity = quantity;
        row.derived = None;
        Ok(())
    }

    pub fn kind_of(&self, id: RowId) -> Option<RowKind> {
        if self.detailed(id).is_some() {
            Some(RowKind::Detailed)
        } else if self.combined(id).is_some() {
            Some(RowKind::Combined)
        } else {
            None
        }
    }

    pub fn remove(&mut self, id: RowId) -> Option<RowKind> {
        if let Some(pos) = self.detailed.iter().position(|(row_id, _)| *row_id == id) {
            self.detailed.remove(pos);
            return Some(RowKind::Detailed);
        }
        if let Some(pos) = self.combined.iter().position(|(row_id, _)| *row_id == id) {
            self.combined.remove(pos);
            return Some(RowKind::Combined);
        }
        None
    }

    /// Drops every row and selection. Row ids keep increasing so stale ids
    /// held by callers never alias a new row.
    pub fn clear(&mut self) {
        self.customer_id = None;
        self.address_id = None;
        self.order_date = None;
        self.detailed.clear();
        self.combined.clear();
    }

    pub fn detailed_rows(&self) -> impl Iterator<Item = (RowId, &DetailedRow)> {
        self.detailed.iter().map(|(id, row)| (*id, row))
    }

    pub fn combined_rows(&self) -> impl Iterator<Item = (RowId, &CombinedRow)> {
        self.combined.iter().map(|(id, row)| (*id, row))
    }

    pub fn is_empty(&self) -> bool {
        self.detailed.is_empty() && self.combined.is_empty()
    }

    pub fn totals(&self) -> Totals {
        aggregate(
            self.detailed.iter().map(|(_, row)| row),
            self.combined.iter().map(|(_, row)| row),
        )
    }

    pub fn snapshot(&self) -> BuilderSnapshot {
        BuilderSnapshot {
            customer_id: self.customer_id,
            address_id: self.address_id,
            order_date: self.order_date,
            detailed: self.detailed.clone(),
            combined: self.combined.clone(),
        }
    }
}
