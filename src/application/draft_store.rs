use std::sync::Arc;

use crate::domain::errors::DomainError;
use crate::domain::order::OrderDraft;
use crate::domain::ports::SessionStorage;

pub const DRAFT_KEY: &str = "order_draft";

/// The single persisted draft of the current session.
#[derive(Clone)]
pub struct DraftStore {
    storage: Arc<dyn SessionStorage>,
}

impl DraftStore {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    pub fn save(&self, draft: &OrderDraft) -> Result<(), DomainError> {
        let json = serde_json::to_string(draft)
            .map_err(|e| DomainError::Internal(format!("Failed to encode draft: {e}")))?;
        self.storage.set_item(DRAFT_KEY, &json)
    }

    /// Missing, unreadable, and corrupt drafts all read as "no draft".
    pub fn load(&self) -> Option<OrderDraft> {
        let raw = match self.storage.get_item(DRAFT_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Draft storage unreadable, starting blank: {e}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(draft) => Some(draft),
            Err(e) => {
                log::warn!("Discarding corrupt order draft: {e}");
                None
            }
        }
    }

    pub fn clear(&self) -> Result<(), DomainError> {
        self.storage.remove_item(DRAFT_KEY)
    }
}
