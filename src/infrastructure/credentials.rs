use std::sync::RwLock;

use crate::domain::ports::CredentialSource;

/// Bearer token handed over by the sign-in flow. Signing out clears it.
#[derive(Debug, Default)]
pub struct SessionCredential {
    token: RwLock<Option<String>>,
}

impl SessionCredential {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token.filter(|t| !t.trim().is_empty())),
        }
    }

    pub fn sign_in(&self, token: impl Into<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = Some(token.into());
        }
    }

    pub fn sign_out(&self) {
        if let Ok(mut slot) = self.token.write() {
            *slot = None;
        }
    }
}

impl CredentialSource for SessionCredential {
    fn bearer_token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }
}
