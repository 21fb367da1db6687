use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::ports::SessionStorage;

// ── In-memory ────────────────────────────────────────────────────────────────

/// Storage that lives exactly as long as the process.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, DomainError> {
        self.items
            .lock()
            .map_err(|_| DomainError::Internal("session storage lock poisoned".to_string()))
    }
}

impl SessionStorage for MemorySessionStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.items()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), DomainError> {
        self.items()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), DomainError> {
        self.items()?.remove(key);
        Ok(())
    }
}

// ── File-backed ──────────────────────────────────────────────────────────────

/// One directory per session id; items survive process restarts as long as
/// the same session id is reused.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    dir: PathBuf,
}

impl FileSessionStorage {
    pub fn new(root: impl AsRef<Path>, session_id: &str) -> Result<Self, DomainError> {
        let dir = root.as_ref().join(sanitize(session_id)?);
        fs::create_dir_all(&dir).map_err(|e| {
            DomainError::Internal(format!("Cannot create session dir {}: {e}", dir.display()))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, DomainError> {
        Ok(self.dir.join(format!("{}.json", sanitize(key)?)))
    }
}

fn sanitize(name: &str) -> Result<&str, DomainError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(DomainError::InvalidInput(format!(
            "'{name}' is not a valid storage name"
        )))
    }
}

impl SessionStorage for FileSessionStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, DomainError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DomainError::Internal(format!("Cannot read '{key}': {e}"))),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), DomainError> {
        let path = self.path_for(key)?;
        // Write-then-rename keeps readers from ever seeing half a value. The
        // temp name is unique per write so concurrent processes sharing a
        // session never clobber each other's temp file.
        let tmp = self.dir.join(format!(".{key}.{}.tmp", Uuid::new_v4()));
        fs::write(&tmp, value)
            .and_then(|_| fs::rename(&tmp, &path))
            .map_err(|e| DomainError::Internal(format!("Cannot write '{key}': {e}")))
    }

    fn remove_item(&self, key: &str) -> Result<(), DomainError> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DomainError::Internal(format!("Cannot remove '{key}': {e}"))),
        }
    }
}
