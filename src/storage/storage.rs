use crate::error::StorageError;
use crate::storage::MemoryStorage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A string key-value storage area.
pub trait Storage: Send + Sync {
    /// Read the value under `key`, or `None` if nothing is stored there.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// Remove every key.
    fn clear(&self) -> Result<(), StorageError>;
}

/// Which storage area a store persists to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageType {
    #[serde(rename = "localStorage")]
    LocalStorage,
    #[serde(rename = "sessionStorage")]
    SessionStorage,
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageType::LocalStorage => f.write_str("localStorage"),
            StorageType::SessionStorage => f.write_str("sessionStorage"),
        }
    }
}

/// The pair of storage areas stores can be configured against.
///
/// Cloning shares the underlying backends.
#[derive(Clone)]
pub struct StorageAreas {
    local: Arc<dyn Storage>,
    session: Arc<dyn Storage>,
}

impl StorageAreas {
    pub fn new(local: Arc<dyn Storage>, session: Arc<dyn Storage>) -> Self {
        Self { local, session }
    }

    /// Two independent in-memory areas.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(MemoryStorage::new()),
        )
    }

    pub fn local(&self) -> Arc<dyn Storage> {
        Arc::clone(&self.local)
    }

    pub fn session(&self) -> Arc<dyn Storage> {
        Arc::clone(&self.session)
    }

    /// The backend selected by `storage_type`.
    pub fn area(&self, storage_type: StorageType) -> Arc<dyn Storage> {
        match storage_type {
            StorageType::LocalStorage => self.local(),
            StorageType::SessionStorage => self.session(),
        }
    }
}

impl Default for StorageAreas {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl fmt::Debug for StorageAreas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageAreas").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&StorageType::LocalStorage).unwrap(),
            "\"localStorage\""
        );
        let parsed: StorageType = serde_json::from_str("\"sessionStorage\"").unwrap();
        assert_eq!(parsed, StorageType::SessionStorage);
        assert!(serde_json::from_str::<StorageType>("\"cookies\"").is_err());
    }

    #[test]
    fn areas_are_independent() {
        let areas = StorageAreas::in_memory();
        areas.local().set_item("k", "local").unwrap();

        assert_eq!(
            areas.area(StorageType::LocalStorage).get_item("k").unwrap(),
            Some("local".to_string())
        );
        assert_eq!(
            areas.area(StorageType::SessionStorage).get_item("k").unwrap(),
            None
        );
    }

    #[test]
    fn cloned_areas_share_backends() {
        let areas = StorageAreas::in_memory();
        let other = areas.clone();
        other.session().set_item("k", "v").unwrap();

        assert_eq!(areas.session().get_item("k").unwrap(), Some("v".to_string()));
    }
}
