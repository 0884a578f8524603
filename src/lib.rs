//! # Cellstore
//!
//! Small reactive state containers with optional persistence.
//!
//! ## Cells
//!
//! - `Reactive<T>` - A value that notifies subscribers synchronously when a
//!   write changes it
//! - `Update<T>` - Either a next value or a function of the current one
//! - `Subscription` - Handle that removes one subscriber registration
//!
//! ## Stores
//!
//! - `Store` - A fixed set of named reactive fields holding JSON values
//! - `PersistOptions` - Mirror a store into a storage area under one key
//!
//! ## Storage
//!
//! - `Storage` - String key-value backend trait
//! - `MemoryStorage`, `FileStorage` - In-process and on-disk backends
//! - `StorageAreas` - The local/session pair stores select from
//!
//! ## Events
//!
//! - `EventBroker<D>` - Publish/subscribe by event name

pub mod broker;
pub mod error;
pub mod reactive;
pub mod storage;
pub mod store;

// Re-export main types for convenience
pub use broker::{EventBroker, HandlerId};
pub use error::{Result, StorageError, StoreError};
pub use reactive::{Reactive, Subscription, SubscriptionGuard, SubscriptionId, Update};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageAreas, StorageType};
pub use store::{PersistOptions, Store};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn it_works() {
        // Basic smoke test
        let store = Store::new(json!({ "count": 0 })).unwrap();
        assert_eq!(store.get("count").unwrap(), json!(0));
        store.set("count", 42).unwrap();
        assert_eq!(store.get("count").unwrap(), json!(42));
    }
}
