use crate::error::{Result, StoreError};
use crate::reactive::{Reactive, Subscription, Update};
use crate::storage::{Storage, StorageAreas, StorageType};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::{debug, error, warn};

type Fields = BTreeMap<String, Reactive<Value>>;

/// Where a store mirrors its state.
///
/// Deserializes from `{"storageType": "localStorage", "key": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistOptions {
    pub storage_type: StorageType,
    pub key: String,
}

impl PersistOptions {
    pub fn new(storage_type: StorageType, key: impl Into<String>) -> Self {
        Self {
            storage_type,
            key: key.into(),
        }
    }

    pub fn local(key: impl Into<String>) -> Self {
        Self::new(StorageType::LocalStorage, key)
    }

    pub fn session(key: impl Into<String>) -> Self {
        Self::new(StorageType::SessionStorage, key)
    }
}

#[derive(Clone)]
struct Persistence {
    options: PersistOptions,
    storage: Arc<dyn Storage>,
    /// Serializes snapshot-and-write so the last write holds the latest state.
    write_lock: Arc<Mutex<()>>,
}

/// A fixed set of named reactive fields.
///
/// Each field of the initial state becomes its own [`Reactive`] cell holding
/// a JSON value. Fields cannot be added or removed after construction, and
/// writing one field only notifies that field's subscribers.
///
/// With persistence configured, the store first restores any fields found
/// under the configured key, then rewrites the full snapshot of every field
/// to that key whenever any field changes. Write failures are logged and
/// never reach the caller of [`set`](Self::set) or other subscribers.
///
/// Cloning a `Store` creates another handle to the same fields.
///
/// # Examples
///
/// ```
/// use cellstore::{PersistOptions, Store, StorageAreas};
/// use serde_json::json;
///
/// let areas = StorageAreas::in_memory();
/// let store = Store::with_persistence(
///     json!({ "count": 0, "text": "Hello" }),
///     PersistOptions::local("counterStore"),
///     &areas,
/// )?;
///
/// store.set("count", 42)?;
/// store.update("count", |prev| json!(prev.as_i64().unwrap_or(0) + 1))?;
/// assert_eq!(store.get_as::<i64>("count")?, 43);
///
/// let saved = areas.local().get_item("counterStore")?.unwrap();
/// assert_eq!(saved, r#"{"count":43,"text":"Hello"}"#);
/// # Ok::<(), cellstore::StoreError>(())
/// ```
#[derive(Clone)]
pub struct Store {
    fields: Arc<Fields>,
    persistence: Option<Persistence>,
}

impl Store {
    /// Create a store without persistence.
    ///
    /// `initial` must serialize to a non-empty JSON object.
    pub fn new<S: Serialize>(initial: S) -> Result<Self> {
        let fields = Arc::new(build_fields(initial)?);
        debug!(fields = fields.len(), "Created store");
        Ok(Self {
            fields,
            persistence: None,
        })
    }

    /// Create a store mirrored to `options.key` in the selected storage area.
    ///
    /// Previously saved fields are restored before the write-back is
    /// attached. Unreadable or malformed saved data leaves the initial state
    /// untouched.
    pub fn with_persistence<S: Serialize>(
        initial: S,
        options: PersistOptions,
        areas: &StorageAreas,
    ) -> Result<Self> {
        let fields = Arc::new(build_fields(initial)?);
        let storage = areas.area(options.storage_type);

        restore(&fields, storage.as_ref(), &options);

        let persistence = Persistence {
            options,
            storage,
            write_lock: Arc::new(Mutex::new(())),
        };
        for (name, cell) in fields.iter() {
            let owner = Arc::downgrade(&fields);
            let persistence = persistence.clone();
            let name = name.clone();
            // The registration stays with the cell after the handle is dropped.
            let _ = cell.watch(move |_| write_back(&owner, &persistence, &name));
        }

        debug!(
            fields = fields.len(),
            storage = %persistence.options.storage_type,
            key = %persistence.options.key,
            "Created persisted store"
        );

        let store = Self {
            fields,
            persistence: Some(persistence),
        };
        if let Err(e) = store.persist_now() {
            error!(error = %e, "Failed to write initial store snapshot");
        }
        Ok(store)
    }

    /// Current value of a field.
    pub fn get(&self, key: &str) -> Result<Value> {
        Ok(self.field(key)?.get())
    }

    /// Current value of a field, deserialized.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        Ok(serde_json::from_value(self.get(key)?)?)
    }

    /// Replace a field's value.
    pub fn set<V: Serialize>(&self, key: &str, value: V) -> Result<()> {
        let cell = self.field(key)?;
        cell.set(serde_json::to_value(value)?);
        Ok(())
    }

    /// Compute a field's next value from its current one.
    ///
    /// The field is locked while `f` runs, so concurrent updates to one field
    /// are never lost. `f` must not access the same field.
    pub fn update<F>(&self, key: &str, f: F) -> Result<()>
    where
        F: FnOnce(&Value) -> Value,
    {
        self.field(key)?.update(f);
        Ok(())
    }

    /// Apply either form of [`Update`] to a field.
    pub fn apply(&self, key: &str, update: Update<Value>) -> Result<()> {
        self.field(key)?.apply(update);
        Ok(())
    }

    /// Subscribe to a field. The callback runs once immediately with the
    /// current value.
    pub fn subscribe<F>(&self, key: &str, callback: F) -> Result<Subscription>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        Ok(self.field(key)?.subscribe(callback))
    }

    /// Subscribe to future changes of a field only.
    pub fn watch<F>(&self, key: &str, callback: F) -> Result<Subscription>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        Ok(self.field(key)?.watch(callback))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Field names in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Fresh read of every field.
    pub fn snapshot(&self) -> Map<String, Value> {
        snapshot(&self.fields)
    }

    pub fn persist_options(&self) -> Option<&PersistOptions> {
        self.persistence.as_ref().map(|p| &p.options)
    }

    /// Write the current snapshot to storage now, reporting failures.
    ///
    /// Does nothing for stores without persistence.
    pub fn persist_now(&self) -> Result<()> {
        match &self.persistence {
            Some(p) => write_snapshot(&self.fields, p),
            None => Ok(()),
        }
    }

    fn field(&self, key: &str) -> Result<&Reactive<Value>> {
        self.fields
            .get(key)
            .ok_or_else(|| StoreError::FieldNotFound(key.to_string()))
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("fields", &self.snapshot())
            .field("persistence", &self.persist_options())
            .finish()
    }
}

fn build_fields<S: Serialize>(initial: S) -> Result<Fields> {
    match serde_json::to_value(initial)? {
        Value::Object(map) if !map.is_empty() => Ok(map
            .into_iter()
            .map(|(name, value)| (name, Reactive::new(value)))
            .collect()),
        Value::Object(_) => Err(StoreError::InvalidInitialState(
            "state has no fields".to_string(),
        )),
        other => Err(StoreError::InvalidInitialState(format!(
            "expected an object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn snapshot(fields: &Fields) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, cell)| (name.clone(), cell.get()))
        .collect()
}

fn write_snapshot(fields: &Fields, persistence: &Persistence) -> Result<()> {
    let _guard = persistence
        .write_lock
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    let encoded = serde_json::to_string(&snapshot(fields))?;
    persistence
        .storage
        .set_item(&persistence.options.key, &encoded)?;
    Ok(())
}

fn write_back(fields: &Weak<Fields>, persistence: &Persistence, changed: &str) {
    let Some(fields) = fields.upgrade() else {
        return;
    };
    if let Err(e) = write_snapshot(&fields, persistence) {
        error!(
            key = %persistence.options.key,
            field = changed,
            error = %e,
            "Failed to persist store snapshot"
        );
    }
}

/// Overwrite fields from the saved snapshot. All-or-nothing on parse errors.
fn restore(fields: &Fields, storage: &dyn Storage, options: &PersistOptions) {
    let saved = match storage.get_item(&options.key) {
        Ok(Some(saved)) if !saved.is_empty() => saved,
        Ok(_) => return,
        Err(e) => {
            warn!(key = %options.key, error = %e, "Failed to read saved state");
            return;
        }
    };

    let parsed: Map<String, Value> = match serde_json::from_str(&saved) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(key = %options.key, error = %e, "Failed to parse saved state");
            return;
        }
    };

    let mut restored = 0;
    for (name, value) in parsed {
        if let Some(cell) = fields.get(&name) {
            cell.set(value);
            restored += 1;
        }
    }
    debug!(key = %options.key, restored, "Restored saved state");
}
