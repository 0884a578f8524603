//! Counter application that remembers its state between runs.
//!
//! Run it twice: the second run starts where the first one stopped.

use cellstore::{FileStorage, MemoryStorage, PersistOptions, StorageAreas, Store};
use serde_json::{json, Value};
use std::sync::Arc;

fn as_i64(value: &Value) -> i64 {
    value.as_i64().unwrap_or(0)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Persistent Counter ===\n");

    let dir = std::env::temp_dir().join("cellstore-counter-demo");
    let areas = StorageAreas::new(
        Arc::new(FileStorage::open(&dir)?),
        Arc::new(MemoryStorage::new()),
    );
    println!("1. Storing state under {}", dir.display());

    let store = Store::with_persistence(
        json!({ "count": 0, "step": 1, "history": [] }),
        PersistOptions::local("counter"),
        &areas,
    )?;

    println!("\n2. Subscribing to count");
    let _display = store.subscribe("count", |count| {
        println!("   [count] {}", count);
    })?;

    let increment = |store: &Store| -> cellstore::Result<()> {
        let step = as_i64(&store.get("step")?);
        store.update("count", |count| json!(as_i64(count) + step))?;
        let count = store.get("count")?;
        store.update("history", |history| {
            let mut history = history.as_array().cloned().unwrap_or_default();
            history.push(count);
            Value::Array(history)
        })
    };

    println!("\n3. Incrementing...");
    increment(&store)?;
    increment(&store)?;

    println!("\n4. Changing step size to 5");
    store.set("step", 5)?;
    increment(&store)?;

    println!("\n5. Setting the same count again (no notification)");
    store.set("count", store.get("count")?)?;

    println!("\n6. History: {}", store.get("history")?);
    println!("\n7. Saved: {}", areas.local().get_item("counter")?.unwrap_or_default());

    println!("\n✓ Counter application complete!");
    Ok(())
}
