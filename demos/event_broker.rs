//! Event broker feeding a store

use cellstore::{EventBroker, Store};
use serde_json::{json, Value};

fn main() -> cellstore::Result<()> {
    println!("=== Event Broker ===\n");

    let broker: EventBroker = EventBroker::new();
    let store = Store::new(json!({ "messages": 0, "last": null }))?;

    let _log = store.watch("last", |last| println!("   [last] {}", last))?;

    let target = store.clone();
    let counter = broker.on("message", move |data| {
        let _ = target.update("messages", |n| json!(n.as_u64().unwrap_or(0) + 1));
        let _ = target.set("last", data);
    });
    broker.on("message", |data| println!("   [audit] {}", data));

    println!("1. Emitting two messages");
    broker.emit("message", &json!({ "from": "ann", "text": "hi" }));
    broker.emit("message", &json!({ "from": "bob", "text": "hello" }));

    println!("\n2. Removing the store handler");
    broker.off("message", counter);
    broker.emit("message", &Value::String("ignored by the store".into()));

    println!("\nMessages counted: {}", store.get("messages")?);
    Ok(())
}
