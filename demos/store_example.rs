//! Store example with typed fields

use cellstore::{PersistOptions, StorageAreas, Store};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TodoItem {
    id: usize,
    text: String,
    completed: bool,
}

#[derive(Clone, Debug, Serialize)]
struct AppState {
    todos: Vec<TodoItem>,
    filter: String,
}

fn main() -> cellstore::Result<()> {
    println!("=== Store Example ===\n");

    let areas = StorageAreas::in_memory();

    // Create a store with initial state
    let store = Store::with_persistence(
        AppState {
            todos: vec![],
            filter: "all".to_string(),
        },
        PersistOptions::session("todos"),
        &areas,
    )?;

    // Subscribe to one field
    let _todos = store.subscribe("todos", |todos| {
        let todos: Vec<TodoItem> = serde_json::from_value(todos.clone()).unwrap_or_default();
        println!(
            "Todos updated! Active todos: {}",
            todos.iter().filter(|t| !t.completed).count()
        );
    })?;

    // Add a todo
    println!("\nAdding todo...");
    let mut todos: Vec<TodoItem> = store.get_as("todos")?;
    todos.push(TodoItem {
        id: 1,
        text: "Learn cellstore".to_string(),
        completed: false,
    });
    store.set("todos", &todos)?;

    // Changing another field does not notify the todos subscriber
    println!("\nSwitching filter...");
    store.set("filter", "active")?;

    // Complete the todo
    println!("\nCompleting todo...");
    if let Some(todo) = todos.first_mut() {
        todo.completed = true;
    }
    store.set("todos", &todos)?;

    // Read final state
    println!("\nFinal state: {:#?}", store.snapshot());
    println!(
        "Session storage: {}",
        areas.session().get_item("todos")?.unwrap_or_default()
    );
    Ok(())
}
