//! Property tests for change notification and persistence.

use cellstore::{PersistOptions, Reactive, StorageAreas, Store};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

/// Expected observations: the initial value, then every write that differs
/// from the value before it.
fn collapse(initial: i32, writes: &[i32]) -> Vec<i32> {
    let mut out = vec![initial];
    let mut current = initial;
    for &w in writes {
        if w != current {
            out.push(w);
            current = w;
        }
    }
    out
}

proptest! {
    #[test]
    fn subscriber_sees_deduplicated_sequence(
        initial in 0i32..4,
        writes in prop::collection::vec(0i32..4, 0..40),
    ) {
        let cell = Reactive::new(initial);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = cell.subscribe(move |v: &i32| sink.lock().unwrap().push(*v));

        for &w in &writes {
            cell.set(w);
        }

        prop_assert_eq!(seen.lock().unwrap().clone(), collapse(initial, &writes));
        prop_assert_eq!(cell.get(), writes.last().copied().unwrap_or(initial));
    }

    #[test]
    fn persisted_snapshot_tracks_last_writes(
        writes in prop::collection::vec((prop::bool::ANY, -100i64..100), 1..30),
    ) {
        let areas = StorageAreas::in_memory();
        let store = Store::with_persistence(
            json!({ "left": 0, "right": 0 }),
            PersistOptions::local("pair"),
            &areas,
        )
        .unwrap();

        let (mut left, mut right) = (0, 0);
        for &(is_left, n) in &writes {
            if is_left {
                store.set("left", n).unwrap();
                left = n;
            } else {
                store.set("right", n).unwrap();
                right = n;
            }
        }

        let raw = areas.local().get_item("pair").unwrap().unwrap();
        let saved: Value = serde_json::from_str(&raw).unwrap();
        prop_assert_eq!(saved, json!({ "left": left, "right": right }));
    }
}
