//! Named collections of reactive fields.
//!
//! A [`Store`] wraps each field of its initial state in its own reactive
//! cell and can mirror the whole state into a [`Storage`](crate::Storage)
//! area selected by [`PersistOptions`].

mod store;

pub use store::{PersistOptions, Store};
