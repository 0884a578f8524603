//! Publish/subscribe event broker.

mod broker;

pub use broker::{EventBroker, HandlerId};
