//! Observable value cells.
//!
//! A [`Reactive`] holds one value and calls its subscribers synchronously
//! whenever a write actually changes that value. Subscriptions are
//! identified by opaque [`SubscriptionId`] tokens rather than by closure
//! identity.

mod reactive;

pub use reactive::{Reactive, Subscription, SubscriptionGuard, SubscriptionId, Update};
