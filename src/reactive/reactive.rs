use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(0);

/// Opaque token identifying one subscriber registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    fn next() -> Self {
        Self(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// The next value for a cell: either given directly or computed from the
/// current one.
pub enum Update<T> {
    Value(T),
    Updater(Box<dyn FnOnce(&T) -> T + Send>),
}

impl<T> Update<T> {
    /// Wrap a closure as an updater.
    pub fn updater<F>(f: F) -> Self
    where
        F: FnOnce(&T) -> T + Send + 'static,
    {
        Update::Updater(Box::new(f))
    }

    /// Resolve to the next value given the current one.
    pub fn resolve(self, current: &T) -> T {
        match self {
            Update::Value(value) => value,
            Update::Updater(f) => f(current),
        }
    }
}

impl<T> From<T> for Update<T> {
    fn from(value: T) -> Self {
        Update::Value(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Update<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Update::Updater(_) => f.write_str("Updater(..)"),
        }
    }
}

/// Anything a [`Subscription`] can remove itself from.
trait Registry: Send + Sync {
    fn remove(&self, id: SubscriptionId) -> bool;
    fn contains(&self, id: SubscriptionId) -> bool;
}

struct SubscriberList<T> {
    entries: Mutex<Vec<(SubscriptionId, Callback<T>)>>,
}

impl<T> SubscriberList<T> {
    fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Callback<T>)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, callback: Callback<T>) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.lock().push((id, callback));
        id
    }

    fn snapshot(&self) -> Vec<Callback<T>> {
        self.lock().iter().map(|(_, cb)| Arc::clone(cb)).collect()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

impl<T: 'static> Registry for SubscriberList<T> {
    fn remove(&self, id: SubscriptionId) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    fn contains(&self, id: SubscriptionId) -> bool {
        self.lock().iter().any(|(entry_id, _)| *entry_id == id)
    }
}

/// A single observable value.
///
/// Cloning a `Reactive` creates another handle to the same cell. Writes that
/// leave the value unchanged (by `PartialEq`) notify nobody. Equality is
/// checked on the value itself, so mutating shared interior state behind an
/// `Arc` without replacing the value is invisible to subscribers.
///
/// # Examples
///
/// ```
/// use cellstore::Reactive;
/// use std::sync::{Arc, Mutex};
///
/// let count = Reactive::new(0);
/// let seen = Arc::new(Mutex::new(Vec::new()));
///
/// let sub = count.subscribe({
///     let seen = seen.clone();
///     move |v: &i32| seen.lock().unwrap().push(*v)
/// });
///
/// count.set(1);
/// count.set(1);
/// count.update(|n| n + 1);
/// sub.unsubscribe();
/// count.set(10);
///
/// assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
/// ```
pub struct Reactive<T> {
    value: Arc<RwLock<T>>,
    subscribers: Arc<SubscriberList<T>>,
}

impl<T> Clone for Reactive<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Reactive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.value.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Reactive")
            .field("value", &*value)
            .field("subscriber_count", &self.subscribers.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Reactive<T> {
    /// Create a new cell holding `initial`, with no subscribers.
    pub fn new(initial: T) -> Self {
        Self {
            value: Arc::new(RwLock::new(initial)),
            subscribers: Arc::new(SubscriberList::new()),
        }
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Read the value with a function without cloning.
    ///
    /// `f` must not write to this cell.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let value = self.value.read().unwrap_or_else(PoisonError::into_inner);
        f(&*value)
    }

    /// Replace the value, notifying subscribers if it changed.
    pub fn set(&self, value: T) {
        self.commit(move |_| value);
    }

    /// Compute the next value from the current one.
    ///
    /// The read, comparison and store happen under one write lock, so
    /// concurrent updaters never lose writes. `f` must not access this cell.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        self.commit(f);
    }

    /// Apply either form of [`Update`].
    pub fn apply(&self, update: Update<T>) {
        self.commit(move |current| update.resolve(current));
    }

    /// Register `callback` and invoke it once right away with the current
    /// value.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let callback: Callback<T> = Arc::new(callback);
        let subscription = self.register(Arc::clone(&callback));
        let current = self.get();
        callback(&current);
        subscription
    }

    /// Register `callback` for future changes only.
    pub fn watch<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.register(Arc::new(callback))
    }

    /// Number of live registrations.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn register(&self, callback: Callback<T>) -> Subscription {
        let id = self.subscribers.push(callback);
        let weak = Arc::downgrade(&self.subscribers);
        let registry: Weak<dyn Registry> = weak;
        Subscription { id, registry }
    }

    /// Resolve and store the next value, then notify outside the lock.
    /// Returns whether the value changed.
    fn commit(&self, f: impl FnOnce(&T) -> T) -> bool {
        let next = {
            let mut current = self.value.write().unwrap_or_else(PoisonError::into_inner);
            let next = f(&current);
            if *current == next {
                return false;
            }
            *current = next.clone();
            next
        };
        // No lock is held here: subscribers may write to this or other cells.
        for callback in self.subscribers.snapshot() {
            callback(&next);
        }
        true
    }
}

/// Handle to one subscriber registration.
///
/// Dropping a `Subscription` leaves the subscriber registered; call
/// [`unsubscribe`](Self::unsubscribe) or convert it with
/// [`into_guard`](Self::into_guard) for scoped removal.
pub struct Subscription {
    id: SubscriptionId,
    registry: Weak<dyn Registry>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove the registration. Calling this again is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }

    /// Whether the registration is still present in a live cell.
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .map(|registry| registry.contains(self.id))
            .unwrap_or(false)
    }

    /// Unsubscribe automatically when the returned guard is dropped.
    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard { subscription: self }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// RAII guard that unsubscribes on drop.
#[derive(Debug)]
pub struct SubscriptionGuard {
    subscription: Subscription,
}

impl SubscriptionGuard {
    pub fn id(&self) -> SubscriptionId {
        self.subscription.id
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}
