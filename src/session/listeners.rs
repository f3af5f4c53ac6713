//! Listener sets - subscription id → callback, notified defensively.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

pub type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Inner<T> {
    next_id: AtomicU64,
    callbacks: RwLock<BTreeMap<u64, Callback<T>>>,
}

/// One set of callbacks. Cloning shares the set.
pub struct Listeners<T> {
    inner: Arc<Inner<T>>,
    kind: &'static str,
}

impl<T> Clone for Listeners<T> {
    fn clone(&self) -> Self { Self { inner: self.inner.clone(), kind: self.kind } }
}

impl<T: 'static> Listeners<T> {
    pub fn new(kind: &'static str) -> Self {
        Self { inner: Arc::new(Inner { next_id: AtomicU64::new(1), callbacks: RwLock::new(BTreeMap::new()) }), kind }
    }

    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.callbacks.write().unwrap_or_else(|p| p.into_inner()).insert(id, Arc::new(callback));
        let weak: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        Subscription {
            id,
            remove: Some(Box::new(move |id| match weak.upgrade() {
                Some(inner) => inner.callbacks.write().unwrap_or_else(|p| p.into_inner()).remove(&id).is_some(),
                None => false,
            })),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.callbacks.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn clear(&self) {
        self.inner.callbacks.write().unwrap_or_else(|p| p.into_inner()).clear();
    }

    /// Call every listener with `value`. Iterates a snapshot, so callbacks may
    /// subscribe or unsubscribe mid-pass. A panicking callback is logged and
    /// skipped. Returns how many callbacks completed.
    pub fn notify(&self, value: &T) -> usize {
        let snapshot: Vec<(u64, Callback<T>)> = self
            .inner
            .callbacks
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .map(|(id, cb)| (*id, cb.clone()))
            .collect();
        let mut delivered = 0;
        for (id, cb) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| cb(value))) {
                Ok(()) => delivered += 1,
                Err(_) => tracing::error!("Error in {} listener #{}", self.kind, id),
            }
        }
        delivered
    }
}

/// Handle returned by `on_*` registration. Dropping it keeps the listener;
/// call [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    id: u64,
    remove: Option<Box<dyn FnOnce(u64) -> bool + Send + Sync>>,
}

impl Subscription {
    pub fn id(&self) -> u64 { self.id }

    /// Remove the listener. Returns false if it was already gone.
    pub fn unsubscribe(mut self) -> bool {
        self.remove.take().is_some_and(|remove| remove(self.id))
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn notifies_all_and_unsubscribes_one() {
        let set: Listeners<u32> = Listeners::new("test");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (seen.clone(), seen.clone());
        let sub_a = set.subscribe(move |v| a.lock().unwrap().push(("a", *v)));
        let _sub_b = set.subscribe(move |v| b.lock().unwrap().push(("b", *v)));

        assert_eq!(set.notify(&1), 2);
        assert!(sub_a.unsubscribe());
        assert_eq!(set.notify(&2), 1);
        assert_eq!(*seen.lock().unwrap(), vec![("a", 1), ("b", 1), ("b", 2)]);
    }

    #[test]
    fn panicking_listener_does_not_stop_siblings() {
        let set: Listeners<()> = Listeners::new("test");
        let hits = Arc::new(AtomicU64::new(0));
        let h1 = hits.clone();
        let h2 = hits.clone();
        let _s1 = set.subscribe(move |_| { h1.fetch_add(1, Ordering::SeqCst); });
        let _s2 = set.subscribe(|_| panic!("listener blew up"));
        let _s3 = set.subscribe(move |_| { h2.fetch_add(1, Ordering::SeqCst); });

        assert_eq!(set.notify(&()), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        // Still registered; fires again next pass
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn unsubscribe_after_clear_reports_false() {
        let set: Listeners<u8> = Listeners::new("test");
        let sub = set.subscribe(|_| {});
        set.clear();
        assert!(!sub.unsubscribe());
    }

    #[test]
    fn listener_may_subscribe_during_notify() {
        let set: Listeners<u8> = Listeners::new("test");
        let inner = set.clone();
        let _s = set.subscribe(move |_| { let _ = inner.subscribe(|_| {}); });
        assert_eq!(set.notify(&0), 1);
        assert_eq!(set.len(), 2);
    }
}
