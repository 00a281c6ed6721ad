//! Same-process cache invalidation bus.
//!
//! Feature code publishes cache keys after a mutation; subscribers
//! refetch the data those keys name. Delivery is synchronous, on the
//! task that called `publish`, and at-most-once per subscriber per
//! publish. The bus is a latency hint only (the REST cache's own tag
//! invalidation remains the correctness mechanism), so failures to
//! deliver are logged and swallowed, never propagated.

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::{debug, warn};

/// A single invalidation notice. Ephemeral and fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheInvalidationEvent {
    /// Cache key being invalidated.
    pub key: String,
    /// Publish time, milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
}

/// Callback invoked for each matching publish.
pub type InvalidationCallback = Box<dyn Fn(&CacheInvalidationEvent) + Send + Sync>;

/// Handle for removing a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: u64,
    keys: HashSet<String>,
    callback: InvalidationCallback,
}

/// Process-wide pub/sub for cache invalidation hints.
#[derive(Default)]
pub struct CacheInvalidationBus {
    inner: Mutex<BusInner>,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    subscriptions: Vec<Subscription>,
}

impl CacheInvalidationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for any of the given keys.
    ///
    /// The callback fires at most once per publish, even when several
    /// published keys match, carrying the first matching key's event.
    pub fn subscribe<I, S>(&self, keys: I, callback: InvalidationCallback) -> SubscriptionId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: HashSet<String> = keys.into_iter().map(Into::into).collect();
        let mut inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.next_id += 1;
        let id = inner.next_id;
        inner.subscriptions.push(Subscription { id, keys, callback });
        SubscriptionId(id)
    }

    /// Remove a subscription. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.subscriptions.retain(|s| s.id != id.0);
    }

    /// Broadcast an invalidation for one or more cache keys.
    ///
    /// Each subscriber whose key set intersects the published keys is
    /// invoked exactly once, synchronously. Broadcast problems are
    /// swallowed after logging.
    pub fn publish<I, S>(&self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let now_ms = Utc::now().timestamp_millis();
        let events: Vec<CacheInvalidationEvent> = keys
            .into_iter()
            .map(|key| CacheInvalidationEvent {
                key: key.as_ref().to_string(),
                timestamp_ms: now_ms,
            })
            .collect();

        if events.is_empty() {
            debug!("Invalidation publish with no keys, nothing to do");
            return;
        }

        let inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => {
                warn!("Invalidation bus lock poisoned, delivering anyway");
                poisoned.into_inner()
            }
        };

        for subscription in &inner.subscriptions {
            // At-most-once per publish: first matching key wins.
            if let Some(event) = events.iter().find(|e| subscription.keys.contains(&e.key)) {
                (subscription.callback)(event);
            }
        }

        debug!(
            keys = ?events.iter().map(|e| e.key.as_str()).collect::<Vec<_>>(),
            subscribers = inner.subscriptions.len(),
            "Published cache invalidation"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_callback(counter: Arc<AtomicUsize>) -> InvalidationCallback {
        Box::new(move |_event| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_matching_subscriber_fires_exactly_once() {
        let bus = CacheInvalidationBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(["K1", "K2"], counting_callback(count.clone()));

        bus.publish(["K1"]);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_non_matching_subscriber_is_silent() {
        let bus = CacheInvalidationBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(["K3"], counting_callback(count.clone()));

        bus.publish(["K1"]);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_multi_key_publish_deduplicates_per_subscriber() {
        let bus = CacheInvalidationBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(["K1", "K2"], counting_callback(count.clone()));

        // Both keys match the same subscriber; it still fires once.
        bus.publish(["K1", "K2"]);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // A second publish fires again.
        bus.publish(["K2"]);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_event_carries_key_and_timestamp() {
        let bus = CacheInvalidationBus::new();
        let seen: Arc<Mutex<Vec<CacheInvalidationEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        bus.subscribe(
            ["shipments"],
            Box::new(move |event| {
                seen_clone.lock().unwrap().push(event.clone());
            }),
        );

        let before = Utc::now().timestamp_millis();
        bus.publish(["shipments"]);
        let after = Utc::now().timestamp_millis();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].key, "shipments");
        assert!(seen[0].timestamp_ms >= before && seen[0].timestamp_ms <= after);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = CacheInvalidationBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let id = bus.subscribe(["K1"], counting_callback(count.clone()));

        bus.publish(["K1"]);
        bus.unsubscribe(id);
        bus.publish(["K1"]);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_publish_with_no_keys_is_a_no_op() {
        let bus = CacheInvalidationBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(["K1"], counting_callback(count.clone()));

        bus.publish(std::iter::empty::<&str>());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_publish_without_subscribers_does_not_error() {
        let bus = CacheInvalidationBus::new();
        bus.publish(["K1", "K2"]);
    }
}
