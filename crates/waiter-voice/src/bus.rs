//! Typed publish/subscribe channels that decouple recognition from reaction.
//!
//! The bus is an explicit value: construct it once at process start and hand
//! an `Arc<EventBus>` to every component that publishes or subscribes.
//!
//! Publication is synchronous and runs on the caller's thread. Callbacks are
//! invoked in subscription order over a snapshot of the registry taken at
//! publish time, so subscribing or unsubscribing from inside a callback is
//! safe. A callback removed mid-publication is skipped if it has not been
//! reached yet. A panicking callback is isolated and logged; the remaining
//! callbacks still run and the publisher never sees the panic.

use crate::signal::{VoiceAction, VoiceFilters, VoiceState};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tracing::{debug, error};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Subscriber<T> {
    id: u64,
    active: AtomicBool,
    callback: Callback<T>,
}

type Registry<T> = Mutex<Vec<Arc<Subscriber<T>>>>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// One signal kind: an ordered list of subscribers.
pub struct Channel<T> {
    name: &'static str,
    next_id: AtomicU64,
    registry: Arc<Registry<T>>,
}

impl<T: 'static> Channel<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            next_id: AtomicU64::new(1),
            registry: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Register `callback`; it is notified after every earlier subscriber.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let subscriber = Arc::new(Subscriber {
            id,
            active: AtomicBool::new(true),
            callback: Arc::new(callback),
        });
        lock(&self.registry).push(Arc::clone(&subscriber));
        debug!(channel = self.name, id, "subscribed");

        let registry: Weak<Registry<T>> = Arc::downgrade(&self.registry);
        Subscription::new(self.name, move || {
            subscriber.active.store(false, Ordering::SeqCst);
            if let Some(registry) = registry.upgrade() {
                lock(&registry).retain(|s| s.id != subscriber.id);
            }
        })
    }

    /// Deliver `payload` to every registered callback. Returns how many ran to completion.
    pub fn publish(&self, payload: &T) -> usize {
        let snapshot: Vec<Arc<Subscriber<T>>> = lock(&self.registry).clone();
        let mut delivered = 0;
        for subscriber in snapshot {
            if !subscriber.active.load(Ordering::SeqCst) {
                continue;
            }
            let callback = Arc::clone(&subscriber.callback);
            match catch_unwind(AssertUnwindSafe(|| callback(payload))) {
                Ok(()) => delivered += 1,
                Err(panic) => {
                    error!(
                        channel = self.name,
                        id = subscriber.id,
                        panic = %panic_message(panic.as_ref()),
                        "voice {} callback error",
                        self.name
                    );
                }
            }
        }
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).len()
    }
}

/// Capability to deregister one callback. Calling [`Subscription::unsubscribe`]
/// more than once is harmless; dropping the handle leaves the callback registered.
#[must_use = "keep the Subscription to be able to unsubscribe"]
pub struct Subscription {
    channel: &'static str,
    remover: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    fn new(channel: &'static str, remover: impl FnOnce() + Send + 'static) -> Self {
        Self {
            channel,
            remover: Mutex::new(Some(Box::new(remover))),
        }
    }

    /// Remove the callback. Returns `true` only for the call that actually removed it.
    pub fn unsubscribe(&self) -> bool {
        let remover = lock(&self.remover).take();
        match remover {
            Some(remove) => {
                remove();
                debug!(channel = self.channel, "unsubscribed");
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        lock(&self.remover).is_some()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("active", &self.is_active())
            .finish()
    }
}

/// The voice event bus: filter sets, actions, lifecycle state, raw transcripts
/// and the "clear filters" signal.
pub struct EventBus {
    filters: Channel<VoiceFilters>,
    actions: Channel<VoiceAction>,
    state: Channel<VoiceState>,
    text: Channel<String>,
    filters_cleared: Channel<()>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            filters: Channel::new("filters"),
            actions: Channel::new("actions"),
            state: Channel::new("state"),
            text: Channel::new("text"),
            filters_cleared: Channel::new("filters_cleared"),
        }
    }

    pub fn filters(&self) -> &Channel<VoiceFilters> {
        &self.filters
    }

    pub fn actions(&self) -> &Channel<VoiceAction> {
        &self.actions
    }

    pub fn state(&self) -> &Channel<VoiceState> {
        &self.state
    }

    pub fn text(&self) -> &Channel<String> {
        &self.text
    }

    pub fn filters_cleared(&self) -> &Channel<()> {
        &self.filters_cleared
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Box<dyn Fn(&u32) + Send + Sync>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log2 = Arc::clone(&log);
        let make = move |tag: &str| {
            let log = Arc::clone(&log2);
            let tag = tag.to_string();
            Box::new(move |v: &u32| log.lock().unwrap().push(format!("{tag}:{v}")))
                as Box<dyn Fn(&u32) + Send + Sync>
        };
        (log, make)
    }

    #[test]
    fn delivers_in_subscription_order() {
        let channel = Channel::<u32>::new("test");
        let (log, make) = recorder();
        let _a = channel.subscribe(make("a"));
        let _b = channel.subscribe(make("b"));
        let _c = channel.subscribe(make("c"));

        assert_eq!(channel.publish(&7), 3);
        assert_eq!(*log.lock().unwrap(), vec!["a:7", "b:7", "c:7"]);
    }

    #[test]
    fn panicking_callback_is_isolated() {
        let channel = Channel::<u32>::new("test");
        let (log, make) = recorder();
        let _a = channel.subscribe(make("a"));
        let _boom = channel.subscribe(|_| panic!("subscriber failure"));
        let _c = channel.subscribe(make("c"));

        assert_eq!(channel.publish(&1), 2);
        assert_eq!(*log.lock().unwrap(), vec!["a:1", "c:1"]);
        // the channel keeps working afterwards
        assert_eq!(channel.publish(&2), 2);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let channel = Channel::<u32>::new("test");
        let (log, make) = recorder();
        let sub = channel.subscribe(make("a"));

        assert!(sub.unsubscribe());
        assert!(!sub.unsubscribe());
        assert!(!sub.is_active());
        assert_eq!(channel.subscriber_count(), 0);
        assert_eq!(channel.publish(&1), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn unsubscribing_a_later_callback_during_publish_skips_it() {
        let channel = Arc::new(Channel::<u32>::new("test"));
        let (log, make) = recorder();
        let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let victim_in_cb = Arc::clone(&victim);
        let _first = channel.subscribe(move |_| {
            if let Some(sub) = victim_in_cb.lock().unwrap().as_ref() {
                sub.unsubscribe();
            }
        });
        let _second = channel.subscribe(make("second"));
        *victim.lock().unwrap() = Some(channel.subscribe(make("victim")));

        assert_eq!(channel.publish(&5), 2);
        assert_eq!(*log.lock().unwrap(), vec!["second:5"]);
    }

    #[test]
    fn unsubscribing_self_during_publish_does_not_disturb_others() {
        let channel = Arc::new(Channel::<u32>::new("test"));
        let (log, make) = recorder();
        let _before = channel.subscribe(make("before"));

        let own: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let own_in_cb = Arc::clone(&own);
        *own.lock().unwrap() = Some(channel.subscribe(move |_| {
            if let Some(sub) = own_in_cb.lock().unwrap().as_ref() {
                sub.unsubscribe();
            }
        }));
        let _after = channel.subscribe(make("after"));

        channel.publish(&1);
        channel.publish(&2);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["before:1", "after:1", "before:2", "after:2"]
        );
        assert_eq!(channel.subscriber_count(), 2);
    }

    #[test]
    fn subscribing_during_publish_takes_effect_next_time() {
        let channel = Arc::new(Channel::<u32>::new("test"));
        let (log, make) = recorder();
        let late: Arc<Mutex<Vec<Subscription>>> = Arc::new(Mutex::new(Vec::new()));

        let channel_in_cb = Arc::clone(&channel);
        let late_in_cb = Arc::clone(&late);
        let make_late = make("late");
        let make_late = Arc::new(make_late);
        let _adder = channel.subscribe(move |_| {
            let mut late = late_in_cb.lock().unwrap();
            if late.is_empty() {
                let cb = Arc::clone(&make_late);
                late.push(channel_in_cb.subscribe(move |v| cb(v)));
            }
        });

        channel.publish(&1);
        assert!(log.lock().unwrap().is_empty());
        channel.publish(&2);
        assert_eq!(*log.lock().unwrap(), vec!["late:2"]);
    }

    #[test]
    fn bus_channels_are_independent() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        let _s = bus.state().subscribe(move |s| seen2.lock().unwrap().push(*s));

        bus.text().publish(&"борщ".to_string());
        bus.state().publish(&VoiceState::Listening);

        assert_eq!(*seen.lock().unwrap(), vec![VoiceState::Listening]);
        assert_eq!(bus.filters().subscriber_count(), 0);
        assert_eq!(bus.filters_cleared().name(), "filters_cleared");
    }
}
