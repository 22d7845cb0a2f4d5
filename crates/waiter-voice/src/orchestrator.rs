//! Voice Orchestrator - turns voice actions into application side effects
//!
//! Subscribes to the action channel and performs navigation, cart and
//! checkout effects through capabilities supplied by the host. Dish names
//! from `cart_add` / `cart_remove` are resolved against a catalog snapshot
//! taken once at start.

use crate::bus::{EventBus, Subscription};
use crate::capability::VoiceControl;
use crate::catalog::{CatalogSnapshot, DishCatalog, DishRecord};
use crate::config::VoiceConfig;
use crate::fuzzy::FuzzyMatcher;
use crate::phrases;
use crate::signal::VoiceAction;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, Weak};
use tracing::{debug, info, warn};

/// Page navigation.
pub trait Navigator: Send + Sync {
    fn go_to(&self, path: &str);

    /// Route currently shown, when the host knows it.
    fn current_path(&self) -> Option<String> {
        None
    }
}

/// Cart mutation.
pub trait CartStore: Send + Sync {
    fn add(&self, dish: &DishRecord);
    fn remove(&self, dish_id: u64);
    fn clear(&self);
}

/// Whether a user is signed in.
pub trait AuthState: Send + Sync {
    fn is_authenticated(&self) -> bool;
}

type Trigger = Arc<dyn Fn() + Send + Sync>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Holds the checkout-confirmation trigger of whichever checkout surface is
/// currently mounted. At most one trigger is registered at a time.
#[derive(Default)]
pub struct CheckoutConfirmSlot {
    next_id: AtomicU64,
    current: Mutex<Option<(u64, Trigger)>>,
}

impl CheckoutConfirmSlot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Install `trigger`, replacing any previous one.
    pub fn register(
        self: &Arc<Self>,
        trigger: impl Fn() + Send + Sync + 'static,
    ) -> CheckoutRegistration {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        *lock(&self.current) = Some((id, Arc::new(trigger)));
        CheckoutRegistration {
            slot: Arc::downgrade(self),
            id,
        }
    }

    pub fn is_registered(&self) -> bool {
        lock(&self.current).is_some()
    }

    /// Run the registered trigger. Returns `false` when none is registered.
    pub fn trigger(&self) -> bool {
        let trigger = lock(&self.current).as_ref().map(|(_, t)| Arc::clone(t));
        match trigger {
            Some(trigger) => {
                trigger();
                true
            }
            None => false,
        }
    }
}

/// Returned by [`CheckoutConfirmSlot::register`].
#[must_use = "unregister when the checkout surface goes away"]
pub struct CheckoutRegistration {
    slot: Weak<CheckoutConfirmSlot>,
    id: u64,
}

impl CheckoutRegistration {
    /// Clear the slot if it still holds this registration's trigger.
    pub fn unregister(self) {
        if let Some(slot) = self.slot.upgrade() {
            let mut current = lock(&slot.current);
            if matches!(current.as_ref(), Some((id, _)) if *id == self.id) {
                *current = None;
            }
        }
    }
}

/// Dispatches voice actions for the lifetime of the application.
pub struct VoiceOrchestrator {
    bus: Arc<EventBus>,
    config: VoiceConfig,
    matcher: FuzzyMatcher,
    control: VoiceControl,
    navigator: Arc<dyn Navigator>,
    cart: Arc<dyn CartStore>,
    auth: Arc<dyn AuthState>,
    checkout: Arc<CheckoutConfirmSlot>,
    snapshot: OnceLock<CatalogSnapshot>,
    subscription: Mutex<Option<Subscription>>,
}

impl VoiceOrchestrator {
    pub fn new(
        bus: Arc<EventBus>,
        config: VoiceConfig,
        control: VoiceControl,
        navigator: Arc<dyn Navigator>,
        cart: Arc<dyn CartStore>,
        auth: Arc<dyn AuthState>,
    ) -> Arc<Self> {
        Arc::new(Self {
            bus,
            matcher: FuzzyMatcher::new(config.match_threshold),
            config,
            control,
            navigator,
            cart,
            auth,
            checkout: CheckoutConfirmSlot::new(),
            snapshot: OnceLock::new(),
            subscription: Mutex::new(None),
        })
    }

    /// Slot the checkout surface registers its confirmation trigger in.
    pub fn checkout_slot(&self) -> Arc<CheckoutConfirmSlot> {
        Arc::clone(&self.checkout)
    }

    /// Load the catalog snapshot and start listening for actions.
    ///
    /// A failing catalog leaves the snapshot empty: every dish name then
    /// resolves to "not found", everything else keeps working.
    pub async fn start(self: &Arc<Self>, catalog: &dyn DishCatalog) {
        info!("🚀 Starting Voice Orchestrator");
        let snapshot = match CatalogSnapshot::load(catalog).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Catalog unavailable, dish names will not resolve");
                CatalogSnapshot::default()
            }
        };
        if self.snapshot.set(snapshot).is_err() {
            debug!("catalog snapshot already loaded");
        }

        let mut subscription = lock(&self.subscription);
        if subscription.is_some() {
            return;
        }
        let weak = Arc::downgrade(self);
        *subscription = Some(self.bus.actions().subscribe(move |action| {
            if let Some(orchestrator) = weak.upgrade() {
                orchestrator.dispatch(action);
            }
        }));
        info!("✅ Voice Orchestrator started");
    }

    /// Stop listening for actions.
    pub fn shutdown(&self) {
        if let Some(subscription) = lock(&self.subscription).take() {
            subscription.unsubscribe();
            info!("🛑 Voice Orchestrator stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.subscription).is_some()
    }

    pub fn snapshot(&self) -> &[DishRecord] {
        self.snapshot.get().map(CatalogSnapshot::dishes).unwrap_or_default()
    }

    /// Perform the side effect of one action.
    pub fn dispatch(&self, action: &VoiceAction) {
        debug!(action = action.kind(), "dispatching voice action");
        match action {
            VoiceAction::StopAll => self.control.stop(),
            VoiceAction::Help => {}
            VoiceAction::Navigate { path } => {
                if self.config.is_known_route(path) {
                    self.navigator.go_to(path);
                } else {
                    warn!(path = %path, "navigation outside the allow-list ignored");
                }
            }
            VoiceAction::CheckoutOpen => self.navigator.go_to(&self.config.checkout_route),
            VoiceAction::CheckoutConfirm => self.confirm_checkout(),
            VoiceAction::CartClear => {
                self.cart.clear();
                self.control.say(phrases::CART_CLEARED);
            }
            VoiceAction::CartAdd { name } => {
                if let Some(dish) = self.resolve(name) {
                    self.cart.add(dish);
                    self.control.say(&phrases::added(&dish.name));
                }
            }
            VoiceAction::CartRemove { name } => {
                if let Some(dish) = self.resolve(name) {
                    self.cart.remove(dish.id);
                    self.control.say(&phrases::removed(&dish.name));
                }
            }
            VoiceAction::FiltersClear => {
                self.bus.filters_cleared().publish(&());
            }
        }
    }

    fn confirm_checkout(&self) {
        if !self.auth.is_authenticated() {
            self.navigator.go_to(&self.config.auth_route);
            self.control.say(phrases::SIGN_IN_REQUIRED);
            return;
        }
        let checkout = &self.config.checkout_route;
        if self.navigator.current_path().as_deref() != Some(checkout.as_str()) {
            self.navigator.go_to(checkout);
        }
        if !self.checkout.trigger() {
            debug!("no checkout surface mounted, confirmation skipped");
        }
    }

    /// Resolve a spoken name, speaking the not-found reply on a miss.
    fn resolve(&self, name: &str) -> Option<&DishRecord> {
        let dish = self.matcher.resolve(self.snapshot(), name);
        match dish {
            Some(dish) => debug!(query = name, dish = %dish.name, id = dish.id, "dish resolved"),
            None => {
                warn!(query = name, "🍽️ No dish matches");
                self.control.say(&phrases::not_found(name));
            }
        }
        dish
    }
}

impl Drop for VoiceOrchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
