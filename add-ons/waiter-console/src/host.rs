//! Terminal stand-ins for the collaborators around the voice core.
//!
//! Typed lines play the role of recognized speech and printed lines play
//! the role of synthesis, navigation and the cart. Engine callbacks are
//! posted to the main loop as [`EngineEvent`]s, the way a real engine
//! would call back asynchronously.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use tokio::sync::mpsc::UnboundedSender;
use waiter_voice::{
    AuthState, CartStore, CheckoutConfirmSlot, CheckoutRegistration, DishRecord, Navigator,
    SpeechRecognizer, SpeechSynthesizer, UtteranceId, VoiceControl, VoiceError, VoiceResult,
};

/// Callbacks from the console engines.
#[derive(Debug)]
pub enum EngineEvent {
    RecognitionStart,
    RecognitionEnd,
    SynthesisEnd(UtteranceId),
}

pub struct ConsoleRecognizer {
    listening: AtomicBool,
    events: UnboundedSender<EngineEvent>,
}

impl ConsoleRecognizer {
    pub fn new(events: UnboundedSender<EngineEvent>) -> Self {
        Self {
            listening: AtomicBool::new(false),
            events,
        }
    }

    /// Close the current session if one is open. A typed line is only heard
    /// while listening.
    pub fn take_session(&self) -> bool {
        self.listening.swap(false, Ordering::SeqCst)
    }
}

impl SpeechRecognizer for ConsoleRecognizer {
    fn configure(&self, locale: &str) {
        tracing::debug!(locale, "console recognizer configured");
    }

    fn start(&self) -> VoiceResult<()> {
        if self.listening.swap(true, Ordering::SeqCst) {
            return Err(VoiceError::Recognition("already started".to_string()));
        }
        let _ = self.events.send(EngineEvent::RecognitionStart);
        Ok(())
    }

    fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            let _ = self.events.send(EngineEvent::RecognitionEnd);
        }
    }
}

pub struct ConsoleSynthesizer {
    events: UnboundedSender<EngineEvent>,
}

impl ConsoleSynthesizer {
    pub fn new(events: UnboundedSender<EngineEvent>) -> Self {
        Self { events }
    }
}

impl SpeechSynthesizer for ConsoleSynthesizer {
    fn speak(&self, id: UtteranceId, text: &str, _locale: &str) -> VoiceResult<()> {
        println!("🤵 {text}");
        self.events
            .send(EngineEvent::SynthesisEnd(id))
            .map_err(|e| VoiceError::Synthesis(e.to_string()))
    }

    fn cancel_all(&self) {}
}

/// Router, cart and session of the console "app".
pub struct ConsoleApp {
    path: Mutex<String>,
    cart: Mutex<Vec<DishRecord>>,
    signed_in: bool,
    checkout: OnceLock<(Arc<CheckoutConfirmSlot>, VoiceControl)>,
    mounted: Mutex<Option<CheckoutRegistration>>,
}

impl ConsoleApp {
    pub fn new(signed_in: bool) -> Arc<Self> {
        Arc::new(Self {
            path: Mutex::new("/".to_string()),
            cart: Mutex::new(Vec::new()),
            signed_in,
            checkout: OnceLock::new(),
            mounted: Mutex::new(None),
        })
    }

    /// Connect the checkout page to the orchestrator's confirmation slot.
    pub fn attach_checkout(&self, slot: Arc<CheckoutConfirmSlot>, control: VoiceControl) {
        let _ = self.checkout.set((slot, control));
    }

    fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
        m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn cart_summary(&self) -> String {
        let cart = Self::lock(&self.cart);
        let names: Vec<&str> = cart.iter().map(|d| d.name.as_str()).collect();
        format!("[{}]", names.join(", "))
    }

    // The checkout page registers its trigger while it is shown.
    fn remount_checkout(self: &Arc<Self>, path: &str) {
        let Some((slot, control)) = self.checkout.get() else {
            return;
        };
        let mut mounted = Self::lock(&self.mounted);
        if let Some(previous) = mounted.take() {
            previous.unregister();
        }
        if path == "/checkout" {
            let app = Arc::downgrade(self);
            let control = control.clone();
            *mounted = Some(slot.register(move || {
                if let Some(app) = app.upgrade() {
                    let items = std::mem::take(&mut *Self::lock(&app.cart));
                    println!("🧾 order placed: {} item(s)", items.len());
                    control.say("Замовлення оформлено. Дякую!");
                }
            }));
        }
    }
}

/// Navigator handle; keeps the app reachable for checkout mounting.
pub struct ConsoleRouter(pub Arc<ConsoleApp>);

impl Navigator for ConsoleRouter {
    fn go_to(&self, path: &str) {
        *ConsoleApp::lock(&self.0.path) = path.to_string();
        println!("🧭 {path}");
        self.0.remount_checkout(path);
    }

    fn current_path(&self) -> Option<String> {
        Some(ConsoleApp::lock(&self.0.path).clone())
    }
}

impl CartStore for ConsoleApp {
    fn add(&self, dish: &DishRecord) {
        Self::lock(&self.cart).push(dish.clone());
        println!("🛒 {}", self.cart_summary());
    }

    fn remove(&self, dish_id: u64) {
        {
            let mut cart = Self::lock(&self.cart);
            if let Some(i) = cart.iter().position(|d| d.id == dish_id) {
                cart.remove(i);
            }
        }
        println!("🛒 {}", self.cart_summary());
    }

    fn clear(&self) {
        Self::lock(&self.cart).clear();
        println!("🛒 []");
    }
}

impl AuthState for ConsoleApp {
    fn is_authenticated(&self) -> bool {
        self.signed_in
    }
}
