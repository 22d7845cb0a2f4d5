//! # Waiter Voice - voice commands for the restaurant waiter
//!
//! Turns recognized speech into menu filters or application actions,
//! keeps speech recognition and speech synthesis from talking over each
//! other, and resolves spoken dish names against the catalog.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        Voice Assistant                          │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐         │
//! │  │  Recognizer  │→ │ Intent Parser│→ │  Event Bus   │         │
//! │  │ (capability) │  │ (rule list)  │  │ (5 channels) │         │
//! │  └──────────────┘  └──────────────┘  └──────────────┘         │
//! │         ↑                                  ↓         ↓          │
//! │  ┌──────────────┐                 ┌──────────────┐ filters     │
//! │  │ Synthesizer  │←── say(reply) ──│ Orchestrator │ consumer    │
//! │  │ (capability) │                 │ (fuzzy match)│             │
//! │  └──────────────┘                 └──────────────┘             │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The host constructs one [`EventBus`], hands it to a [`VoiceAssistant`]
//! and a [`VoiceOrchestrator`], and forwards engine events to the
//! assistant's `on_*` entry points.

pub mod assistant;
pub mod bus;
pub mod capability;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fuzzy;
pub mod intent;
pub mod orchestrator;
pub mod phrases;
pub mod signal;
pub mod text;

pub use assistant::VoiceAssistant;
pub use bus::{Channel, EventBus, Subscription};
pub use capability::{
    Scheduler, SpeechRecognizer, SpeechSynthesizer, TimerGuard, TimerTask, TokioScheduler,
    UtteranceId, VoiceControl,
};
pub use catalog::{CatalogSnapshot, DishCatalog, DishQuery, DishRecord, StaticCatalog};
pub use config::VoiceConfig;
pub use error::{VoiceError, VoiceResult};
pub use fuzzy::{DishMatch, FuzzyMatcher, MatchKind};
pub use intent::{parse, Intent};
pub use orchestrator::{
    AuthState, CartStore, CheckoutConfirmSlot, CheckoutRegistration, Navigator, VoiceOrchestrator,
};
pub use signal::{Category, DishTag, SortOrder, VoiceAction, VoiceFilters, VoiceState, WaiterPose};
