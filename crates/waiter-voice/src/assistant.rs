//! Speech lifecycle controller.
//!
//! Owns the recognition/synthesis state machine:
//!
//! ```text
//!   idle ──start event──▶ listening ──transcript──▶ thinking ──reply──▶ speaking
//!    ▲                        │                        │                  │
//!    │                        └──fault──▶ error        └──no reply──┐     │
//!    └──────────── restart (armed) ◀─────────┴─────────────────────┴─────┘
//! ```
//!
//! `armed` is separate from the state: it records that the user asked for
//! voice control, and only while armed is recognition restarted after the
//! controller drops back to idle or error.
//!
//! While an utterance is being synthesized recognition is stopped, and
//! recognition start/end/error events are absorbed without leaving
//! `speaking`. A new reply cancels the current one.
//!
//! Each transition is computed under the lock as a list of effects, which
//! are executed after the lock is released. Bus subscribers and engines may
//! therefore call back into the controller (`say`, `stop`) from inside a
//! publication.

use crate::bus::EventBus;
use crate::capability::{
    Scheduler, SpeechRecognizer, SpeechSynthesizer, TimerGuard, UtteranceId, VoiceControl,
};
use crate::config::VoiceConfig;
use crate::error::{VoiceError, VoiceResult};
use crate::intent::{self, Intent};
use crate::phrases;
use crate::signal::VoiceState;
use crate::text::{is_blank, normalize_transcript};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

struct PendingRestart {
    generation: u64,
    guard: Option<TimerGuard>,
}

struct Inner {
    state: VoiceState,
    armed: bool,
    recognizing: bool,
    speaking: Option<UtteranceId>,
    restart: Option<PendingRestart>,
    restart_generation: u64,
    next_utterance: u64,
    last_transcript: Option<String>,
}

impl Inner {
    fn set_state(&mut self, state: VoiceState, fx: &mut Vec<Effect>) {
        if self.state != state {
            self.state = state;
            fx.push(Effect::Publish(state));
        }
    }

    fn cancel_restart(&mut self, fx: &mut Vec<Effect>) {
        if let Some(pending) = self.restart.take() {
            if let Some(guard) = pending.guard {
                fx.push(Effect::CancelTimer(guard));
            }
        }
    }

    /// Queue a single recognition restart. Ignored while disarmed, while
    /// speaking, or when one is already pending.
    fn schedule_restart(&mut self, delay: Duration, fx: &mut Vec<Effect>) {
        if !self.armed || self.speaking.is_some() || self.restart.is_some() {
            return;
        }
        self.restart_generation += 1;
        let generation = self.restart_generation;
        self.restart = Some(PendingRestart {
            generation,
            guard: None,
        });
        fx.push(Effect::Schedule { generation, delay });
    }
}

enum Effect {
    Publish(VoiceState),
    StartRecognition,
    StopRecognition,
    CancelSpeech,
    Speak { id: UtteranceId, text: String },
    Schedule { generation: u64, delay: Duration },
    CancelTimer(TimerGuard),
}

struct Shared {
    bus: Arc<EventBus>,
    config: VoiceConfig,
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    scheduler: Arc<dyn Scheduler>,
    inner: Mutex<Inner>,
}

/// The speech lifecycle controller. Cloning yields another handle to the
/// same controller.
#[derive(Clone)]
pub struct VoiceAssistant {
    shared: Arc<Shared>,
}

impl VoiceAssistant {
    /// A missing recognizer leaves the controller permanently idle; a missing
    /// synthesizer turns every reply into an immediate return to idle.
    pub fn new(
        bus: Arc<EventBus>,
        config: VoiceConfig,
        recognizer: Option<Arc<dyn SpeechRecognizer>>,
        synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        match &recognizer {
            Some(r) => r.configure(&config.locale),
            None => warn!("🎤 Speech recognition unavailable, voice control stays idle"),
        }
        if synthesizer.is_none() {
            warn!("🔈 Speech synthesis unavailable, replies will not be spoken");
        }
        info!(locale = %config.locale, "🎙️ Voice assistant ready");

        Self {
            shared: Arc::new(Shared {
                bus,
                config,
                recognizer,
                synthesizer,
                scheduler,
                inner: Mutex::new(Inner {
                    state: VoiceState::Idle,
                    armed: false,
                    recognizing: false,
                    speaking: None,
                    restart: None,
                    restart_generation: 0,
                    next_utterance: 0,
                    last_transcript: None,
                }),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn upgrade(weak: &Weak<Shared>) -> Option<Self> {
        weak.upgrade().map(|shared| Self { shared })
    }

    // -- observers ----------------------------------------------------------

    pub fn state(&self) -> VoiceState {
        self.lock().state
    }

    pub fn is_armed(&self) -> bool {
        self.lock().armed
    }

    pub fn is_speaking(&self) -> bool {
        self.lock().speaking.is_some()
    }

    pub fn restart_pending(&self) -> bool {
        self.lock().restart.is_some()
    }

    /// Last accepted transcript, normalized.
    pub fn last_transcript(&self) -> Option<String> {
        self.lock().last_transcript.clone()
    }

    pub fn is_available(&self) -> bool {
        self.shared.recognizer.is_some()
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.shared.config
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.shared.bus
    }

    /// Start/stop/say handle that does not keep the controller alive.
    pub fn control(&self) -> VoiceControl {
        let (on_start, on_stop, on_say) = (
            Arc::downgrade(&self.shared),
            Arc::downgrade(&self.shared),
            Arc::downgrade(&self.shared),
        );
        VoiceControl::new(
            move || {
                if let Some(va) = Self::upgrade(&on_start) {
                    va.start();
                }
            },
            move || {
                if let Some(va) = Self::upgrade(&on_stop) {
                    va.stop();
                }
            },
            move |text| {
                if let Some(va) = Self::upgrade(&on_say) {
                    va.say(text);
                }
            },
        )
    }

    // -- user commands ------------------------------------------------------

    /// Arm voice control and begin listening.
    pub fn start(&self) {
        if let Err(error) = self.require_recognizer() {
            warn!(%error, "🎤 Cannot start voice control");
            return;
        }
        let mut fx = Vec::new();
        {
            let mut inner = self.lock();
            inner.armed = true;
            inner.cancel_restart(&mut fx);
            if inner.speaking.take().is_some() {
                fx.push(Effect::CancelSpeech);
                inner.set_state(VoiceState::Idle, &mut fx);
            }
            fx.push(Effect::StartRecognition);
        }
        info!("🎤 Voice control armed");
        self.apply(fx);
    }

    fn require_recognizer(&self) -> VoiceResult<&Arc<dyn SpeechRecognizer>> {
        self.shared
            .recognizer
            .as_ref()
            .ok_or(VoiceError::CapabilityUnavailable("speech recognition"))
    }

    /// Disarm, silence, stop listening and return to idle. Leaves no restart pending.
    pub fn stop(&self) {
        let mut fx = Vec::new();
        {
            let mut inner = self.lock();
            inner.armed = false;
            inner.cancel_restart(&mut fx);
            inner.speaking = None;
            inner.recognizing = false;
            fx.push(Effect::CancelSpeech);
            fx.push(Effect::StopRecognition);
            inner.set_state(VoiceState::Idle, &mut fx);
        }
        info!("🔇 Voice control disarmed");
        self.apply(fx);
    }

    /// Speak `text`, replacing whatever is being spoken.
    pub fn say(&self, text: &str) {
        let mut fx = Vec::new();
        {
            let mut inner = self.lock();
            self.begin_speaking(&mut inner, text, &mut fx);
        }
        self.apply(fx);
    }

    fn begin_speaking(&self, inner: &mut Inner, text: &str, fx: &mut Vec<Effect>) {
        let text = text.trim();
        if text.is_empty() || self.shared.synthesizer.is_none() {
            if !text.is_empty() {
                debug!(text, "reply dropped, no synthesizer");
            }
            if inner.speaking.is_none() {
                inner.set_state(VoiceState::Idle, fx);
                inner.schedule_restart(self.shared.config.restart_delay(), fx);
            }
            return;
        }

        if inner.speaking.take().is_some() {
            fx.push(Effect::CancelSpeech);
        }
        inner.cancel_restart(fx);
        if inner.recognizing {
            inner.recognizing = false;
            fx.push(Effect::StopRecognition);
        }
        inner.next_utterance += 1;
        let id = UtteranceId(inner.next_utterance);
        inner.speaking = Some(id);
        inner.set_state(VoiceState::Speaking, fx);
        fx.push(Effect::Speak {
            id,
            text: text.to_string(),
        });
    }

    // -- recognition events -------------------------------------------------

    pub fn on_recognition_start(&self) {
        let mut fx = Vec::new();
        {
            let mut inner = self.lock();
            inner.recognizing = true;
            if !inner.armed {
                debug!("recognition started while disarmed, stopping it");
                inner.recognizing = false;
                fx.push(Effect::StopRecognition);
            } else if inner.speaking.is_some() {
                debug!("recognition started while speaking, stopping it");
                inner.recognizing = false;
                fx.push(Effect::StopRecognition);
            } else {
                inner.cancel_restart(&mut fx);
                inner.set_state(VoiceState::Listening, &mut fx);
            }
        }
        self.apply(fx);
    }

    pub fn on_recognition_end(&self) {
        let mut fx = Vec::new();
        {
            let mut inner = self.lock();
            inner.recognizing = false;
            if inner.speaking.is_some() {
                debug!("recognition ended while speaking");
            } else if inner.state == VoiceState::Thinking
                || (inner.state == VoiceState::Error && inner.restart.is_some())
            {
                // the utterance or the pending error restart decides what comes next
            } else {
                inner.set_state(VoiceState::Idle, &mut fx);
                inner.schedule_restart(self.shared.config.restart_delay(), &mut fx);
            }
        }
        self.apply(fx);
    }

    pub fn on_recognition_error(&self, error: VoiceError) {
        let mut fx = Vec::new();
        {
            let mut inner = self.lock();
            inner.recognizing = false;
            if inner.speaking.is_some() {
                debug!(%error, "recognition error while speaking");
            } else {
                warn!(%error, armed = inner.armed, "🎤 Recognition fault");
                inner.set_state(VoiceState::Error, &mut fx);
                if inner.armed {
                    inner.schedule_restart(self.shared.config.error_restart_delay(), &mut fx);
                } else {
                    inner.set_state(VoiceState::Idle, &mut fx);
                }
            }
        }
        self.apply(fx);
    }

    /// A final transcript from the recognizer.
    pub fn on_result(&self, transcript: &str) {
        let text = normalize_transcript(transcript);
        let mut fx = Vec::new();
        {
            let mut inner = self.lock();
            if !inner.armed {
                debug!("transcript ignored while disarmed");
                return;
            }
            if inner.speaking.is_some() {
                debug!("transcript ignored while speaking");
                return;
            }
            if is_blank(&text) {
                return;
            }
            inner.last_transcript = Some(text.clone());
            inner.set_state(VoiceState::Thinking, &mut fx);
        }
        self.apply(fx);

        info!(text = %text, "🗣️ Heard");
        self.shared.bus.text().publish(&text);

        let intent = intent::parse(&text);
        match &intent {
            Intent::Filters { filters, .. } => {
                self.shared.bus.filters().publish(filters);
            }
            Intent::Actions { actions, .. } => {
                for action in actions {
                    self.shared.bus.actions().publish(action);
                }
            }
            Intent::Unknown => debug!(text = %text, "command not understood"),
        }

        let reply = match &intent {
            Intent::Unknown => Some(phrases::NOT_UNDERSTOOD),
            other => other.reply(),
        };
        self.finish_turn(reply);
    }

    fn finish_turn(&self, reply: Option<&str>) {
        let mut fx = Vec::new();
        {
            let mut inner = self.lock();
            if inner.speaking.is_some() {
                // a subscriber already answered with the actual outcome
                debug!("reply superseded by dispatch");
            } else {
                self.begin_speaking(&mut inner, reply.unwrap_or_default(), &mut fx);
            }
        }
        self.apply(fx);
    }

    // -- synthesis events ---------------------------------------------------

    pub fn on_synthesis_end(&self, id: UtteranceId) {
        self.finish_utterance(id, None);
    }

    pub fn on_synthesis_error(&self, id: UtteranceId, error: VoiceError) {
        self.finish_utterance(id, Some(error));
    }

    fn finish_utterance(&self, id: UtteranceId, error: Option<VoiceError>) {
        let mut fx = Vec::new();
        {
            let mut inner = self.lock();
            if inner.speaking != Some(id) {
                debug!(%id, "stale synthesis event");
                return;
            }
            if let Some(error) = error {
                warn!(%id, %error, "🔈 Synthesis failed");
            }
            inner.speaking = None;
            inner.set_state(VoiceState::Idle, &mut fx);
            inner.schedule_restart(self.shared.config.restart_delay(), &mut fx);
        }
        self.apply(fx);
    }

    // -- timers -------------------------------------------------------------

    fn arm_timer(&self, generation: u64, delay: Duration) {
        let weak = Arc::downgrade(&self.shared);
        let guard = self.shared.scheduler.schedule(
            delay,
            Box::new(move || {
                if let Some(va) = Self::upgrade(&weak) {
                    va.restart_due(generation);
                }
            }),
        );

        let stale = {
            let mut inner = self.lock();
            match inner.restart.as_mut() {
                Some(pending) if pending.generation == generation => {
                    pending.guard = Some(guard);
                    None
                }
                _ => Some(guard),
            }
        };
        if let Some(guard) = stale {
            guard.cancel();
        }
    }

    fn restart_due(&self, generation: u64) {
        let mut fx = Vec::new();
        {
            let mut inner = self.lock();
            match &inner.restart {
                Some(pending) if pending.generation == generation => {}
                _ => return,
            }
            inner.restart = None;
            if !inner.armed || inner.speaking.is_some() {
                return;
            }
            if inner.state == VoiceState::Error {
                inner.set_state(VoiceState::Idle, &mut fx);
            }
            fx.push(Effect::StartRecognition);
        }
        debug!("🔁 Restarting recognition");
        self.apply(fx);
    }

    // -- effects ------------------------------------------------------------

    fn apply(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Publish(state) => {
                    debug!(%state, "voice state");
                    self.shared.bus.state().publish(&state);
                }
                Effect::StartRecognition => {
                    if let Some(recognizer) = &self.shared.recognizer {
                        if let Err(error) = recognizer.start() {
                            debug!(%error, "recognizer start ignored");
                        }
                    }
                }
                Effect::StopRecognition => {
                    if let Some(recognizer) = &self.shared.recognizer {
                        recognizer.stop();
                    }
                }
                Effect::CancelSpeech => {
                    if let Some(synthesizer) = &self.shared.synthesizer {
                        synthesizer.cancel_all();
                    }
                }
                Effect::Speak { id, text } => {
                    let Some(synthesizer) = &self.shared.synthesizer else {
                        self.finish_utterance(id, None);
                        continue;
                    };
                    debug!(%id, text = %text, "speaking");
                    if let Err(error) = synthesizer.speak(id, &text, &self.shared.config.locale) {
                        self.finish_utterance(id, Some(error));
                    }
                }
                Effect::Schedule { generation, delay } => self.arm_timer(generation, delay),
                Effect::CancelTimer(guard) => guard.cancel(),
            }
        }
    }
}

impl std::fmt::Debug for VoiceAssistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("VoiceAssistant")
            .field("state", &inner.state)
            .field("armed", &inner.armed)
            .field("speaking", &inner.speaking)
            .finish()
    }
}
