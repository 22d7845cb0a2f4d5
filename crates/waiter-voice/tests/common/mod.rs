//! Scripted engine doubles and a fully wired voice stack for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use waiter_voice::{
    AuthState, CartStore, DishRecord, EventBus, Navigator, Scheduler, SpeechRecognizer,
    SpeechSynthesizer, StaticCatalog, Subscription, TokioScheduler, UtteranceId, VoiceAction,
    VoiceAssistant, VoiceConfig, VoiceFilters, VoiceOrchestrator, VoiceResult, VoiceState,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Recognizer that only records calls; tests deliver its events by hand.
#[derive(Default)]
pub struct ScriptedRecognizer {
    pub starts: Mutex<usize>,
    pub stops: Mutex<usize>,
}

impl ScriptedRecognizer {
    pub fn starts(&self) -> usize {
        *self.starts.lock().unwrap()
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn configure(&self, _locale: &str) {}

    fn start(&self) -> VoiceResult<()> {
        *self.starts.lock().unwrap() += 1;
        Ok(())
    }

    fn stop(&self) {
        *self.stops.lock().unwrap() += 1;
    }
}

#[derive(Default)]
pub struct ScriptedSynthesizer {
    pub spoken: Mutex<Vec<(UtteranceId, String)>>,
}

impl ScriptedSynthesizer {
    pub fn texts(&self) -> Vec<String> {
        self.spoken.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }

    pub fn last_id(&self) -> UtteranceId {
        self.spoken.lock().unwrap().last().expect("nothing spoken").0
    }
}

impl SpeechSynthesizer for ScriptedSynthesizer {
    fn speak(&self, id: UtteranceId, text: &str, _locale: &str) -> VoiceResult<()> {
        self.spoken.lock().unwrap().push((id, text.to_string()));
        Ok(())
    }

    fn cancel_all(&self) {}
}

/// Navigation, cart and auth stand-ins writing to one log.
#[derive(Default)]
pub struct Host {
    pub log: Mutex<Vec<String>>,
    pub signed_in: bool,
}

impl Host {
    pub fn entries(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl Navigator for Host {
    fn go_to(&self, path: &str) {
        self.log.lock().unwrap().push(format!("go:{path}"));
    }
}

impl CartStore for Host {
    fn add(&self, dish: &DishRecord) {
        self.log.lock().unwrap().push(format!("add:{}", dish.name));
    }

    fn remove(&self, dish_id: u64) {
        self.log.lock().unwrap().push(format!("remove:{dish_id}"));
    }

    fn clear(&self) {
        self.log.lock().unwrap().push("clear".to_string());
    }
}

impl AuthState for Host {
    fn is_authenticated(&self) -> bool {
        self.signed_in
    }
}

/// Everything published on the bus, in order.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub struct Stack {
    pub bus: Arc<EventBus>,
    pub assistant: VoiceAssistant,
    pub recognizer: Arc<ScriptedRecognizer>,
    pub synthesizer: Arc<ScriptedSynthesizer>,
    pub journal: Journal,
    pub filters: Arc<Mutex<Vec<VoiceFilters>>>,
    _subscriptions: Vec<Subscription>,
}

impl Stack {
    /// Controller on the current tokio runtime, with every bus channel journaled.
    pub fn new() -> Self {
        let bus = Arc::new(EventBus::new());
        let recognizer = Arc::new(ScriptedRecognizer::default());
        let synthesizer = Arc::new(ScriptedSynthesizer::default());
        let scheduler: Arc<dyn Scheduler> =
            Arc::new(TokioScheduler::current().expect("tokio runtime"));

        let assistant = VoiceAssistant::new(
            Arc::clone(&bus),
            VoiceConfig::default(),
            Some(recognizer.clone() as Arc<dyn SpeechRecognizer>),
            Some(synthesizer.clone() as Arc<dyn SpeechSynthesizer>),
            scheduler,
        );

        let journal: Journal = Arc::new(Mutex::new(Vec::new()));
        let filters = Arc::new(Mutex::new(Vec::new()));
        let (j1, j2, j3, j4) = (
            Arc::clone(&journal),
            Arc::clone(&journal),
            Arc::clone(&journal),
            Arc::clone(&journal),
        );
        let f = Arc::clone(&filters);
        let subscriptions = vec![
            bus.state()
                .subscribe(move |s: &VoiceState| j1.lock().unwrap().push(format!("state:{s}"))),
            bus.text()
                .subscribe(move |t: &String| j2.lock().unwrap().push(format!("text:{t}"))),
            bus.actions().subscribe(move |a: &VoiceAction| {
                j3.lock().unwrap().push(format!("action:{}", a.kind()))
            }),
            bus.filters().subscribe(move |fl: &VoiceFilters| {
                j4.lock().unwrap().push("filters".to_string());
                f.lock().unwrap().push(fl.clone());
            }),
        ];

        Self {
            bus,
            assistant,
            recognizer,
            synthesizer,
            journal,
            filters,
            _subscriptions: subscriptions,
        }
    }

    /// Attach an orchestrator over `dishes`.
    pub async fn with_orchestrator(
        &self,
        dishes: Vec<DishRecord>,
        host: Arc<Host>,
    ) -> Arc<VoiceOrchestrator> {
        let orchestrator = VoiceOrchestrator::new(
            Arc::clone(&self.bus),
            VoiceConfig::default(),
            self.assistant.control(),
            host.clone(),
            host.clone(),
            host,
        );
        orchestrator.start(&StaticCatalog::new(dishes)).await;
        orchestrator
    }

    pub fn states(&self) -> Vec<String> {
        self.journal
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.starts_with("state:"))
            .cloned()
            .collect()
    }

    pub fn clear_journal(&self) {
        self.journal.lock().unwrap().clear();
    }

    /// Arm and deliver the recognizer's start event.
    pub fn listen(&self) {
        self.assistant.start();
        self.assistant.on_recognition_start();
    }

    /// Deliver a transcript as one complete recognition session.
    pub fn hear(&self, transcript: &str) {
        self.assistant.on_result(transcript);
        self.assistant.on_recognition_end();
    }
}
