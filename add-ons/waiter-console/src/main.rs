//! Waiter Console
//!
//! Runs the voice core in a terminal. Lines typed while the waiter is
//! listening are treated as recognized speech.
//!
//! Commands: `:start` arms voice control, `:stop` disarms it, `:quit` exits.
//!
//! | Env | Description |
//! |-----|-------------|
//! | WAITER_CATALOG_PATH | JSON dish list; a small demo menu is used when unset. |
//! | WAITER_SIGNED_IN | `true` to act as a signed-in user. |
//! | WAITER_VOICE_* | See `waiter_voice::config`. |

mod host;

use anyhow::Context;
use host::{ConsoleApp, ConsoleRecognizer, ConsoleRouter, ConsoleSynthesizer, EngineEvent};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use waiter_voice::{
    DishCatalog, DishQuery, DishRecord, EventBus, Scheduler, SpeechRecognizer, SpeechSynthesizer, StaticCatalog,
    TokioScheduler, VoiceAssistant, VoiceConfig, VoiceOrchestrator, WaiterPose,
};

fn demo_menu() -> Vec<DishRecord> {
    vec![
        DishRecord::new(1, "Маргарита")
            .with_description("Томати, моцарела, базилік")
            .with_tags(["vegetarian"]),
        DishRecord::new(2, "Піца Пепероні")
            .with_description("Гостра салямі, моцарела")
            .with_tags(["spicy", "meat"]),
        DishRecord::new(3, "Борщ").with_description("Український борщ зі сметаною"),
        DishRecord::new(4, "Цезар з куркою")
            .with_description("Салат ромен, пармезан")
            .with_tags(["meat", "light"]),
        DishRecord::new(5, "Тірамісу").with_tags(["sweet"]),
        DishRecord::new(6, "Лимонад").with_tags(["cold"]),
    ]
}

fn load_catalog() -> anyhow::Result<StaticCatalog> {
    match std::env::var("WAITER_CATALOG_PATH") {
        Ok(path) => {
            let path = PathBuf::from(path);
            StaticCatalog::from_path(&path)
                .with_context(|| format!("loading catalog from {}", path.display()))
        }
        Err(_) => Ok(StaticCatalog::new(demo_menu())),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[waiter-console] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = VoiceConfig::load().context("loading voice config")?;
    let rendered = config.to_toml()?;
    tracing::debug!(config = %rendered, "effective voice config");
    let catalog = load_catalog()?;
    let signed_in = std::env::var("WAITER_SIGNED_IN")
        .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
        .unwrap_or(false);

    let bus = Arc::new(EventBus::new());
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let recognizer = Arc::new(ConsoleRecognizer::new(events_tx.clone()));
    let synthesizer = Arc::new(ConsoleSynthesizer::new(events_tx));
    let scheduler: Arc<dyn Scheduler> = Arc::new(TokioScheduler::current()?);

    let assistant = VoiceAssistant::new(
        Arc::clone(&bus),
        config.clone(),
        Some(recognizer.clone() as Arc<dyn SpeechRecognizer>),
        Some(synthesizer as Arc<dyn SpeechSynthesizer>),
        scheduler,
    );

    let app = ConsoleApp::new(signed_in);
    let orchestrator = VoiceOrchestrator::new(
        Arc::clone(&bus),
        config,
        assistant.control(),
        Arc::new(ConsoleRouter(Arc::clone(&app))),
        app.clone(),
        app.clone(),
    );
    app.attach_checkout(orchestrator.checkout_slot(), assistant.control());
    orchestrator.start(&catalog).await;

    // The menu page: turns filters into catalog queries, renders the waiter avatar.
    let (menu_tx, mut menu_queries) = mpsc::unbounded_channel::<DishQuery>();
    let _filters = bus.filters().subscribe({
        let menu_tx = menu_tx.clone();
        move |filters| {
            match serde_json::to_string(filters) {
                Ok(json) => println!("🔎 filters {json}"),
                Err(e) => tracing::warn!(error = %e, "filters not printable"),
            }
            let _ = menu_tx.send(DishQuery::from(filters));
        }
    });
    let _filters_cleared = bus.filters_cleared().subscribe(move |_| {
        println!("🔎 filters cleared");
        let _ = menu_tx.send(DishQuery::all());
    });
    let _pose = bus.state().subscribe(|state| {
        let pose = WaiterPose::from(*state);
        tracing::debug!(%state, ?pose, "waiter pose");
    });

    println!("Waiter console. Type :start to talk, :stop to pause, :quit to exit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "" => {}
                    ":quit" => break,
                    ":start" => assistant.start(),
                    ":stop" => assistant.stop(),
                    spoken => {
                        if recognizer.take_session() {
                            assistant.on_result(spoken);
                            assistant.on_recognition_end();
                        } else {
                            println!("(not listening, state {})", assistant.state());
                        }
                    }
                }
            }
            Some(query) = menu_queries.recv() => match catalog.list_dishes(&query).await {
                Ok(dishes) => {
                    let names: Vec<&str> = dishes.iter().map(|d| d.name.as_str()).collect();
                    println!("📋 menu [{}]", names.join(", "));
                }
                Err(e) => tracing::warn!(error = %e, "menu query failed"),
            },
            Some(event) = events.recv() => match event {
                EngineEvent::RecognitionStart => assistant.on_recognition_start(),
                EngineEvent::RecognitionEnd => assistant.on_recognition_end(),
                EngineEvent::SynthesisEnd(id) => assistant.on_synthesis_end(id),
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("CTRL-C received; shutting down");
                break;
            }
        }
    }

    assistant.stop();
    orchestrator.shutdown();
    Ok(())
}
