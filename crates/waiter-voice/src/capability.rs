//! Capabilities at the edge of the voice core.
//!
//! Speech engines are consumed through [`SpeechRecognizer`] and
//! [`SpeechSynthesizer`]. They report back by calling the event entry points
//! on [`crate::VoiceAssistant`] (`on_recognition_start`, `on_result`, ...),
//! from whatever thread their host runs them on.
//!
//! Timers go through [`Scheduler`] so restart delays can be driven by a tokio
//! runtime in production and by paused time in tests.

use crate::error::{VoiceError, VoiceResult};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

/// Identity of one synthesis request. Events for a superseded id are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(pub u64);

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "utterance#{}", self.0)
    }
}

/// Speech-to-text engine.
pub trait SpeechRecognizer: Send + Sync {
    fn configure(&self, locale: &str);

    /// Begin a recognition session. Calling this while a session is already
    /// running may fail; the controller ignores that failure.
    fn start(&self) -> VoiceResult<()>;

    fn stop(&self);
}

/// Text-to-speech engine. Completion is reported through
/// `VoiceAssistant::on_synthesis_end` / `on_synthesis_error` with the same id.
pub trait SpeechSynthesizer: Send + Sync {
    fn speak(&self, id: UtteranceId, text: &str, locale: &str) -> VoiceResult<()>;

    /// Drop the current utterance and anything queued.
    fn cancel_all(&self);
}

pub type TimerTask = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a scheduled task. Dropping it does not cancel the task.
pub struct TimerGuard {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl TimerGuard {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A guard for a task that cannot be cancelled.
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for TimerGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerGuard")
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

/// One-shot delayed execution.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerGuard;
}

/// [`Scheduler`] backed by a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime the caller is running on.
    pub fn current() -> VoiceResult<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| VoiceError::Scheduler(e.to_string()))
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerGuard {
        let join = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        TimerGuard::new(move || join.abort())
    }
}

type Trigger = Arc<dyn Fn() + Send + Sync>;
type SayFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Start/stop/say handle handed to components that need to drive the voice
/// lifecycle without owning the controller.
#[derive(Clone)]
pub struct VoiceControl {
    start: Trigger,
    stop: Trigger,
    say: SayFn,
}

impl VoiceControl {
    pub fn new(
        start: impl Fn() + Send + Sync + 'static,
        stop: impl Fn() + Send + Sync + 'static,
        say: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        Self {
            start: Arc::new(start),
            stop: Arc::new(stop),
            say: Arc::new(say),
        }
    }

    pub fn start(&self) {
        (self.start)()
    }

    pub fn stop(&self) {
        (self.stop)()
    }

    pub fn say(&self, text: &str) {
        (self.say)(text)
    }
}

impl fmt::Debug for VoiceControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VoiceControl")
    }
}
