//! `VoiceService` — async wrapper around the session state machine.
//!
//! This module is the single place where `crumb-voice` native types are
//! converted to the transport-agnostic events defined in `crumb-core`.
//! Nothing outside this file should need to know how session signals are
//! pumped.
//!
//! # Locking discipline
//!
//! The session lives in an `Arc<RwLock<_>>`. All mutations use
//! `session.write().await`; read-only queries use `session.read().await`.
//! Every asynchronous input — recognizer callbacks, synthesis completions,
//! relisten timers, the speaking watchdog — funnels through one pump task, so
//! from the session's perspective there is a single logical caller and
//! callback interleavings can never corrupt a turn. `stop_listening` is safe
//! to call concurrently with an in-flight callback: the callback lands on a
//! stale turn id and is dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{RwLock, mpsc};
use tracing::info;

use crumb_core::events::AppEvent;
use crumb_core::ports::AppEventEmitter;

use crate::audio::AudioSession;
use crate::command::VoiceCommand;
use crate::error::VoiceError;
use crate::recognizer::SpeechRecognizer;
use crate::session::{
    SessionSignal, SessionState, VoiceEvent, VoiceSession, VoiceSessionConfig,
};
use crate::synth::SpeechSynthesizer;

// ── Service struct ────────────────────────────────────────────────────────────

/// Owns the voice session and its background tasks.
///
/// Dropping the service drops the session (which tears down capture and
/// synthesis via its own `Drop`); the pump and bridge tasks then observe the
/// closed channels and exit on their own.
pub struct VoiceService {
    session: Arc<RwLock<VoiceSession>>,
    /// Whether the continuous listen→speak→listen loop should re-arm the
    /// microphone after synthesis. Cleared by [`stop_listening`](Self::stop_listening)
    /// so a pending relisten timer cannot reopen the mic after the user (or a
    /// closing view) asked for silence.
    auto_listen: Arc<AtomicBool>,
    /// Command stream handed out once to the consumer driving navigation.
    commands: std::sync::Mutex<Option<mpsc::UnboundedReceiver<VoiceCommand>>>,
}

impl VoiceService {
    /// Create a service around the given platform backends and start its
    /// pump and event-bridge tasks.
    ///
    /// Session events are converted to [`AppEvent`]s and forwarded to
    /// `emitter`; detected commands are additionally exposed through
    /// [`take_commands`](Self::take_commands).
    #[must_use]
    pub fn new(
        recognizer: Arc<dyn SpeechRecognizer>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        audio: Arc<dyn AudioSession>,
        config: VoiceSessionConfig,
        emitter: Arc<dyn AppEventEmitter>,
    ) -> Self {
        let (session, channels) = VoiceSession::new(recognizer, synthesizer, audio, config);
        let session = Arc::new(RwLock::new(session));
        let auto_listen = Arc::new(AtomicBool::new(false));

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        spawn_signal_pump(
            Arc::downgrade(&session),
            channels.signals,
            Arc::clone(&auto_listen),
        );
        spawn_event_bridge(channels.events, emitter, command_tx);

        info!("Voice service created");
        Self {
            session,
            auto_listen,
            commands: std::sync::Mutex::new(Some(command_rx)),
        }
    }

    /// Take the detected-command stream.
    ///
    /// There is exactly one consumer (the kitchen-mode driver); subsequent
    /// calls return `None`.
    pub fn take_commands(&self) -> Option<mpsc::UnboundedReceiver<VoiceCommand>> {
        self.commands.lock().map(|mut g| g.take()).unwrap_or(None)
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Start listening and keep the conversation loop alive: after each
    /// spoken response the microphone re-arms automatically.
    pub async fn start_listening(&self) -> Result<(), VoiceError> {
        self.auto_listen.store(true, Ordering::SeqCst);
        self.session.write().await.start_listening().await
    }

    /// Stop listening and disable the conversation loop.
    ///
    /// Any relisten timer already in flight checks the loop flag before
    /// touching the microphone, so stopping is final until the next
    /// [`start_listening`](Self::start_listening).
    pub async fn stop_listening(&self) {
        self.auto_listen.store(false, Ordering::SeqCst);
        self.session.write().await.stop_listening();
    }

    /// Speak `text` through the session (capture is torn down first if live).
    pub async fn speak(&self, text: &str) -> Result<(), VoiceError> {
        self.session.write().await.speak(text)
    }

    /// Stop any in-progress synthesis immediately.
    pub async fn stop_speaking(&self) {
        self.session.write().await.stop_speaking();
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    /// Current session state.
    pub async fn state(&self) -> SessionState {
        self.session.read().await.state()
    }

    /// Whether the microphone is live.
    pub async fn is_listening(&self) -> bool {
        self.session.read().await.is_listening()
    }

    /// The transcript of the current (or last) listening turn.
    pub async fn transcript(&self) -> String {
        self.session.read().await.transcript().to_owned()
    }

    /// The most recently published command.
    pub async fn last_command(&self) -> VoiceCommand {
        self.session.read().await.last_command().clone()
    }
}

// ── Signal pump ───────────────────────────────────────────────────────────────

/// Drive session signals into the state machine from a single task.
///
/// Holds only a `Weak` reference: when the service (the sole strong owner)
/// drops, the session drops with it, the signal senders close, `recv()`
/// returns `None` and the task exits.
fn spawn_signal_pump(
    session: std::sync::Weak<RwLock<VoiceSession>>,
    mut signals: mpsc::UnboundedReceiver<SessionSignal>,
    auto_listen: Arc<AtomicBool>,
) {
    tokio::spawn(async move {
        while let Some(signal) = signals.recv().await {
            let Some(session) = session.upgrade() else {
                break;
            };

            match signal {
                SessionSignal::Recognizer { turn, event } => {
                    session.write().await.handle_recognizer_event(turn, event);
                }
                SessionSignal::SpeakingFinished { utterance } => {
                    session.write().await.handle_speaking_finished(utterance);
                }
                SessionSignal::Relisten { after } => {
                    spawn_relisten(Arc::downgrade(&session), after, Arc::clone(&auto_listen));
                }
                SessionSignal::SpeakingWatchdog { utterance, after } => {
                    let session = Arc::downgrade(&session);
                    tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        if let Some(session) = session.upgrade() {
                            session.write().await.check_speaking_watchdog(utterance);
                        }
                    });
                }
            }
        }
        // recv() returned None: session dropped — pump exits.
    });
}

/// Re-arm the microphone after `delay`, closing the conversation loop.
///
/// The delay absorbs the audio-route race right after synthesis teardown.
/// Skipped when the loop was disabled or the session left `Idle` in the
/// meantime (e.g. the consumer started speaking an instruction).
fn spawn_relisten(
    session: std::sync::Weak<RwLock<VoiceSession>>,
    delay: Duration,
    auto_listen: Arc<AtomicBool>,
) {
    tokio::spawn(async move {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if !auto_listen.load(Ordering::SeqCst) {
            return;
        }
        let Some(session) = session.upgrade() else {
            return;
        };

        let mut guard = session.write().await;
        if guard.state() == SessionState::Idle {
            if let Err(e) = guard.start_listening().await {
                tracing::warn!(error = %e, "Automatic relisten failed");
            }
        }
    });
}

// ── Event bridge ──────────────────────────────────────────────────────────────

/// Bridge `VoiceEvent` → `AppEvent`, forwarding each event to `emitter`.
///
/// Detected commands are additionally mirrored onto `command_tx` for the
/// in-process consumer; a dropped command receiver just means nobody is
/// navigating, which is fine.
///
/// The spawned task self-terminates when the session's event sender is
/// dropped: `recv()` returns `None` and the loop exits.
pub fn spawn_event_bridge(
    mut event_rx: mpsc::UnboundedReceiver<VoiceEvent>,
    emitter: Arc<dyn AppEventEmitter>,
    command_tx: mpsc::UnboundedSender<VoiceCommand>,
) {
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                VoiceEvent::StateChanged(state) => {
                    emitter.emit(AppEvent::VoiceStateChanged {
                        state: state.label().to_owned(),
                    });
                }
                VoiceEvent::TranscriptChanged { text, is_final } => {
                    emitter.emit(AppEvent::VoiceTranscript { text, is_final });
                }
                VoiceEvent::CommandDetected(command) => {
                    emitter.emit(AppEvent::VoiceCommandDetected {
                        command: command.label().to_owned(),
                    });
                    let _ = command_tx.send(command);
                }
                VoiceEvent::PermissionRequired => {
                    emitter.emit(AppEvent::VoicePermissionRequired);
                }
                VoiceEvent::SpeakingStarted => {
                    emitter.emit(AppEvent::VoiceSpeakingStarted);
                }
                VoiceEvent::SpeakingFinished => {
                    emitter.emit(AppEvent::VoiceSpeakingFinished);
                }
                VoiceEvent::Error(message) => {
                    emitter.emit(AppEvent::VoiceError { message });
                }
            }
        }
        // event_rx returned None: session dropped — bridge exits.
    });
}
