//! Voice session orchestrator — the kitchen-mode conversation state machine.
//!
//! The session drives a continuous half-duplex voice loop:
//!
//! ```text
//!   Idle → Listening → ProcessingCommand → (Speaking) → Listening
//!          ▲                                      │
//!          └──────────────────────────────────────┘
//! ```
//!
//! One listening turn owns the transcript: every incremental recognizer
//! result overwrites it and is run through the command interpreter. The
//! moment a command is detected, capture is torn down *before* anything is
//! spoken — listening and speaking never overlap on the shared audio route.
//!
//! `VoiceSession` itself is a synchronous state machine; all asynchronous
//! inputs (recognizer results, synthesis completions, relisten timers) arrive
//! as [`SessionSignal`]s that the [`service`](crate::service) pump feeds in
//! from a single task, so state mutation is always serialized.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::audio::AudioSession;
use crate::command::{self, VoiceCommand};
use crate::error::VoiceError;
use crate::gate::HalfDuplexGate;
use crate::recognizer::{PermissionStatus, RecognizerEvent, SpeechRecognizer, TranscriptSink, TurnId};
use crate::synth::{CompletionSink, SpeechSynthesizer, UtteranceId};

// ── Session state machine ──────────────────────────────────────────

/// Current state of the voice session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Not listening and not speaking.
    Idle,

    /// Microphone tap installed, recognition task streaming transcripts.
    Listening,

    /// A command was just detected; capture is being torn down.
    ProcessingCommand,

    /// Synthesis playback is audible.
    Speaking,
}

impl SessionState {
    /// Stable label for logs and wire events.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::ProcessingCommand => "processing_command",
            Self::Speaking => "speaking",
        }
    }
}

// ── Events emitted by the session ──────────────────────────────────

/// Events emitted by the session for the UI / application layer.
#[derive(Debug, Clone)]
pub enum VoiceEvent {
    /// Session state changed.
    StateChanged(SessionState),

    /// The live transcript changed (replaced, never appended).
    TranscriptChanged {
        /// Full transcript for the current turn.
        text: String,
        /// Whether the recognizer marked this result final.
        is_final: bool,
    },

    /// A non-`None` command was recognized and published.
    CommandDetected(VoiceCommand),

    /// Permission is missing; listening cannot start until the user grants
    /// it. Surfaced as user-visible state, never retried automatically.
    PermissionRequired,

    /// Synthesis playback started.
    SpeakingStarted,

    /// Synthesis playback finished or was stopped.
    SpeakingFinished,

    /// A non-fatal error occurred.
    Error(String),
}

// ── Internal signals ───────────────────────────────────────────────

/// Asynchronous inputs serialized into the session by the service pump.
///
/// Backends produce `Recognizer` and `SpeakingFinished` through their sinks;
/// the session schedules `Relisten` and `SpeakingWatchdog` for itself so that
/// even its own timers flow through the single serialization point.
#[derive(Debug)]
pub enum SessionSignal {
    /// A recognition result or error for the tagged turn.
    Recognizer {
        /// Turn the event belongs to; stale turns are dropped.
        turn: TurnId,
        /// The recognizer output.
        event: RecognizerEvent,
    },

    /// Synthesis playback of the tagged utterance completed naturally.
    SpeakingFinished {
        /// Utterance that finished; superseded utterances are dropped.
        utterance: UtteranceId,
    },

    /// Re-enter listening after the given delay.
    Relisten {
        /// Delay before re-arming the microphone (avoids audio-session
        /// races right after synthesis teardown).
        after: Duration,
    },

    /// Force the session out of `Speaking` if the tagged utterance is still
    /// current after the given delay — guards against a synthesizer whose
    /// completion never fires.
    SpeakingWatchdog {
        /// Utterance being watched.
        utterance: UtteranceId,
        /// How long to wait before checking.
        after: Duration,
    },
}

// ── Configuration ──────────────────────────────────────────────────

/// Configuration for the voice session.
#[derive(Debug, Clone)]
pub struct VoiceSessionConfig {
    /// Recognition locale (e.g. `"en-US"`). Read by backend constructors;
    /// the session itself is locale-agnostic.
    pub locale: String,

    /// Delay before re-arming the microphone after a `StopSpeaking` command.
    pub relisten_delay: Duration,

    /// Maximum time to stay in `Speaking` waiting for a completion callback.
    pub speaking_timeout: Duration,

    /// Whether to speak canned acknowledgments ("Moving on.") for step
    /// commands.
    pub acknowledgments: bool,
}

impl Default for VoiceSessionConfig {
    fn default() -> Self {
        Self {
            locale: "en-US".to_owned(),
            relisten_delay: Duration::from_secs(1),
            speaking_timeout: Duration::from_secs(30),
            acknowledgments: true,
        }
    }
}

/// Receivers handed out by [`VoiceSession::new`].
pub struct SessionChannels {
    /// Internal signals; consumed by the service pump.
    pub signals: mpsc::UnboundedReceiver<SessionSignal>,
    /// Observable events; consumed by the UI layer or event bridge.
    pub events: mpsc::UnboundedReceiver<VoiceEvent>,
}

// ── Voice session ──────────────────────────────────────────────────

/// The kitchen-mode voice session state machine.
///
/// Owns the transcript, the last published command, and the listening state.
/// The microphone/audio session and the synthesizer are process-wide
/// singletons with exactly one owner — this struct; nothing else starts or
/// stops them.
pub struct VoiceSession {
    state: SessionState,
    transcript: String,
    last_command: VoiceCommand,

    /// Turn generation counter. Bumped on every turn start *and* teardown so
    /// in-flight callbacks from a cancelled turn never resurrect it.
    turn: u64,
    /// Utterance generation counter, same idea for synthesis completions.
    utterance: u64,

    recognizer: Arc<dyn SpeechRecognizer>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    audio: Arc<dyn AudioSession>,
    gate: HalfDuplexGate,

    signal_tx: mpsc::UnboundedSender<SessionSignal>,
    event_tx: mpsc::UnboundedSender<VoiceEvent>,

    config: VoiceSessionConfig,
}

impl VoiceSession {
    /// Create a new session around the given platform backends.
    ///
    /// Returns the session plus the signal/event receivers. The signal
    /// receiver must be pumped (see [`VoiceService`](crate::service::VoiceService))
    /// for recognizer results and synthesis completions to take effect.
    #[must_use]
    pub fn new(
        recognizer: Arc<dyn SpeechRecognizer>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        audio: Arc<dyn AudioSession>,
        config: VoiceSessionConfig,
    ) -> (Self, SessionChannels) {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let session = Self {
            state: SessionState::Idle,
            transcript: String::new(),
            last_command: VoiceCommand::None,
            turn: 0,
            utterance: 0,
            recognizer,
            synthesizer,
            audio,
            gate: HalfDuplexGate::new(),
            signal_tx,
            event_tx,
            config,
        };

        (
            session,
            SessionChannels {
                signals: signal_rx,
                events: event_rx,
            },
        )
    }

    // ── Observable state ───────────────────────────────────────────

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the microphone is live.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.state == SessionState::Listening
    }

    /// The transcript of the current (or last) listening turn.
    #[must_use]
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    /// The most recently published command.
    #[must_use]
    pub const fn last_command(&self) -> &VoiceCommand {
        &self.last_command
    }

    /// The half-duplex gate shared with capture backends.
    #[must_use]
    pub fn gate(&self) -> HalfDuplexGate {
        self.gate.clone()
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &VoiceSessionConfig {
        &self.config
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    /// Start a listening turn.
    ///
    /// No-op when already listening (at most one tap and one recognition
    /// task exist system-wide). The permission prompt is the only suspension
    /// point: on `Undetermined` the user's decision is awaited, and listening
    /// proceeds only on grant. Denied/restricted permission is non-fatal —
    /// the session stays idle and surfaces [`VoiceEvent::PermissionRequired`].
    pub async fn start_listening(&mut self) -> Result<(), VoiceError> {
        if self.state == SessionState::Listening {
            return Ok(());
        }

        match self.recognizer.authorization_status() {
            PermissionStatus::Granted => {}
            PermissionStatus::Undetermined => {
                tracing::debug!("Requesting speech recognition permission");
                match self.recognizer.request_authorization().await {
                    PermissionStatus::Granted => {}
                    refused => return self.permission_refused(refused),
                }
            }
            refused => return self.permission_refused(refused),
        }

        // Half-duplex: a listen request supersedes any in-progress speech.
        if self.state == SessionState::Speaking {
            self.halt_synthesis();
        }

        self.begin_turn()
    }

    /// Stop listening and tear the turn down.
    ///
    /// The single cancellation entry point: safe from any state, idempotent,
    /// and callable concurrently with an in-flight recognition callback (the
    /// callback lands on a stale turn id and is dropped).
    pub fn stop_listening(&mut self) {
        self.end_capture();
        self.set_state(SessionState::Idle);
    }

    /// Speak `text`, tearing down capture first if a turn is live.
    ///
    /// Used by consumers (e.g. the step navigator reading an instruction);
    /// acknowledgments go through the same path internally.
    pub fn speak(&mut self, text: &str) -> Result<(), VoiceError> {
        if self.state == SessionState::Listening {
            self.end_capture();
        }
        self.speak_internal(text)
    }

    /// Stop any in-progress synthesis immediately.
    pub fn stop_speaking(&mut self) {
        self.halt_synthesis();
        if self.state == SessionState::Speaking {
            self.set_state(SessionState::Idle);
        }
    }

    // ── Signal handlers (called from the service pump) ─────────────

    /// Feed one recognizer event into the state machine.
    pub fn handle_recognizer_event(&mut self, turn: TurnId, event: RecognizerEvent) {
        if turn.value() != self.turn || self.state != SessionState::Listening {
            tracing::trace!(turn = turn.value(), "Dropping recognizer event from a stale turn");
            return;
        }

        match event {
            RecognizerEvent::Partial { text } => {
                self.update_transcript(text, false);
            }
            RecognizerEvent::Final { text } => {
                self.update_transcript(text, true);
                if self.state == SessionState::Listening {
                    // Forced-final with no command: an ordinary turn
                    // boundary, not an error.
                    tracing::debug!("Recognition turn ended without a command");
                    self.stop_listening();
                }
            }
            RecognizerEvent::Error { message } => {
                tracing::warn!(%message, "Recognition task error — ending turn");
                self.stop_listening();
            }
        }
    }

    /// Feed one synthesis completion into the state machine.
    ///
    /// Completing the current utterance re-enters listening, closing the
    /// conversation loop. Superseded utterances are ignored.
    pub fn handle_speaking_finished(&mut self, utterance: UtteranceId) {
        if utterance.value() != self.utterance || self.state != SessionState::Speaking {
            tracing::trace!(
                utterance = utterance.value(),
                "Dropping completion for a superseded utterance"
            );
            return;
        }

        tracing::debug!("Synthesis complete — reopening the microphone");
        self.gate.speaking_finished();
        self.emit(VoiceEvent::SpeakingFinished);
        self.set_state(SessionState::Idle);
        self.schedule_relisten(Duration::ZERO);
    }

    /// Watchdog check armed when synthesis starts: if the utterance is still
    /// current and the session is still `Speaking`, the completion callback
    /// never fired — fall back to idle instead of hanging.
    pub fn check_speaking_watchdog(&mut self, utterance: UtteranceId) {
        if utterance.value() != self.utterance || self.state != SessionState::Speaking {
            return;
        }

        tracing::warn!(
            utterance = utterance.value(),
            timeout_ms = self.config.speaking_timeout.as_millis(),
            "Synthesis completion never fired — forcing idle"
        );
        self.halt_synthesis();
        self.set_state(SessionState::Idle);
    }

    // ── Turn internals ─────────────────────────────────────────────

    fn begin_turn(&mut self) -> Result<(), VoiceError> {
        // Fresh turn: transcript resets, previous command is superseded.
        self.transcript.clear();
        self.last_command = VoiceCommand::None;
        self.emit(VoiceEvent::TranscriptChanged {
            text: String::new(),
            is_final: false,
        });

        if let Err(e) = self.audio.activate() {
            // Non-fatal: abort the attempt, stay idle, caller may retry.
            tracing::warn!(error = %e, "Audio session activation failed");
            self.set_state(SessionState::Idle);
            self.emit(VoiceEvent::Error(e.to_string()));
            return Err(e);
        }

        // Guard against a leftover tap before installing a new one.
        self.recognizer.end_turn();

        self.turn += 1;
        let sink = TranscriptSink::new(TurnId(self.turn), self.signal_tx.clone());
        if let Err(e) = self.recognizer.begin_turn(sink) {
            tracing::warn!(error = %e, "Failed to start recognition turn");
            self.audio.deactivate();
            self.set_state(SessionState::Idle);
            self.emit(VoiceEvent::Error(e.to_string()));
            return Err(e);
        }

        self.set_state(SessionState::Listening);
        tracing::info!(turn = self.turn, "Listening");
        Ok(())
    }

    /// Tear down capture and recognition for the current turn.
    ///
    /// Capture goes down strictly before the recognition task is cancelled,
    /// mirroring the tap-removal-before-cancel ordering the platform
    /// requires. Bumping the turn counter invalidates in-flight callbacks.
    fn end_capture(&mut self) {
        self.audio.deactivate();
        self.recognizer.end_turn();
        self.turn += 1;
    }

    fn update_transcript(&mut self, text: String, is_final: bool) {
        self.transcript = text;
        self.emit(VoiceEvent::TranscriptChanged {
            text: self.transcript.clone(),
            is_final,
        });

        let command = command::interpret(&self.transcript);
        if command != VoiceCommand::None {
            self.process_command(command);
        }
    }

    fn process_command(&mut self, command: VoiceCommand) {
        tracing::info!(command = command.label(), transcript = %self.transcript, "Voice command detected");
        self.set_state(SessionState::ProcessingCommand);

        // Turn-taking: never listen and speak simultaneously.
        self.end_capture();

        self.last_command = command.clone();
        self.emit(VoiceEvent::CommandDetected(command.clone()));

        if command == VoiceCommand::StopSpeaking {
            self.halt_synthesis();
            self.set_state(SessionState::Idle);
            // Short grace period so the playback route has fully released
            // before the capture route is re-armed.
            self.schedule_relisten(self.config.relisten_delay);
            return;
        }

        match command.acknowledgment() {
            Some(ack) if self.config.acknowledgments => {
                // Errors are surfaced as events inside speak_internal; the
                // command itself already took effect.
                let _ = self.speak_internal(ack);
            }
            Some(_) => {
                // Acknowledgments disabled: keep the loop alive silently.
                self.set_state(SessionState::Idle);
                self.schedule_relisten(Duration::ZERO);
            }
            None => {
                // ReadInstruction and friends: the consumer decides what to
                // speak; its synthesis completion re-enters listening.
                self.set_state(SessionState::Idle);
            }
        }
    }

    fn speak_internal(&mut self, text: &str) -> Result<(), VoiceError> {
        // Supersede any in-progress utterance.
        self.synthesizer.stop();
        self.utterance += 1;

        let done = CompletionSink::new(UtteranceId(self.utterance), self.signal_tx.clone());
        self.gate.speaking_started();

        match self.synthesizer.speak(text, done) {
            Ok(()) => {
                self.set_state(SessionState::Speaking);
                self.emit(VoiceEvent::SpeakingStarted);
                self.arm_speaking_watchdog();
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Synthesis failed to start");
                self.gate.speaking_finished();
                self.set_state(SessionState::Idle);
                self.emit(VoiceEvent::Error(e.to_string()));
                Err(e)
            }
        }
    }

    fn halt_synthesis(&mut self) {
        if self.synthesizer.is_speaking() {
            self.synthesizer.stop();
            self.emit(VoiceEvent::SpeakingFinished);
        }
        // Ignore any late completion from the stopped utterance.
        self.utterance += 1;
        self.gate.speaking_finished();
    }

    fn permission_refused(&mut self, status: PermissionStatus) -> Result<(), VoiceError> {
        tracing::warn!(?status, "Speech permission refused — staying idle");
        self.set_state(SessionState::Idle);
        self.emit(VoiceEvent::PermissionRequired);
        Err(match status {
            PermissionStatus::Restricted => VoiceError::PermissionRestricted,
            _ => VoiceError::PermissionDenied,
        })
    }

    fn schedule_relisten(&self, after: Duration) {
        let _ = self.signal_tx.send(SessionSignal::Relisten { after });
    }

    fn arm_speaking_watchdog(&self) {
        let _ = self.signal_tx.send(SessionSignal::SpeakingWatchdog {
            utterance: UtteranceId(self.utterance),
            after: self.config.speaking_timeout,
        });
    }

    // ── Internal helpers ───────────────────────────────────────────

    /// Transition to a new state and emit a state-change event.
    fn set_state(&mut self, new_state: SessionState) {
        if self.state != new_state {
            tracing::debug!(old = self.state.label(), new = new_state.label(), "Session state transition");
            self.state = new_state;
            self.emit(VoiceEvent::StateChanged(new_state));
        }
    }

    /// Emit an event (best-effort — a dropped receiver is logged, not fatal).
    fn emit(&self, event: VoiceEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::warn!("Voice event receiver dropped");
        }
    }
}

impl Drop for VoiceSession {
    fn drop(&mut self) {
        self.stop_speaking();
        self.stop_listening();
    }
}
