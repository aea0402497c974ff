//! Canonical event union for all cross-adapter events.
//!
//! This module is the single source of truth for events consumed by UI
//! transports (native bindings, SSE, test harnesses). Voice-native types are
//! converted into these wire shapes on the voice side; this crate never
//! imports `crumb-voice`.
//!
//! # Wire Format
//!
//! Events are serialized with a `type` tag for frontend compatibility:
//!
//! ```json
//! { "type": "voice_transcript", "text": "ok next please", "isFinal": false }
//! ```

use serde::{Deserialize, Serialize};

/// Canonical event types for all adapters.
///
/// Each variant carries enough context to be self-describing on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    // ========== Voice Session Events ==========
    /// The voice session state machine changed state.
    VoiceStateChanged {
        /// State label (`"idle"`, `"listening"`, `"processing_command"`,
        /// `"speaking"`).
        state: String,
    },

    /// The live transcript for the current listening turn changed.
    VoiceTranscript {
        /// Full transcript text so far (replaces, never appends).
        text: String,
        /// Whether the recognizer marked this result final.
        #[serde(rename = "isFinal")]
        is_final: bool,
    },

    /// A voice command was recognized from the transcript.
    VoiceCommandDetected {
        /// Command label (`"next_step"`, `"stop_speaking"`, ...).
        command: String,
    },

    /// Microphone/speech permission is missing; the user must grant it in
    /// system settings before listening can start.
    VoicePermissionRequired,

    /// Speech synthesis started playing.
    VoiceSpeakingStarted,

    /// Speech synthesis finished or was stopped.
    VoiceSpeakingFinished,

    /// The voice session hit a non-fatal error.
    VoiceError {
        /// Human-readable error description.
        message: String,
    },

    // ========== Kitchen Mode Events ==========
    /// The step cursor moved.
    KitchenStepChanged {
        /// New zero-based step index.
        #[serde(rename = "stepIndex")]
        step_index: usize,
        /// Total number of display steps.
        #[serde(rename = "stepCount")]
        step_count: usize,
    },

    /// The final step was completed; the UI should present the finish screen.
    KitchenCompleted,
}

impl AppEvent {
    /// Get the event name for wire protocols.
    ///
    /// This provides consistent event naming across transports.
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::VoiceStateChanged { .. } => "voice:state_changed",
            Self::VoiceTranscript { .. } => "voice:transcript",
            Self::VoiceCommandDetected { .. } => "voice:command_detected",
            Self::VoicePermissionRequired => "voice:permission_required",
            Self::VoiceSpeakingStarted => "voice:speaking_started",
            Self::VoiceSpeakingFinished => "voice:speaking_finished",
            Self::VoiceError { .. } => "voice:error",
            Self::KitchenStepChanged { .. } => "kitchen:step_changed",
            Self::KitchenCompleted => "kitchen:completed",
        }
    }
}
