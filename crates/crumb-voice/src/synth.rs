//! Speech synthesizer trait seam.
//!
//! Synthesis is fire-and-forget: [`SpeechSynthesizer::speak`] returns once
//! playback has been queued, and completion is reported through the
//! [`CompletionSink`] so the session can re-open the microphone.

use tokio::sync::mpsc;

use crate::error::VoiceError;
use crate::session::SessionSignal;

/// Identifier of one synthesis utterance.
///
/// Like turn ids, utterance ids are generation counters: a completion tagged
/// with a superseded id (the utterance was stopped or replaced) is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UtteranceId(pub(crate) u64);

impl UtteranceId {
    pub(crate) const fn value(self) -> u64 {
        self.0
    }
}

/// Completion handle for one utterance.
#[derive(Debug, Clone)]
pub struct CompletionSink {
    utterance: UtteranceId,
    tx: mpsc::UnboundedSender<SessionSignal>,
}

impl CompletionSink {
    pub(crate) const fn new(utterance: UtteranceId, tx: mpsc::UnboundedSender<SessionSignal>) -> Self {
        Self { utterance, tx }
    }

    /// The utterance this sink belongs to.
    #[must_use]
    pub const fn utterance(&self) -> UtteranceId {
        self.utterance
    }

    /// Report that playback of this utterance finished naturally.
    ///
    /// Backends must not call this for utterances interrupted via
    /// [`SpeechSynthesizer::stop`]; the session has already moved on.
    pub fn finished(&self) {
        let _ = self.tx.send(SessionSignal::SpeakingFinished {
            utterance: self.utterance,
        });
    }
}

/// Platform speech synthesizer.
///
/// Process-wide singleton owned by the session; no other component starts or
/// stops it directly.
pub trait SpeechSynthesizer: Send + Sync {
    /// Queue `text` for playback and return immediately.
    ///
    /// `done.finished()` must fire exactly once when playback completes
    /// naturally, from any thread.
    fn speak(&self, text: &str, done: CompletionSink) -> Result<(), VoiceError>;

    /// Stop any in-progress playback immediately. Idempotent.
    fn stop(&self);

    /// Whether playback is currently audible.
    fn is_speaking(&self) -> bool;
}
